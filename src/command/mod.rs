//! Command execution for valve requests
//!
//! This module handles:
//! - Receiving composed commands from the topic tokenizer
//! - Parsing and validating them as valve requests
//! - Dispatching to the appropriate command handlers
//! - Publishing the resulting valve status

mod executor;
pub mod handlers;

pub use executor::{CommandExecutor, CommandResult};
