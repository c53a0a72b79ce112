//! Valve link abstraction
//!
//! The bridge talks to valves through a [`ValveLink`]. The BLE
//! implementation lives outside this crate; [`SimulatedValveLink`] keeps
//! valve state in memory so the bridge can run without hardware.

mod link;
mod simulated;
mod status;

pub use link::ValveLink;
pub use simulated::SimulatedValveLink;
pub use status::{ValveMode, ValveStatus};
