//! EQ-3 Bridge Shared Types
//!
//! This crate provides the topic tokenizer, MAC address handling and valve
//! request types used by the EQ-3 MQTT bridge.

pub mod buffer;
pub mod mac;
pub mod request;
pub mod tokenizer;
pub mod topics;

pub use buffer::{CommandBuffer, Overflow, DEFAULT_COMMAND_CAPACITY};
pub use mac::{MacAddress, MacParseError, MAC_STR_LEN};
pub use request::{HaMode, RequestError, ValveCommand, ValveRequest};
pub use tokenizer::{ComposedCommand, RequestHandler, TokenizeError, Tokenizer, TRV_MARKER};
pub use topics::{InboundKind, TopicLayout, LWT_MESSAGE};

use std::time::{SystemTime, UNIX_EPOCH};

/// Software version reported on connect and in check responses
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Message bodies published by the bridge
pub mod messages {
    use crate::VERSION;

    /// Published to `{id}radout/connect` after every (re)connect
    pub fn announce() -> String {
        format!("Heating control v{} active", VERSION)
    }

    /// Published to `{id}radout/checkresp` in reply to a check
    pub fn check_response() -> String {
        format!("sw ver {}", VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(messages::announce(), format!("Heating control v{} active", VERSION));
        assert!(messages::check_response().starts_with("sw ver "));
    }

    #[test]
    fn test_now_ms() {
        assert!(now_ms() > 0);
    }
}
