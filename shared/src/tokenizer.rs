//! Topic tokenizer for inbound valve commands
//!
//! Turns an MQTT topic of the form
//! ```text
//! {prefix}trv/{AA:BB:CC:DD:EE:FF}/{command}
//! ```
//! plus the message payload into one composed command:
//! ```text
//! AA:BB:CC:DD:EE:FF command[ payload]
//! ```
//!
//! The composed command is built in a call-local [`CommandBuffer`], so the
//! tokenizer holds no state between calls and any number of calls may run
//! concurrently.

use bytes::Bytes;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::buffer::{CommandBuffer, Overflow, DEFAULT_COMMAND_CAPACITY};
use crate::mac::{is_address_byte, MAC_STR_LEN};

/// Marker that introduces the address token
pub const TRV_MARKER: &str = "/trv/";

/// Reasons a topic is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("Topic has no \"{TRV_MARKER}\" marker")]
    MalformedTopic,

    #[error("Invalid address character 0x{byte:02x} at offset {offset}")]
    InvalidAddressCharacter { byte: u8, offset: usize },

    #[error("Wrong address length: {0} (expected {MAC_STR_LEN})")]
    AddressLengthMismatch(usize),

    #[error("Missing '/' after address")]
    MissingSeparator,

    #[error("Empty command with no payload")]
    EmptyCommand,

    #[error("Command buffer overflow: need {needed} bytes, {available} free (capacity {capacity})")]
    BufferOverflow {
        needed: usize,
        available: usize,
        capacity: usize,
    },
}

impl From<Overflow> for TokenizeError {
    fn from(o: Overflow) -> Self {
        TokenizeError::BufferOverflow {
            needed: o.needed,
            available: o.capacity.saturating_sub(1).saturating_sub(o.len),
            capacity: o.capacity,
        }
    }
}

/// A validated `"{MAC} {command}[ {payload}]"` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedCommand {
    bytes: Bytes,
}

impl ComposedCommand {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The command as text, if the payload was valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    /// The address token. Always 17 ASCII characters.
    pub fn address(&self) -> &str {
        std::str::from_utf8(&self.bytes[..MAC_STR_LEN]).unwrap_or_default()
    }
}

impl fmt::Display for ComposedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}

/// Receives composed commands from the tokenizer
pub trait RequestHandler {
    fn handle_request(&mut self, command: ComposedCommand);
}

impl<F> RequestHandler for F
where
    F: FnMut(ComposedCommand),
{
    fn handle_request(&mut self, command: ComposedCommand) {
        self(command)
    }
}

/// Tokenizer configured with a composed command capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    capacity: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_CAPACITY)
    }
}

impl Tokenizer {
    /// `capacity` counts the terminator slot, as the composed buffer does
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Validate a topic and compose the command it carries
    pub fn tokenize(&self, topic: &str, payload: &[u8]) -> Result<ComposedCommand, TokenizeError> {
        let raw = topic.as_bytes();

        // Marker
        let start = topic
            .find(TRV_MARKER)
            .map(|pos| pos + TRV_MARKER.len())
            .ok_or(TokenizeError::MalformedTopic)?;

        // Address: '/' or end of topic terminates, anything else outside the
        // alphabet is a hard reject
        let mut end = start;
        while end < raw.len() && raw[end] != b'/' {
            if !is_address_byte(raw[end]) {
                return Err(TokenizeError::InvalidAddressCharacter {
                    byte: raw[end],
                    offset: end,
                });
            }
            end += 1;
        }

        let address = &raw[start..end];
        if address.len() != MAC_STR_LEN {
            return Err(TokenizeError::AddressLengthMismatch(address.len()));
        }

        // Separator
        if raw.get(end) != Some(&b'/') {
            return Err(TokenizeError::MissingSeparator);
        }
        let command = &raw[end + 1..];

        if command.is_empty() && payload.is_empty() {
            return Err(TokenizeError::EmptyCommand);
        }

        // Compose
        let mut buf = CommandBuffer::new(self.capacity);
        buf.push_slice(address)?;
        buf.push(b' ')?;
        buf.push_slice(command)?;
        if !payload.is_empty() {
            buf.push(b' ')?;
            buf.push_slice(payload)?;
        }

        Ok(ComposedCommand {
            bytes: buf.freeze(),
        })
    }

    /// Tokenize and hand the result to `handler`
    ///
    /// The handler runs at most once, and only for a valid topic. Rejections
    /// are logged and returned; nothing is published back to the broker.
    pub fn dispatch<H>(&self, topic: &str, payload: &[u8], handler: &mut H) -> Result<(), TokenizeError>
    where
        H: RequestHandler + ?Sized,
    {
        match self.tokenize(topic, payload) {
            Ok(command) => {
                info!("Handle trv mqtt msg \"{}\" ({} bytes)", command, command.len());
                handler.handle_request(command);
                Ok(())
            }
            Err(e) => {
                warn!(topic = %topic, "Rejected TRV command: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: &str = "AA:BB:CC:DD:EE:FF";

    fn collect(tokenizer: &Tokenizer, topic: &str, payload: &[u8]) -> (Result<(), TokenizeError>, Vec<ComposedCommand>) {
        let mut seen = Vec::new();
        let mut handler = |cmd: ComposedCommand| seen.push(cmd);
        let result = tokenizer.dispatch(topic, payload, &mut handler);
        (result, seen)
    }

    #[test]
    fn test_settemp_with_payload() {
        let cmd = Tokenizer::default()
            .tokenize("radin/trv/AA:BB:CC:DD:EE:FF/settemp", b"21.5")
            .expect("tokenize failed");
        assert_eq!(cmd.as_str(), Some("AA:BB:CC:DD:EE:FF settemp 21.5"));
        assert_eq!(cmd.address(), MAC);
    }

    #[test]
    fn test_no_payload_no_trailing_space() {
        let cmd = Tokenizer::default()
            .tokenize("radin/trv/AA:BB:CC:DD:EE:FF/lock", b"")
            .expect("tokenize failed");
        assert_eq!(cmd.as_bytes(), b"AA:BB:CC:DD:EE:FF lock");
        assert_eq!(cmd.len(), 22);
    }

    #[test]
    fn test_client_prefix_is_ignored() {
        let cmd = Tokenizer::default()
            .tokenize("eq3_radin/trv/aa:bb:cc:dd:ee:ff/boost", b"")
            .expect("tokenize failed");
        assert_eq!(cmd.as_str(), Some("aa:bb:cc:dd:ee:ff boost"));
    }

    #[test]
    fn test_missing_marker() {
        let tokenizer = Tokenizer::default();
        for topic in ["radin/scan", "radin/trv", "trv/AA:BB:CC:DD:EE:FF/lock", "", "radin/TRV/AA:BB:CC:DD:EE:FF/lock"] {
            let (result, seen) = collect(&tokenizer, topic, b"x");
            assert_eq!(result, Err(TokenizeError::MalformedTopic), "topic {:?}", topic);
            assert!(seen.is_empty());
        }
    }

    #[test]
    fn test_address_length_mismatch() {
        let tokenizer = Tokenizer::default();
        let cases = [
            ("radin/trv//lock", 0),
            ("radin/trv/AA:BB:CC:DD:EE:F/lock", 16),
            ("radin/trv/AA:BB:CC:DD:EE:FF0/lock", 18),
            ("radin/trv/AABBCCDDEEFF/lock", 12),
            ("radin/trv/AA:BB", 5),
        ];
        for (topic, len) in cases {
            assert_eq!(
                tokenizer.tokenize(topic, b""),
                Err(TokenizeError::AddressLengthMismatch(len)),
                "topic {:?}",
                topic
            );
        }
    }

    #[test]
    fn test_any_valid_address_reaches_command_scan() {
        let tokenizer = Tokenizer::default();
        // Only length and alphabet are checked here, not colon placement
        for address in ["00:11:22:33:44:55", "ffffffffffffffff:", ":::::::::::::::::"] {
            let topic = format!("radin/trv/{}/on", address);
            let cmd = tokenizer.tokenize(&topic, b"").expect("tokenize failed");
            assert_eq!(cmd.as_str(), Some(format!("{} on", address).as_str()));
        }
    }

    #[test]
    fn test_non_hex_address() {
        let result = Tokenizer::default().tokenize("radin/trv/ZZ:BB:CC:DD:EE:FF/lock", b"");
        assert_eq!(
            result,
            Err(TokenizeError::InvalidAddressCharacter { byte: b'Z', offset: 10 })
        );
    }

    #[test]
    fn test_bad_character_before_slash_is_rejected_not_skipped() {
        let result = Tokenizer::default().tokenize("radin/trv/AA:BB:CC:DD:EE:FF-/lock", b"");
        assert!(matches!(
            result,
            Err(TokenizeError::InvalidAddressCharacter { byte: b'-', .. })
        ));
    }

    #[test]
    fn test_missing_separator() {
        let result = Tokenizer::default().tokenize("radin/trv/AA:BB:CC:DD:EE:FF", b"21");
        assert_eq!(result, Err(TokenizeError::MissingSeparator));
    }

    #[test]
    fn test_empty_command_needs_payload() {
        let tokenizer = Tokenizer::default();
        assert_eq!(
            tokenizer.tokenize("radin/trv/AA:BB:CC:DD:EE:FF/", b""),
            Err(TokenizeError::EmptyCommand)
        );

        let cmd = tokenizer
            .tokenize("radin/trv/AA:BB:CC:DD:EE:FF/", b"on")
            .expect("tokenize failed");
        assert_eq!(cmd.as_str(), Some("AA:BB:CC:DD:EE:FF  on"));
    }

    #[test]
    fn test_binary_payload_copied_verbatim() {
        let payload = [0x00, 0xff, b' ', 0x7f];
        let cmd = Tokenizer::default()
            .tokenize("radin/trv/AA:BB:CC:DD:EE:FF/settime", &payload)
            .expect("tokenize failed");
        assert_eq!(&cmd.as_bytes()[26..], &payload);
        assert!(cmd.as_str().is_none());
    }

    #[test]
    fn test_overflow_at_capacity_boundary() {
        // "AA:BB:CC:DD:EE:FF " is 18 bytes; capacity 80 leaves 79 content bytes
        let tokenizer = Tokenizer::default();

        let fits = format!("radin/trv/{}/{}", MAC, "c".repeat(79 - 18));
        let cmd = tokenizer.tokenize(&fits, b"").expect("should fit");
        assert_eq!(cmd.len(), 79);

        let too_long = format!("radin/trv/{}/{}", MAC, "c".repeat(80 - 18));
        assert!(matches!(
            tokenizer.tokenize(&too_long, b""),
            Err(TokenizeError::BufferOverflow { capacity: 80, .. })
        ));
    }

    #[test]
    fn test_payload_overflow_never_reaches_handler() {
        let tokenizer = Tokenizer::default();
        let payload = vec![b'9'; 60];
        let (result, seen) = collect(&tokenizer, "radin/trv/AA:BB:CC:DD:EE:FF/settemp", &payload);
        assert_eq!(
            result,
            Err(TokenizeError::BufferOverflow { needed: 60, available: 53, capacity: 80 })
        );
        assert!(seen.is_empty());
    }

    #[test]
    fn test_small_capacity_overflows_on_address() {
        let tokenizer = Tokenizer::new(10);
        assert!(matches!(
            tokenizer.tokenize("radin/trv/AA:BB:CC:DD:EE:FF/lock", b""),
            Err(TokenizeError::BufferOverflow { needed: 17, .. })
        ));
    }

    #[test]
    fn test_dispatch_invokes_handler_once() {
        let (result, seen) = collect(&Tokenizer::default(), "radin/trv/AA:BB:CC:DD:EE:FF/offset", b"-1.5");
        assert!(result.is_ok());
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_str(), Some("AA:BB:CC:DD:EE:FF offset -1.5"));
    }

    #[test]
    fn test_idempotent() {
        let tokenizer = Tokenizer::default();
        let inputs: [(&str, &[u8]); 3] = [
            ("radin/trv/AA:BB:CC:DD:EE:FF/settemp", b"21.5"),
            ("radin/trv/ZZ:BB:CC:DD:EE:FF/lock", b""),
            ("radin/check", b""),
        ];
        for (topic, payload) in inputs {
            assert_eq!(tokenizer.tokenize(topic, payload), tokenizer.tokenize(topic, payload));
        }
    }
}
