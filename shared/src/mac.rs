//! MAC address handling for valve addresses
//!
//! Valves are addressed by their Bluetooth MAC in canonical colon-hex form:
//! ```text
//! AA:BB:CC:DD:EE:FF
//! ```

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a canonical MAC string (12 hex digits + 5 colons)
pub const MAC_STR_LEN: usize = 17;

/// Errors that can occur while parsing a MAC address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacParseError {
    #[error("Wrong address length: {0} (expected {MAC_STR_LEN})")]
    WrongLength(usize),

    #[error("Invalid address character {0:?} at offset {1}")]
    InvalidCharacter(char, usize),
}

/// Whether a byte may appear inside an address token
pub fn is_address_byte(b: u8) -> bool {
    b.is_ascii_hexdigit() || b == b':'
}

/// A 6-byte Bluetooth device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Last three octets as bare hex, used for short device names
    pub fn short_id(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0[3], self.0[4], self.0[5])
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    /// Strict parse: `XX:XX:XX:XX:XX:XX`, either hex case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.as_bytes();
        if raw.len() != MAC_STR_LEN {
            return Err(MacParseError::WrongLength(raw.len()));
        }

        let mut octets = [0u8; 6];
        for (i, &b) in raw.iter().enumerate() {
            let is_sep_slot = i % 3 == 2;
            let ok = if is_sep_slot { b == b':' } else { b.is_ascii_hexdigit() };
            if !ok {
                let c = s[i..].chars().next().unwrap_or('\u{fffd}');
                return Err(MacParseError::InvalidCharacter(c, i));
            }
        }

        for (n, octet) in octets.iter_mut().enumerate() {
            let start = n * 3;
            *octet = u8::from_str_radix(&s[start..start + 2], 16)
                .map_err(|_| MacParseError::InvalidCharacter(':', start))?;
        }

        Ok(Self(octets))
    }
}
