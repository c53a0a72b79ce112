//! Valve requests parsed from composed commands

use std::fmt;
use thiserror::Error;

use crate::mac::{MacAddress, MacParseError, MAC_STR_LEN};
use crate::tokenizer::ComposedCommand;

/// Temperature limits accepted by the valves
pub mod limits {
    pub const TEMP_MIN: f32 = 5.0;
    pub const TEMP_MAX: f32 = 29.5;
    pub const OFFSET_MIN: f32 = -3.5;
    pub const OFFSET_MAX: f32 = 3.5;
}

/// Errors that can occur while interpreting a composed command
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("Command is not valid UTF-8")]
    NotUtf8,

    #[error("Invalid valve address: {0}")]
    InvalidAddress(#[from] MacParseError),

    #[error("No command given")]
    MissingCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("Invalid argument for {command}: {value}")]
    InvalidArgument { command: &'static str, value: String },
}

/// Operating modes exposed through Home Assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaMode {
    Off,
    Heat,
    Auto,
}

impl HaMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HaMode::Off => "off",
            HaMode::Heat => "heat",
            HaMode::Auto => "auto",
        }
    }
}

/// Commands understood by the valve controller
#[derive(Debug, Clone, PartialEq)]
pub enum ValveCommand {
    Lock,
    Unlock,
    Boost,
    Unboost,
    Auto,
    Manual,
    On,
    Off,
    /// Target temperature in degrees Celsius
    SetTemp(f32),
    /// Temperature offset in degrees Celsius
    Offset(f32),
    /// `None` means "use the bridge clock"
    SetTime(Option<[u8; 6]>),
    Mode(HaMode),
}

impl ValveCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ValveCommand::Lock => "lock",
            ValveCommand::Unlock => "unlock",
            ValveCommand::Boost => "boost",
            ValveCommand::Unboost => "unboost",
            ValveCommand::Auto => "auto",
            ValveCommand::Manual => "manual",
            ValveCommand::On => "on",
            ValveCommand::Off => "off",
            ValveCommand::SetTemp(_) => "settemp",
            ValveCommand::Offset(_) => "offset",
            ValveCommand::SetTime(_) => "settime",
            ValveCommand::Mode(_) => "mode",
        }
    }

    fn parse(name: &str, arg: Option<&str>) -> Result<Self, RequestError> {
        let cmd = match name {
            "lock" => ValveCommand::Lock,
            "unlock" => ValveCommand::Unlock,
            "boost" => ValveCommand::Boost,
            "unboost" => ValveCommand::Unboost,
            "auto" => ValveCommand::Auto,
            "manual" => ValveCommand::Manual,
            "on" => ValveCommand::On,
            "off" => ValveCommand::Off,
            "settemp" => {
                let value = arg.ok_or(RequestError::MissingArgument("settemp"))?;
                ValveCommand::SetTemp(parse_half_degrees(
                    "settemp",
                    value,
                    limits::TEMP_MIN,
                    limits::TEMP_MAX,
                )?)
            }
            "offset" => {
                let value = arg.ok_or(RequestError::MissingArgument("offset"))?;
                ValveCommand::Offset(parse_half_degrees(
                    "offset",
                    value,
                    limits::OFFSET_MIN,
                    limits::OFFSET_MAX,
                )?)
            }
            "settime" => ValveCommand::SetTime(arg.map(parse_timestamp).transpose()?),
            "mode" => {
                let value = arg.ok_or(RequestError::MissingArgument("mode"))?;
                let mode = match value {
                    "off" => HaMode::Off,
                    "heat" => HaMode::Heat,
                    "auto" => HaMode::Auto,
                    other => {
                        return Err(RequestError::InvalidArgument {
                            command: "mode",
                            value: other.into(),
                        })
                    }
                };
                ValveCommand::Mode(mode)
            }
            "" => return Err(RequestError::MissingCommand),
            other => return Err(RequestError::UnknownCommand(other.into())),
        };
        Ok(cmd)
    }
}

/// Home Assistant modes map onto plain valve commands
impl From<HaMode> for ValveCommand {
    fn from(mode: HaMode) -> Self {
        match mode {
            HaMode::Off => ValveCommand::Off,
            HaMode::Heat => ValveCommand::Manual,
            HaMode::Auto => ValveCommand::Auto,
        }
    }
}

/// A request addressed to one valve
#[derive(Debug, Clone, PartialEq)]
pub struct ValveRequest {
    pub address: MacAddress,
    pub command: ValveCommand,
}

impl ValveRequest {
    /// Interpret `"{MAC} {command}[ {argument}]"`
    ///
    /// An empty command followed by a payload (`"{MAC}  {payload}"`) takes
    /// the payload as the command line.
    pub fn parse(composed: &ComposedCommand) -> Result<Self, RequestError> {
        let text = composed.as_str().ok_or(RequestError::NotUtf8)?;
        Self::parse_str(text)
    }

    pub fn parse_str(text: &str) -> Result<Self, RequestError> {
        if text.len() < MAC_STR_LEN || !text.is_char_boundary(MAC_STR_LEN) {
            return Err(MacParseError::WrongLength(text.len()).into());
        }
        let (mac, rest) = text.split_at(MAC_STR_LEN);
        let address: MacAddress = mac.parse()?;

        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        let (name, arg) = match rest.split_once(' ') {
            Some(("", payload)) => match payload.trim().split_once(' ') {
                Some((name, arg)) => (name, Some(arg.trim())),
                None => (payload.trim(), None),
            },
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (rest, None),
        };
        let arg = arg.filter(|a| !a.is_empty());

        Ok(Self {
            address,
            command: ValveCommand::parse(name, arg)?,
        })
    }
}

impl fmt::Display for ValveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.address, self.command.name())?;
        match &self.command {
            ValveCommand::SetTemp(t) | ValveCommand::Offset(t) => write!(f, " {:.1}", t),
            ValveCommand::Mode(m) => write!(f, " {}", m.as_str()),
            ValveCommand::SetTime(Some(ts)) => {
                f.write_str(" ")?;
                ts.iter().try_for_each(|b| write!(f, "{:02x}", b))
            }
            _ => Ok(()),
        }
    }
}

fn parse_half_degrees(command: &'static str, value: &str, min: f32, max: f32) -> Result<f32, RequestError> {
    let invalid = || RequestError::InvalidArgument {
        command,
        value: value.into(),
    };
    let t: f32 = value.parse().map_err(|_| invalid())?;
    let doubled = t * 2.0;
    if !t.is_finite() || doubled.fract() != 0.0 || t < min || t > max {
        return Err(invalid());
    }
    Ok(t)
}

/// `YYMMDDhhmmss` as six hex-encoded bytes
fn parse_timestamp(value: &str) -> Result<[u8; 6], RequestError> {
    let invalid = || RequestError::InvalidArgument {
        command: "settime",
        value: value.into(),
    };
    if value.len() != 12 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let mut out = [0u8; 6];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&value[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Tokenizer;

    fn parse(text: &str) -> Result<ValveRequest, RequestError> {
        ValveRequest::parse_str(text)
    }

    #[test]
    fn test_simple_commands() {
        let req = parse("AA:BB:CC:DD:EE:FF lock").expect("parse failed");
        assert_eq!(req.address.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(req.command, ValveCommand::Lock);

        for (name, cmd) in [
            ("unlock", ValveCommand::Unlock),
            ("boost", ValveCommand::Boost),
            ("unboost", ValveCommand::Unboost),
            ("auto", ValveCommand::Auto),
            ("manual", ValveCommand::Manual),
            ("on", ValveCommand::On),
            ("off", ValveCommand::Off),
        ] {
            let req = parse(&format!("AA:BB:CC:DD:EE:FF {}", name)).expect("parse failed");
            assert_eq!(req.command, cmd);
        }
    }

    #[test]
    fn test_settemp_from_tokenizer() {
        let composed = Tokenizer::default()
            .tokenize("radin/trv/AA:BB:CC:DD:EE:FF/settemp", b"21.5")
            .expect("tokenize failed");
        let req = ValveRequest::parse(&composed).expect("parse failed");
        assert_eq!(req.command, ValveCommand::SetTemp(21.5));
        assert_eq!(req.to_string(), "AA:BB:CC:DD:EE:FF settemp 21.5");
    }

    #[test]
    fn test_settemp_limits() {
        assert!(parse("AA:BB:CC:DD:EE:FF settemp 5").is_ok());
        assert!(parse("AA:BB:CC:DD:EE:FF settemp 29.5").is_ok());
        for bad in ["4.5", "30", "21.3", "warm", "NaN"] {
            let result = parse(&format!("AA:BB:CC:DD:EE:FF settemp {}", bad));
            assert!(
                matches!(result, Err(RequestError::InvalidArgument { command: "settemp", .. })),
                "value {:?}",
                bad
            );
        }
        assert_eq!(
            parse("AA:BB:CC:DD:EE:FF settemp"),
            Err(RequestError::MissingArgument("settemp"))
        );
    }

    #[test]
    fn test_offset() {
        let req = parse("AA:BB:CC:DD:EE:FF offset -1.5").expect("parse failed");
        assert_eq!(req.command, ValveCommand::Offset(-1.5));
        assert!(parse("AA:BB:CC:DD:EE:FF offset 4").is_err());
    }

    #[test]
    fn test_settime() {
        let req = parse("AA:BB:CC:DD:EE:FF settime").expect("parse failed");
        assert_eq!(req.command, ValveCommand::SetTime(None));

        let req = parse("AA:BB:CC:DD:EE:FF settime 180a1b0c2d3e").expect("parse failed");
        assert_eq!(
            req.command,
            ValveCommand::SetTime(Some([0x18, 0x0a, 0x1b, 0x0c, 0x2d, 0x3e]))
        );
        assert_eq!(req.to_string(), "AA:BB:CC:DD:EE:FF settime 180a1b0c2d3e");

        assert!(parse("AA:BB:CC:DD:EE:FF settime 12345").is_err());
    }

    #[test]
    fn test_home_assistant_mode() {
        let req = parse("AA:BB:CC:DD:EE:FF mode heat").expect("parse failed");
        assert_eq!(req.command, ValveCommand::Mode(HaMode::Heat));
        assert!(matches!(
            parse("AA:BB:CC:DD:EE:FF mode cool"),
            Err(RequestError::InvalidArgument { command: "mode", .. })
        ));
    }

    #[test]
    fn test_ha_mode_translation() {
        assert_eq!(ValveCommand::from(HaMode::Off), ValveCommand::Off);
        assert_eq!(ValveCommand::from(HaMode::Heat), ValveCommand::Manual);
        assert_eq!(ValveCommand::from(HaMode::Auto), ValveCommand::Auto);
    }

    #[test]
    fn test_commandless_payload() {
        let composed = Tokenizer::default()
            .tokenize("radin/trv/AA:BB:CC:DD:EE:FF/", b"settemp 19")
            .expect("tokenize failed");
        let req = ValveRequest::parse(&composed).expect("parse failed");
        assert_eq!(req.command, ValveCommand::SetTemp(19.0));
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            parse("AA:BB:CC:DD:EE:FF dance"),
            Err(RequestError::UnknownCommand("dance".into()))
        );
        assert_eq!(parse("AA:BB:CC:DD:EE:FF "), Err(RequestError::MissingCommand));
        assert!(matches!(parse("AA:BB lock"), Err(RequestError::InvalidAddress(_))));
        // Tokenizer accepts any 17-char hex/colon token; the request parser is strict
        assert!(matches!(
            parse("AABBCCDDEEFF:::::: lock"),
            Err(RequestError::InvalidAddress(_))
        ));
    }
}
