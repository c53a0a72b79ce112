//! Valve status as published to `{id}radout/status/{MAC}`

use eq3_shared::{HaMode, MacAddress};
use serde::Serialize;

/// Temperature the valves report when switched off
pub const OFF_TEMP: f32 = 4.5;

/// Temperature the valves report when switched fully on
pub const ON_TEMP: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValveMode {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatteryState {
    Good,
    Low,
}

/// Snapshot of one valve
#[derive(Debug, Clone, PartialEq)]
pub struct ValveStatus {
    pub address: MacAddress,
    pub temperature: f32,
    pub offset: f32,
    pub mode: ValveMode,
    pub boost: bool,
    pub locked: bool,
    pub window_open: bool,
    pub battery: BatteryState,
    /// Valve opening in percent
    pub valve: u8,
}

/// JSON layout of a status message
#[derive(Serialize)]
struct StatusMessage<'a> {
    trv: String,
    temp: f32,
    #[serde(rename = "offsetTemp")]
    offset_temp: f32,
    mode: ValveMode,
    mode_ha: &'a str,
    boost: &'a str,
    state: &'a str,
    window: &'a str,
    battery: BatteryState,
    valve: u8,
}

impl ValveStatus {
    /// A valve in its power-on state
    pub fn new(address: MacAddress) -> Self {
        Self {
            address,
            temperature: 20.0,
            offset: 0.0,
            mode: ValveMode::Auto,
            boost: false,
            locked: false,
            window_open: false,
            battery: BatteryState::Good,
            valve: 0,
        }
    }

    /// Mode as Home Assistant's climate entity sees it
    pub fn ha_mode(&self) -> HaMode {
        if self.temperature <= OFF_TEMP {
            HaMode::Off
        } else if self.mode == ValveMode::Auto {
            HaMode::Auto
        } else {
            HaMode::Heat
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&StatusMessage {
            trv: self.address.to_string(),
            temp: self.temperature,
            offset_temp: self.offset,
            mode: self.mode,
            mode_ha: self.ha_mode().as_str(),
            boost: if self.boost { "active" } else { "inactive" },
            state: if self.locked { "locked" } else { "unlocked" },
            window: if self.window_open { "open" } else { "closed" },
            battery: self.battery,
            valve: self.valve,
        })
    }
}
