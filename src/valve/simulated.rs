//! In-memory valve link for running the bridge without BLE hardware

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use eq3_shared::{MacAddress, ValveCommand, ValveRequest};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::status::{BatteryState, OFF_TEMP, ON_TEMP};
use super::{ValveLink, ValveMode, ValveStatus};

/// Valve opening reported while boosting
const BOOST_VALVE_PERCENT: u8 = 80;

/// Commands a fresh battery lasts before the valve reports it low
const BATTERY_COMMANDS: u32 = 500;

struct SimulatedValve {
    status: ValveStatus,
    commands: u32,
}

impl SimulatedValve {
    fn new(address: MacAddress) -> Self {
        Self {
            status: ValveStatus::new(address),
            commands: 0,
        }
    }
}

/// Simulated valves keyed by address
pub struct SimulatedValveLink {
    known: Vec<MacAddress>,
    valves: Mutex<HashMap<MacAddress, SimulatedValve>>,
    battery_commands: u32,
}

impl SimulatedValveLink {
    /// Create a link that reports `known` on scan
    pub fn new(known: Vec<MacAddress>) -> Self {
        let valves = known
            .iter()
            .map(|mac| (*mac, SimulatedValve::new(*mac)))
            .collect();
        Self {
            known,
            valves: Mutex::new(valves),
            battery_commands: BATTERY_COMMANDS,
        }
    }

    /// Current state of a valve, if it has been seen
    #[cfg(test)]
    pub async fn status(&self, address: &MacAddress) -> Option<ValveStatus> {
        self.valves.lock().await.get(address).map(|v| v.status.clone())
    }

    /// Open or close the window next to a valve
    #[cfg(test)]
    pub async fn set_window(&self, address: MacAddress, open: bool) {
        self.valves
            .lock()
            .await
            .entry(address)
            .or_insert_with(|| SimulatedValve::new(address))
            .status
            .window_open = open;
    }
}

#[async_trait]
impl ValveLink for SimulatedValveLink {
    async fn send(&self, request: &ValveRequest) -> Result<ValveStatus> {
        let mut valves = self.valves.lock().await;
        let valve = valves
            .entry(request.address)
            .or_insert_with(|| SimulatedValve::new(request.address));

        apply(&mut valve.status, &request.command)?;

        valve.commands += 1;
        if valve.commands >= self.battery_commands {
            valve.status.battery = BatteryState::Low;
        }

        let status = &valve.status;
        debug!("[SIM] {} -> temp={} mode={:?} valve={}%", request, status.temperature, status.mode, status.valve);
        Ok(status.clone())
    }

    async fn scan(&self) -> Result<Vec<MacAddress>> {
        Ok(self.known.clone())
    }

    fn name(&self) -> &'static str {
        "Simulated"
    }
}

fn apply(valve: &mut ValveStatus, command: &ValveCommand) -> Result<()> {
    match command {
        ValveCommand::Lock => valve.locked = true,
        ValveCommand::Unlock => valve.locked = false,
        ValveCommand::Boost => valve.boost = true,
        ValveCommand::Unboost => valve.boost = false,
        ValveCommand::Auto => valve.mode = ValveMode::Auto,
        ValveCommand::Manual => valve.mode = ValveMode::Manual,
        ValveCommand::On => {
            valve.mode = ValveMode::Manual;
            valve.temperature = ON_TEMP;
        }
        ValveCommand::Off => {
            valve.mode = ValveMode::Manual;
            valve.temperature = OFF_TEMP;
        }
        ValveCommand::SetTemp(t) => {
            valve.mode = ValveMode::Manual;
            valve.temperature = *t;
        }
        ValveCommand::Offset(o) => valve.offset = *o,
        ValveCommand::SetTime(None) => {
            return Err(anyhow!("settime needs a resolved timestamp"));
        }
        ValveCommand::SetTime(Some(_)) => {}
        ValveCommand::Mode(m) => {
            return Err(anyhow!("Home Assistant mode {:?} must be translated first", m.as_str()));
        }
    }

    // Window-open mode closes the valve until the window shuts
    valve.valve = if valve.window_open {
        0
    } else if valve.boost {
        BOOST_VALVE_PERCENT
    } else if valve.temperature >= ON_TEMP {
        100
    } else if valve.temperature <= OFF_TEMP {
        0
    } else {
        // Crude proportional opening between off and on
        (((valve.temperature - OFF_TEMP) / (ON_TEMP - OFF_TEMP)) * 100.0) as u8
    };

    Ok(())
}
