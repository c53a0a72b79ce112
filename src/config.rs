//! Bridge configuration
//!
//! Defaults can be overridden from the environment:
//!
//! | variable               | field              |
//! |------------------------|--------------------|
//! | `EQ3_MQTT_ID`          | `client_id`        |
//! | `EQ3_MQTT_HOST`        | `broker_host`      |
//! | `EQ3_MQTT_PORT`        | `broker_port`      |
//! | `EQ3_MQTT_USER`        | `username`         |
//! | `EQ3_MQTT_PASS`        | `password`         |
//! | `EQ3_COMMAND_CAPACITY` | `command_capacity` |
//! | `EQ3_SIM_VALVES`       | `simulated_valves` |

use anyhow::{anyhow, Context, Result};
use eq3_shared::{MacAddress, DEFAULT_COMMAND_CAPACITY, MAC_STR_LEN};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// MQTT client id, also the prefix of every topic
    pub client_id: String,
    /// Broker hostname
    pub broker_host: String,
    /// Broker port (1883 unencrypted)
    pub broker_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// MQTT keep-alive interval
    pub keep_alive: Duration,
    /// Composed command capacity, terminator slot included
    pub command_capacity: usize,
    /// Depth of the queue between tokenizer and executor
    pub command_queue: usize,
    /// Reconnection delay (initial)
    pub reconnect_delay: Duration,
    /// Maximum reconnection delay
    pub max_reconnect_delay: Duration,
    /// Valves reported by the simulated link on scan
    pub simulated_valves: Vec<MacAddress>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            client_id: "eq3_".into(),
            broker_host: "127.0.0.1".into(),
            broker_port: 1883,
            username: None,
            password: None,
            keep_alive: Duration::from_secs(60),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            command_queue: 16,
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            simulated_valves: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overlaid with `EQ3_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, then validate
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("EQ3_MQTT_ID") {
            self.client_id = id;
        }
        if let Some(host) = lookup("EQ3_MQTT_HOST") {
            self.broker_host = host;
        }
        if let Some(port) = lookup("EQ3_MQTT_PORT") {
            self.broker_port = parse_var("EQ3_MQTT_PORT", &port)?;
        }
        if let Some(user) = lookup("EQ3_MQTT_USER") {
            self.username = Some(user).filter(|u| !u.is_empty());
        }
        if let Some(pass) = lookup("EQ3_MQTT_PASS") {
            self.password = Some(pass).filter(|p| !p.is_empty());
        }
        if let Some(cap) = lookup("EQ3_COMMAND_CAPACITY") {
            self.command_capacity = parse_var("EQ3_COMMAND_CAPACITY", &cap)?;
        }
        if let Some(list) = lookup("EQ3_SIM_VALVES") {
            self.simulated_valves = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_var("EQ3_SIM_VALVES", s))
                .collect::<Result<_>>()?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(anyhow!("MQTT client id must not be empty"));
        }
        if self.broker_host.is_empty() {
            return Err(anyhow!("MQTT broker host must not be empty"));
        }
        // Address, separator and at least a one-byte command, plus terminator
        let minimum = MAC_STR_LEN + 3;
        if self.command_capacity < minimum {
            return Err(anyhow!(
                "Command capacity {} is below the minimum of {}",
                self.command_capacity,
                minimum
            ));
        }
        if self.command_queue == 0 {
            return Err(anyhow!("Command queue depth must be at least 1"));
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overlay(vars: &[(&str, &str)]) -> Result<BridgeConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BridgeConfig::default().overlay(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = overlay(&[]).expect("defaults should validate");
        assert_eq!(config.client_id, "eq3_");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.command_capacity, 80);
    }

    #[test]
    fn test_overrides() {
        let config = overlay(&[
            ("EQ3_MQTT_ID", "living_"),
            ("EQ3_MQTT_HOST", "broker.lan"),
            ("EQ3_MQTT_PORT", "8883"),
            ("EQ3_MQTT_USER", "eq3"),
            ("EQ3_MQTT_PASS", ""),
            ("EQ3_COMMAND_CAPACITY", "128"),
            ("EQ3_SIM_VALVES", "00:1A:22:0C:3E:5F, 00:1A:22:0C:3E:60"),
        ])
        .expect("overlay failed");

        assert_eq!(config.client_id, "living_");
        assert_eq!(config.broker_host, "broker.lan");
        assert_eq!(config.broker_port, 8883);
        assert_eq!(config.username.as_deref(), Some("eq3"));
        assert_eq!(config.password, None);
        assert_eq!(config.command_capacity, 128);
        assert_eq!(config.simulated_valves.len(), 2);
    }

    #[test]
    fn test_invalid_values() {
        assert!(overlay(&[("EQ3_MQTT_PORT", "http")]).is_err());
        assert!(overlay(&[("EQ3_MQTT_ID", "")]).is_err());
        assert!(overlay(&[("EQ3_COMMAND_CAPACITY", "19")]).is_err());
        assert!(overlay(&[("EQ3_SIM_VALVES", "not-a-mac")]).is_err());
    }
}
