//! MQTT session for the bridge
//!
//! This module handles:
//! - Broker connection with last will and automatic reconnection
//! - Re-subscribing and announcing on every (re)connect
//! - Publishing valve status and discovered device lists
//! - Queuing the device list while disconnected

mod session;

pub use session::{MqttSession, SessionEvent, SessionHandle};

use anyhow::Result;
use async_trait::async_trait;
use eq3_shared::MacAddress;

/// Outbound side of the session, as seen by the command executor
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a valve status message
    async fn send_status(&self, address: &MacAddress, status: &str) -> Result<()>;

    /// Publish the list of discovered valves
    async fn send_device_list(&self, list: String) -> Result<()>;
}
