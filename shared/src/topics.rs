//! MQTT topic layout for one bridge instance
//!
//! All topics derive from the MQTT client id:
//! ```text
//! {id}radin/#                  subscribed, commands in
//! {id}radin/trv/{MAC}/{cmd}    valve command
//! {id}radin/scan               start a valve scan
//! {id}radin/check              liveness check
//! {id}radout                   last will
//! {id}radout/connect           announce on connect
//! {id}radout/devlist           discovered valves
//! {id}radout/checkresp         reply to check
//! {id}radout/status/{MAC}      valve status
//! ```

use crate::mac::MacAddress;

/// Last-will message published by the broker when the bridge drops off
pub const LWT_MESSAGE: &str = "Heating control offline";

/// Topic names derived from the client id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLayout {
    in_base: String,
    out_base: String,
}

impl TopicLayout {
    pub fn new(client_id: &str) -> Self {
        Self {
            in_base: format!("{}radin", client_id),
            out_base: format!("{}radout", client_id),
        }
    }

    pub fn subscription(&self) -> String {
        format!("{}/#", self.in_base)
    }

    pub fn last_will(&self) -> &str {
        &self.out_base
    }

    pub fn connect(&self) -> String {
        format!("{}/connect", self.out_base)
    }

    pub fn device_list(&self) -> String {
        format!("{}/devlist", self.out_base)
    }

    pub fn check_response(&self) -> String {
        format!("{}/checkresp", self.out_base)
    }

    pub fn status(&self, mac: &MacAddress) -> String {
        format!("{}/status/{}", self.out_base, mac)
    }

    /// Command topic for one valve, as Home Assistant would use it
    pub fn command(&self, mac: &MacAddress, command: &str) -> String {
        format!("{}/trv/{}/{}", self.in_base, mac, command)
    }
}

/// Actions requested by an inbound topic
///
/// Topics are matched by substring, so one topic can request more than one
/// action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundKind {
    pub valve_command: bool,
    pub scan: bool,
    pub check: bool,
}

impl InboundKind {
    pub fn classify(topic: &str) -> Self {
        Self {
            valve_command: topic.contains("/trv"),
            scan: topic.contains("/scan"),
            check: topic.contains("/check"),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.valve_command || self.scan || self.check)
    }
}
