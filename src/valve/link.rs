//! Valve link trait for pluggable valve backends

use anyhow::Result;
use async_trait::async_trait;
use eq3_shared::{MacAddress, ValveRequest};

use super::ValveStatus;

/// Carries requests to valves and reports their status
#[async_trait]
pub trait ValveLink: Send + Sync {
    /// Execute a request and return the valve's resulting status
    async fn send(&self, request: &ValveRequest) -> Result<ValveStatus>;

    /// Look for valves in range
    async fn scan(&self) -> Result<Vec<MacAddress>>;

    /// Human-readable name for this link
    fn name(&self) -> &'static str;
}
