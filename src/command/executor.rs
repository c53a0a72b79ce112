//! Command executor - validates and dispatches composed valve commands

use super::handlers::{self, HandlerContext};
use crate::mqtt::Publisher;
use crate::valve::{ValveLink, ValveStatus};
use anyhow::{Context, Result};
use eq3_shared::{now_ms, ComposedCommand, ValveCommand, ValveRequest};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Result of command execution
#[derive(Debug, Clone)]
pub enum CommandResult {
    /// Command reached the valve
    Completed {
        message: String,
        status: Option<ValveStatus>,
    },
    /// Command was valid but the valve link failed
    Failed { message: String },
    /// Command rejected before reaching the valve
    Rejected { message: String },
}

/// Executes composed commands against the valve link
pub struct CommandExecutor {
    link: Arc<dyn ValveLink>,
    publisher: Arc<dyn Publisher>,
}

impl CommandExecutor {
    /// Create a new command executor
    pub fn new(link: Arc<dyn ValveLink>, publisher: Arc<dyn Publisher>) -> Self {
        Self { link, publisher }
    }

    /// Execute one composed command and publish the resulting status
    pub async fn execute(&self, composed: &ComposedCommand) -> CommandResult {
        let start_time = now_ms();

        let request = match ValveRequest::parse(composed) {
            Ok(request) => request,
            Err(e) => {
                warn!("Command \"{}\" rejected: {}", composed, e);
                return CommandResult::Rejected {
                    message: e.to_string(),
                };
            }
        };

        info!("Executing command: {}", request);

        let ctx = HandlerContext {
            link: self.link.as_ref(),
        };

        // Dispatch to appropriate handler
        let result = match request.command {
            ValveCommand::SetTemp(_) => handlers::handle_settemp(&ctx, &request).await,
            ValveCommand::Offset(_) => handlers::handle_offset(&ctx, &request).await,
            ValveCommand::SetTime(_) => handlers::handle_settime(&ctx, &request).await,
            ValveCommand::Mode(_) => handlers::handle_ha_mode(&ctx, &request).await,
            _ => handlers::handle_switch(&ctx, &request).await,
        };

        let processing_time = now_ms().saturating_sub(start_time);

        match &result {
            CommandResult::Completed { message, status } => {
                info!("  Command completed in {}ms: {}", processing_time, message);
                if let Some(status) = status {
                    if let Err(e) = self.publish_status(status).await {
                        error!("Failed to publish status: {:#}", e);
                    }
                }
            }
            CommandResult::Failed { message } => {
                warn!("  Command failed: {}", message);
            }
            CommandResult::Rejected { message } => {
                warn!("  Command rejected: {}", message);
            }
        }

        result
    }

    /// Scan for valves and publish the device list
    pub async fn scan(&self) -> Result<usize> {
        info!("Starting valve scan via {} link", self.link.name());
        let found = self.link.scan().await.context("Valve scan failed")?;

        let list: Vec<String> = found.iter().map(|mac| mac.to_string()).collect();
        let json = serde_json::to_string(&list).context("Failed to encode device list")?;

        self.publisher.send_device_list(json).await?;
        Ok(found.len())
    }

    /// Execute commands until the sending side closes
    pub async fn run(self: Arc<Self>, mut command_rx: mpsc::Receiver<ComposedCommand>) {
        while let Some(composed) = command_rx.recv().await {
            let result = self.execute(&composed).await;
            debug!("  Result: {:?}", result);
        }
        info!("Command queue closed, executor stopping");
    }

    async fn publish_status(&self, status: &ValveStatus) -> Result<()> {
        let json = status.to_json().context("Failed to encode status")?;
        self.publisher.send_status(&status.address, &json).await
    }
}
