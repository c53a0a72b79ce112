//! Command handlers for different valve commands

mod clock;
mod mode;
mod temperature;

pub use clock::handle_settime;
pub use mode::{handle_ha_mode, handle_switch};
pub use temperature::{handle_offset, handle_settemp};

use super::CommandResult;
use crate::valve::ValveLink;
use eq3_shared::ValveRequest;
use tracing::debug;

/// Context passed to command handlers
pub struct HandlerContext<'a> {
    pub link: &'a dyn ValveLink,
}

/// Send a request over the link and turn the outcome into a result
async fn forward(ctx: &HandlerContext<'_>, request: &ValveRequest) -> CommandResult {
    debug!("  Forwarding \"{}\" via {} link", request, ctx.link.name());
    match ctx.link.send(request).await {
        Ok(status) => CommandResult::Completed {
            message: format!("{} applied to {}", request.command.name(), request.address),
            status: Some(status),
        },
        Err(e) => CommandResult::Failed {
            message: format!("{} failed on {}: {}", request.command.name(), request.address, e),
        },
    }
}
