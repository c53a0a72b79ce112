//! Temperature command handlers

use super::{forward, HandlerContext};
use crate::command::CommandResult;
use eq3_shared::{ValveCommand, ValveRequest};
use tracing::info;

/// Handle SETTEMP (target temperature, manual mode)
pub async fn handle_settemp(ctx: &HandlerContext<'_>, request: &ValveRequest) -> CommandResult {
    let ValveCommand::SetTemp(temp) = request.command else {
        return CommandResult::Rejected {
            message: "Missing target temperature".into(),
        };
    };

    info!("  [SETTEMP] {} -> {:.1}C", request.address, temp);
    forward(ctx, request).await
}

/// Handle OFFSET (sensor offset correction)
pub async fn handle_offset(ctx: &HandlerContext<'_>, request: &ValveRequest) -> CommandResult {
    let ValveCommand::Offset(offset) = request.command else {
        return CommandResult::Rejected {
            message: "Missing offset".into(),
        };
    };

    info!("  [OFFSET] {} -> {:+.1}C", request.address, offset);
    forward(ctx, request).await
}
