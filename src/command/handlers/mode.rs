//! Mode switching command handlers

use super::{forward, HandlerContext};
use crate::command::CommandResult;
use eq3_shared::{ValveCommand, ValveRequest};
use tracing::info;

/// Handle lock, unlock, boost, unboost, auto, manual, on and off
pub async fn handle_switch(ctx: &HandlerContext<'_>, request: &ValveRequest) -> CommandResult {
    match request.command {
        ValveCommand::Lock
        | ValveCommand::Unlock
        | ValveCommand::Boost
        | ValveCommand::Unboost
        | ValveCommand::Auto
        | ValveCommand::Manual
        | ValveCommand::On
        | ValveCommand::Off => forward(ctx, request).await,
        _ => CommandResult::Rejected {
            message: format!("{} is not a switch command", request.command.name()),
        },
    }
}

/// Handle a mode change from Home Assistant's climate entity
///
/// `off` switches the valve off, `heat` selects manual mode, `auto` selects
/// the valve's own schedule.
pub async fn handle_ha_mode(ctx: &HandlerContext<'_>, request: &ValveRequest) -> CommandResult {
    let mode = match request.command {
        ValveCommand::Mode(mode) => mode,
        _ => {
            return CommandResult::Rejected {
                message: "Missing mode".into(),
            };
        }
    };

    let translated = ValveRequest {
        address: request.address,
        command: mode.into(),
    };
    info!("  [MODE] {} -> {}", mode.as_str(), translated.command.name());

    forward(ctx, &translated).await
}
