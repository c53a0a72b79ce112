mod command;
mod config;
mod mqtt;
mod valve;

use anyhow::Result;
use command::CommandExecutor;
use config::BridgeConfig;
use eq3_shared::{ComposedCommand, InboundKind, Tokenizer};
use mqtt::{MqttSession, SessionEvent, SessionHandle};
use std::sync::Arc;
use tokio::sync::mpsc;
use valve::SimulatedValveLink;

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = BridgeConfig::from_env()?;

    info!("EQ-3 bridge v{} starting: {}", eq3_shared::VERSION, config.client_id);
    info!("  Broker: {}:{}", config.broker_host, config.broker_port);

    let mut session = MqttSession::new(&config)?;
    let handle = session.handle();
    info!("  Commands on: {}", handle.topics().subscription());

    let link = Arc::new(SimulatedValveLink::new(config.simulated_valves.clone()));
    let executor = Arc::new(CommandExecutor::new(link, Arc::new(handle.clone())));
    info!("Valve link initialized ({} known valves)", config.simulated_valves.len());

    // Spawn command executor
    let (command_tx, command_rx) = mpsc::channel::<ComposedCommand>(config.command_queue);
    tokio::spawn(executor.clone().run(command_rx));

    let tokenizer = Tokenizer::new(config.command_capacity);

    // Main event loop
    loop {
        tokio::select! {
            event = session.recv() => match event {
                Some(SessionEvent::Connected) => {
                    info!("MQTT connected");
                }
                Some(SessionEvent::Disconnected { reason }) => {
                    warn!("MQTT disconnected - wait for reconnect: {}", reason);
                }
                Some(SessionEvent::Message { topic, payload }) => {
                    handle_inbound(&topic, &payload, &tokenizer, &command_tx, &handle, &executor);
                }
                None => {
                    error!("MQTT session closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Route one inbound message
///
/// Topics are matched by substring; every matching action runs.
fn handle_inbound(
    topic: &str,
    payload: &[u8],
    tokenizer: &Tokenizer,
    command_tx: &mpsc::Sender<ComposedCommand>,
    session: &SessionHandle,
    executor: &Arc<CommandExecutor>,
) {
    let kind = InboundKind::classify(topic);
    debug!("Inbound {} ({} bytes): {:?}", topic, payload.len(), kind);

    if kind.valve_command {
        info!("TRV command: {}", topic);
        let mut forward = |command: ComposedCommand| {
            if let Err(e) = command_tx.try_send(command) {
                error!("Command queue unavailable, dropping command: {}", e);
            }
        };
        // Rejections are logged by the tokenizer; nothing is sent back
        let _ = tokenizer.dispatch(topic, payload, &mut forward);
    }

    if kind.scan {
        let executor = executor.clone();
        tokio::spawn(async move {
            match executor.scan().await {
                Ok(count) => info!("Scan complete: {} valves", count),
                Err(e) => error!("Scan failed: {:#}", e),
            }
        });
    }

    if kind.check {
        if let Err(e) = session.send_check_response() {
            error!("{:#}", e);
        }
    }

    if kind.is_empty() {
        debug!("  Unhandled topic");
    }
}
