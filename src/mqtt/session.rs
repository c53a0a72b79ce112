//! MQTT session with automatic reconnection

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use eq3_shared::{messages, MacAddress, TopicLayout, LWT_MESSAGE};
use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use super::Publisher;
use crate::config::BridgeConfig;

/// Capacity of the client request queue
const REQUEST_QUEUE: usize = 20;

/// Events emitted by the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Broker accepted the connection
    Connected,
    /// Connection lost; the session keeps retrying
    Disconnected { reason: String },
    /// A message arrived on a subscribed topic
    Message { topic: String, payload: Bytes },
}

/// Broker connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NotConnected,
    Connected,
}

/// Mutable session state shared by the event loop and publishers
#[derive(Debug, Default)]
struct SessionContext {
    state: SessionState,
    /// Device list waiting for the next connect; only the latest is kept
    pending_devlist: Option<String>,
}

impl SessionContext {
    /// Mark connected and hand back any queued device list
    fn connect(&mut self) -> Option<String> {
        self.state = SessionState::Connected;
        self.pending_devlist.take()
    }

    fn disconnect(&mut self) {
        self.state = SessionState::NotConnected;
    }

    /// Queue a device list, returning the one it replaced
    fn queue_device_list(&mut self, list: String) -> Option<String> {
        self.pending_devlist.replace(list)
    }
}

/// Cloneable handle for publishing through the session
#[derive(Clone)]
pub struct SessionHandle {
    client: AsyncClient,
    topics: Arc<TopicLayout>,
    context: Arc<Mutex<SessionContext>>,
}

impl SessionHandle {
    /// Current connection state
    pub async fn state(&self) -> SessionState {
        self.context.lock().await.state
    }

    pub fn topics(&self) -> &TopicLayout {
        &self.topics
    }

    /// Reply to a `/check` request
    pub fn send_check_response(&self) -> Result<()> {
        let topic = self.topics.check_response();
        self.client
            .try_publish(&topic, QoS::AtMostOnce, false, messages::check_response())
            .with_context(|| format!("Failed to publish to {}", topic))
    }

    /// Subscribe, announce and flush the queued device list
    ///
    /// Runs inside the event loop task, so only non-blocking client calls
    /// are used here.
    async fn on_connected(&self) {
        let pending = self.context.lock().await.connect();

        let subscription = self.topics.subscription();
        match self.client.try_subscribe(&subscription, QoS::AtMostOnce) {
            Ok(()) => info!("Subscribed to {}", subscription),
            Err(e) => error!("Failed to subscribe to {}: {}", subscription, e),
        }

        let announce = messages::announce();
        if let Err(e) = self
            .client
            .try_publish(self.topics.connect(), QoS::AtMostOnce, false, announce.clone())
        {
            error!("Failed to publish announce: {}", e);
        } else {
            info!("Published \"{}\" to {}", announce, self.topics.connect());
        }

        if let Some(list) = pending {
            info!("Publishing queued device list: {}", list);
            if let Err(e) = self
                .client
                .try_publish(self.topics.device_list(), QoS::AtMostOnce, false, list)
            {
                error!("Failed to publish device list: {}", e);
            }
        }
    }

    async fn on_disconnected(&self) {
        self.context.lock().await.disconnect();
    }

    #[cfg(test)]
    pub(crate) async fn pending_device_list(&self) -> Option<String> {
        self.context.lock().await.pending_devlist.clone()
    }
}

#[async_trait]
impl Publisher for SessionHandle {
    async fn send_status(&self, address: &MacAddress, status: &str) -> Result<()> {
        if self.state().await != SessionState::Connected {
            warn!("Not connected, dropping status for {}", address);
            return Ok(());
        }

        let topic = self.topics.status(address);
        self.client
            .publish(&topic, QoS::AtMostOnce, false, status.to_owned())
            .await
            .with_context(|| format!("Failed to publish to {}", topic))
    }

    async fn send_device_list(&self, list: String) -> Result<()> {
        {
            let mut context = self.context.lock().await;
            if context.state != SessionState::Connected {
                info!("Queue device list message to publish");
                if let Some(old) = context.queue_device_list(list) {
                    debug!("Replaced queued device list: {}", old);
                }
                return Ok(());
            }
        }

        let topic = self.topics.device_list();
        self.client
            .publish(&topic, QoS::AtMostOnce, false, list)
            .await
            .with_context(|| format!("Failed to publish to {}", topic))
    }
}

/// Owns the event stream of one broker session
pub struct MqttSession {
    handle: SessionHandle,
    event_rx: mpsc::Receiver<SessionEvent>,
}

impl MqttSession {
    /// Configure the client and start the event loop
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        config.validate().context("Invalid MQTT configuration")?;

        let topics = TopicLayout::new(&config.client_id);

        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(config.keep_alive);
        if let Some(user) = &config.username {
            options.set_credentials(user.clone(), config.password.clone().unwrap_or_default());
        }
        options.set_last_will(LastWill::new(
            topics.last_will(),
            LWT_MESSAGE,
            QoS::AtMostOnce,
            false,
        ));

        let (client, eventloop) = AsyncClient::new(options, REQUEST_QUEUE);
        let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(100);

        let handle = SessionHandle {
            client,
            topics: Arc::new(topics),
            context: Arc::new(Mutex::new(SessionContext::default())),
        };

        info!("Last will topic: {}", handle.topics.last_will());
        info!("Client id: {}", config.client_id);

        let loop_handle = handle.clone();
        let backoff = (config.reconnect_delay, config.max_reconnect_delay);
        tokio::spawn(async move {
            session_loop(eventloop, loop_handle, backoff, event_tx).await;
        });

        Ok(Self { handle, event_rx })
    }

    /// Receive the next session event
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.event_rx.recv().await
    }

    /// Get a clone of the publishing handle
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }
}

/// Drive the client event loop, reconnecting with exponential backoff
async fn session_loop(
    mut eventloop: EventLoop,
    handle: SessionHandle,
    (initial_delay, max_delay): (Duration, Duration),
    event_tx: mpsc::Sender<SessionEvent>,
) {
    let mut reconnect_delay = initial_delay;

    loop {
        let event = match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                reconnect_delay = initial_delay;
                handle.on_connected().await;
                SessionEvent::Connected
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!("Received {} bytes on {}", publish.payload.len(), publish.topic);
                SessionEvent::Message {
                    topic: publish.topic,
                    payload: publish.payload,
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                handle.on_disconnected().await;
                SessionEvent::Disconnected {
                    reason: "Broker sent disconnect".into(),
                }
            }
            Ok(_) => continue,
            Err(e) => {
                handle.on_disconnected().await;
                if event_tx
                    .send(SessionEvent::Disconnected {
                        reason: e.to_string(),
                    })
                    .await
                    .is_err()
                {
                    break;
                }

                // Wait before reconnecting
                tokio::time::sleep(reconnect_delay).await;
                reconnect_delay = std::cmp::min(reconnect_delay * 2, max_delay);
                continue;
            }
        };

        if event_tx.send(event).await.is_err() {
            break;
        }
    }

    warn!("Session event receiver dropped, stopping event loop");
}
