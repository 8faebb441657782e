//! Connection management for the live channel
//!
//! This module handles connection establishment and the socket.io
//! handshake, reconnection logic, and frame reading from the backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::LiveConfig;
use crate::error::{PetCareError, Result};
use crate::live::io::{ChannelConnector, ConnectionPair, FrameReader, FrameWriter};
use crate::live::protocol::{encode_connect, socket_url, LiveEvent, Packet, PONG};
use crate::storage::TokenProvider;
use crate::store::{Action, Store};
use crate::types::SensorKind;

/// Internal connection state
#[derive(Debug, Clone, Default)]
pub(crate) struct ConnectionState {
    pub connected: bool,
    pub reconnecting: bool,
    pub reconnect_attempts: u32,
}

/// Shared state for connection management
///
/// Everything here is shared between the client, the reader task and the
/// reconnection task.
#[derive(Clone)]
pub(crate) struct SharedConnectionState {
    pub state: Arc<RwLock<ConnectionState>>,
    pub writer: Arc<Mutex<Option<Box<dyn FrameWriter>>>>,
    pub event_sender: broadcast::Sender<LiveEvent>,
    pub reader_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    pub reconnect_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    pub auto_reconnect_enabled: Arc<AtomicBool>,
    /// Cleared by `disconnect` so a dying reader does not start reconnecting
    pub session_active: Arc<AtomicBool>,
    pub stop_reconnect: Arc<Notify>,
    pub connector: Arc<dyn ChannelConnector>,
    pub credentials: Arc<Mutex<Option<Arc<dyn TokenProvider>>>>,
    pub store: Store,
}

impl SharedConnectionState {
    pub fn new(
        auto_reconnect_enabled: bool,
        connector: Arc<dyn ChannelConnector>,
        store: Store,
    ) -> Self {
        let (event_sender, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(ConnectionState::default())),
            writer: Arc::new(Mutex::new(None)),
            event_sender,
            reader_handle: Arc::new(Mutex::new(None)),
            reconnect_handle: Arc::new(Mutex::new(None)),
            auto_reconnect_enabled: Arc::new(AtomicBool::new(auto_reconnect_enabled)),
            session_active: Arc::new(AtomicBool::new(false)),
            stop_reconnect: Arc::new(Notify::new()),
            connector,
            credentials: Arc::new(Mutex::new(None)),
            store,
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.connected
    }

    pub async fn is_reconnecting(&self) -> bool {
        self.state.read().await.reconnecting
    }

    fn should_reconnect(&self) -> bool {
        self.auto_reconnect_enabled.load(Ordering::SeqCst)
            && self.session_active.load(Ordering::SeqCst)
    }

    /// Stop ongoing reconnection attempts
    pub async fn stop_reconnection(&self) {
        debug!("Stopping reconnection attempts");
        self.stop_reconnect.notify_waiters();
        if let Some(handle) = self.reconnect_handle.lock().await.take() {
            handle.abort();
        }
        self.state.write().await.reconnecting = false;
    }

    /// Open a connection and join the default namespace with a freshly
    /// fetched token
    pub async fn open(&self, config: &LiveConfig) -> Result<ConnectionPair> {
        let url = socket_url(&config.url)?;
        let provider = self.credentials.lock().await.clone();
        let token = match provider {
            Some(provider) => provider.access_token().await?,
            None => None,
        };
        let timeout = Duration::from_secs(config.connection_timeout_seconds);

        let opening = async {
            let mut pair = self.connector.connect(&url, timeout).await?;
            if let Err(e) = handshake(&mut pair, token.as_deref()).await {
                let _ = pair.writer.shutdown().await;
                return Err(e);
            }
            Ok::<_, PetCareError>(pair)
        };
        tokio::time::timeout(timeout, opening)
            .await
            .map_err(|_| PetCareError::Timeout(format!("Handshake with {} timed out", url)))?
    }

    /// Install a freshly opened connection and start reading from it
    pub async fn install(&self, pair: ConnectionPair, config: &LiveConfig) {
        *self.writer.lock().await = Some(pair.writer);
        {
            let mut state = self.state.write().await;
            state.connected = true;
            state.reconnecting = false;
            state.reconnect_attempts = 0;
        }
        // Held across the spawn so a reconnect racing with a fast-failing
        // reader cannot have its handle overwritten by this one
        let mut reader_handle = self.reader_handle.lock().await;
        *reader_handle = Some(spawn_reader_task(pair.reader, config.clone(), self.clone()));
    }

    /// Schedule reconnection
    ///
    /// The previous handle belongs to a task that has already finished or is
    /// about to return after installing the connection that just dropped.
    pub async fn start_reconnect(&self, config: &LiveConfig) {
        let task = spawn_reconnect_task(config.clone(), self.clone());
        *self.reconnect_handle.lock().await = Some(task);
    }
}

fn closed_during_handshake() -> PetCareError {
    PetCareError::ConnectionFailed("Connection closed during handshake".to_string())
}

/// Complete the Engine.IO open and socket.io CONNECT exchange
///
/// The token travels as the `auth` payload of the CONNECT packet.
pub(crate) async fn handshake(pair: &mut ConnectionPair, token: Option<&str>) -> Result<()> {
    let open = pair
        .reader
        .read_frame()
        .await?
        .ok_or_else(closed_during_handshake)?;
    match Packet::decode(&open)? {
        Packet::Open(session) => debug!(
            "Engine.IO session {} opened (ping interval {} ms)",
            session.sid, session.ping_interval
        ),
        other => {
            return Err(PetCareError::ConnectionFailed(format!(
                "Expected open packet, got {:?}",
                other
            )))
        }
    }

    pair.writer.write_frame(&encode_connect(token)?).await?;

    loop {
        let frame = pair
            .reader
            .read_frame()
            .await?
            .ok_or_else(closed_during_handshake)?;
        match Packet::decode(&frame)? {
            Packet::Connected => return Ok(()),
            Packet::ConnectError(message) => {
                return Err(PetCareError::ConnectionFailed(format!(
                    "Connection refused: {}",
                    message
                )))
            }
            Packet::Ping => pair.writer.write_frame(PONG).await?,
            Packet::Close | Packet::Disconnect => return Err(closed_during_handshake()),
            other => debug!("Ignoring {:?} during handshake", other),
        }
    }
}

/// Spawn a reconnection task
///
/// Waits the configured interval before every attempt and gives up once the
/// attempt count exceeds `max_retries`. A fresh token is fetched for each
/// attempt since the previous one may have been refreshed meanwhile.
pub(crate) fn spawn_reconnect_task(
    config: LiveConfig,
    shared: SharedConnectionState,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        shared.state.write().await.reconnecting = true;

        let interval = Duration::from_secs(config.reconnect.interval_seconds);
        let max_retries = config.reconnect.max_retries;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            if !shared.should_reconnect() {
                debug!("Reconnection no longer wanted, stopping");
                let _ = shared.event_sender.send(LiveEvent::ReconnectFailed {
                    reason: "Reconnection cancelled".to_string(),
                });
                break;
            }

            if let Some(max) = max_retries {
                if attempt > max {
                    error!("Live channel reconnection failed: max retries ({}) exceeded", max);
                    let _ = shared.event_sender.send(LiveEvent::ReconnectFailed {
                        reason: format!("Max retries ({}) exceeded", max),
                    });
                    break;
                }
            }

            shared.state.write().await.reconnect_attempts = attempt;
            info!(
                "Reconnecting to live channel (attempt {}/{})",
                attempt,
                max_retries.map_or("unlimited".to_string(), |m| m.to_string())
            );
            let _ = shared.event_sender.send(LiveEvent::Reconnecting {
                attempt,
                max_attempts: max_retries,
            });

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shared.stop_reconnect.notified() => {
                    debug!("Reconnection stopped");
                    let _ = shared.event_sender.send(LiveEvent::ReconnectFailed {
                        reason: "Reconnection cancelled".to_string(),
                    });
                    break;
                }
            }

            match shared.open(&config).await {
                Ok(pair) => {
                    shared.install(pair, &config).await;
                    info!("Reconnected to live channel");
                    let _ = shared.event_sender.send(LiveEvent::Reconnected);
                    return;
                }
                Err(e) => warn!("Reconnection attempt {} failed: {}", attempt, e),
            }
        }

        shared.state.write().await.reconnecting = false;
    })
}

/// Apply an incoming event to the shared store
async fn apply_to_store(store: &Store, event: &LiveEvent) {
    let at = Utc::now();
    let action = match event {
        LiveEvent::FoodLevel(value) => Action::SensorUpdated {
            kind: SensorKind::Food,
            value: *value,
            at,
        },
        LiveEvent::WaterLevel(value) => Action::SensorUpdated {
            kind: SensorKind::Water,
            value: *value,
            at,
        },
        LiveEvent::Temperature(value) => Action::SensorUpdated {
            kind: SensorKind::Temperature,
            value: *value,
            at,
        },
        LiveEvent::Humidity(value) => Action::SensorUpdated {
            kind: SensorKind::Humidity,
            value: *value,
            at,
        },
        LiveEvent::Notification(notification) => Action::NotificationAdded(notification.clone()),
        LiveEvent::DeviceStatus(status) => Action::DeviceStatus(status.clone()),
        _ => return,
    };
    store.dispatch(action).await;
}

/// Spawn a reader task that consumes frames until the connection drops
pub(crate) fn spawn_reader_task(
    mut reader: Box<dyn FrameReader>,
    config: LiveConfig,
    shared: SharedConnectionState,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let disconnect_reason;

        loop {
            match reader.read_frame().await {
                Ok(None) => {
                    disconnect_reason = "Connection closed by remote".to_string();
                    break;
                }
                Ok(Some(frame)) => {
                    debug!("Received live frame: {}", frame);
                    match Packet::decode(&frame) {
                        Ok(Packet::Event { name, data }) => {
                            match LiveEvent::from_event(&name, data) {
                                Ok(Some(event)) => {
                                    apply_to_store(&shared.store, &event).await;
                                    let _ = shared.event_sender.send(event);
                                }
                                Ok(None) => debug!("Ignoring unknown live event: {}", name),
                                Err(e) => warn!("Failed to parse {} event: {}", name, e),
                            }
                        }
                        Ok(Packet::Ping) => {
                            if let Some(writer) = shared.writer.lock().await.as_mut() {
                                if let Err(e) = writer.write_frame(PONG).await {
                                    warn!("Failed to answer ping: {}", e);
                                }
                            }
                        }
                        Ok(Packet::Close) | Ok(Packet::Disconnect) => {
                            disconnect_reason = "Session closed by server".to_string();
                            break;
                        }
                        Ok(other) => debug!("Ignoring live packet {:?}", other),
                        Err(e) => warn!("Failed to parse live frame: {}", e),
                    }
                }
                Err(e) => {
                    disconnect_reason = format!("Read error: {}", e);
                    break;
                }
            }
        }

        shared.state.write().await.connected = false;

        warn!("Live channel connection lost: {}", disconnect_reason);
        let _ = shared.event_sender.send(LiveEvent::ConnectionLost {
            reason: disconnect_reason,
        });

        if let Some(mut writer) = shared.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }

        if shared.should_reconnect() {
            debug!("Auto-reconnect enabled, starting reconnection task");
            shared.start_reconnect(&config).await;
        }
    })
}
