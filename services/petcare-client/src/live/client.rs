//! Live channel client

use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::LiveConfig;
use crate::error::{PetCareError, Result};
use crate::live::connection::{ConnectionState, SharedConnectionState};
use crate::live::io::{ChannelConnector, WebSocketConnector};
use crate::live::protocol::{encode_command, LiveEvent, DISCONNECT};
use crate::live::CommandChannel;
use crate::storage::TokenProvider;
use crate::store::Store;
use crate::types::DeviceCommand;

/// Single reconnecting connection to the backend's live channel
pub struct LiveClient {
    config: LiveConfig,
    shared: SharedConnectionState,
}

impl LiveClient {
    /// Create a client using WebSocket transport
    pub fn new(config: LiveConfig, store: Store) -> Self {
        Self::with_connector(config, store, Arc::new(WebSocketConnector::new()))
    }

    /// Create a client with a custom connector
    ///
    /// This is useful for testing with mock connections.
    pub fn with_connector(
        config: LiveConfig,
        store: Store,
        connector: Arc<dyn ChannelConnector>,
    ) -> Self {
        let shared = SharedConnectionState::new(config.reconnect.enabled, connector, store);
        Self { config, shared }
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Open the connection unless one is already established
    ///
    /// On failure the error is returned and, when auto-reconnect is enabled,
    /// reconnection continues in the background.
    pub async fn connect(&self, credentials: Arc<dyn TokenProvider>) -> Result<()> {
        if self.shared.is_connected().await {
            debug!("Live channel already connected");
            return Ok(());
        }

        self.shared.stop_reconnection().await;
        *self.shared.credentials.lock().await = Some(credentials);
        self.shared.session_active.store(true, Ordering::SeqCst);

        debug!("Connecting to live channel at {}", self.config.url);
        match self.shared.open(&self.config).await {
            Ok(pair) => {
                self.shared.install(pair, &self.config).await;
                info!("Live channel connected");
                let _ = self.shared.event_sender.send(LiveEvent::Connected);
                Ok(())
            }
            Err(e) => {
                error!("Live channel connection failed: {}", e);
                if self.shared.auto_reconnect_enabled.load(Ordering::SeqCst) {
                    self.shared.start_reconnect(&self.config).await;
                }
                Err(e)
            }
        }
    }

    /// Close the connection and cancel reconnection
    pub async fn disconnect(&self) {
        debug!("Disconnecting live channel");
        self.shared.session_active.store(false, Ordering::SeqCst);
        self.shared.stop_reconnection().await;

        if let Some(handle) = self.shared.reader_handle.lock().await.take() {
            handle.abort();
        }

        if let Some(mut writer) = self.shared.writer.lock().await.take() {
            if let Err(e) = writer.write_frame(DISCONNECT).await {
                debug!("Error leaving live namespace: {}", e);
            }
            if let Err(e) = writer.shutdown().await {
                debug!("Error closing live channel: {}", e);
            }
        }

        *self.shared.state.write().await = ConnectionState::default();
        *self.shared.credentials.lock().await = None;
        debug!("Live channel disconnected");
    }

    pub async fn is_connected(&self) -> bool {
        self.shared.is_connected().await
    }

    pub async fn is_reconnecting(&self) -> bool {
        self.shared.is_reconnecting().await
    }

    /// Attempt number of the current or last reconnection, zero once connected
    pub async fn reconnect_attempts(&self) -> u32 {
        self.shared.state.read().await.reconnect_attempts
    }

    /// Subscribe to live events
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.shared.event_sender.subscribe()
    }

    /// Send a command over the live channel
    pub async fn send(&self, command: &DeviceCommand) -> Result<()> {
        if !self.shared.is_connected().await {
            return Err(PetCareError::NotConnected);
        }
        let frame = encode_command(command)?;

        let mut writer = self.shared.writer.lock().await;
        let writer = writer.as_mut().ok_or(PetCareError::NotConnected)?;
        debug!("Sending live frame: {}", frame);
        writer.write_frame(&frame).await
    }

    /// Best-effort send
    ///
    /// Returns `false` when there is no open connection or the write fails;
    /// the caller is expected to fall back to REST.
    pub async fn emit(&self, command: &DeviceCommand) -> bool {
        match self.send(command).await {
            Ok(()) => true,
            Err(PetCareError::NotConnected) => {
                debug!("Live channel not connected, cannot send {}", command.event_name());
                false
            }
            Err(e) => {
                warn!("Failed to send {} over live channel: {}", command.event_name(), e);
                false
            }
        }
    }

    pub async fn dispense_food(&self, amount: u8) -> bool {
        self.emit(&DeviceCommand::DispenseFood { amount }).await
    }

    pub async fn dispense_water(&self, amount: u8) -> bool {
        self.emit(&DeviceCommand::DispenseWater { amount }).await
    }

    pub async fn set_temperature(&self, temperature: f64) -> bool {
        self.emit(&DeviceCommand::SetTemperature { temperature }).await
    }
}

#[async_trait]
impl CommandChannel for LiveClient {
    async fn try_send(&self, command: &DeviceCommand) -> bool {
        self.emit(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::io::test_support::{scripted_reader, session, CONNECTED_FRAME, OPEN_FRAME};
    use crate::live::io::{ConnectionPair, MockChannelConnector, MockFrameWriter};
    use crate::storage::MockTokenProvider;

    fn provider() -> Arc<dyn TokenProvider> {
        let mut provider = MockTokenProvider::new();
        provider
            .expect_access_token()
            .returning(|| Box::pin(async { Ok(Some("tok".to_string())) }));
        Arc::new(provider)
    }

    fn connector_once(pair: ConnectionPair) -> MockChannelConnector {
        let pair = std::sync::Mutex::new(Some(pair));
        let mut connector = MockChannelConnector::new();
        connector.expect_connect().times(1).returning(move |_, _| {
            let pair = pair.lock().unwrap().take();
            Box::pin(async move {
                pair.ok_or_else(|| PetCareError::ConnectionFailed("used".to_string()))
            })
        });
        connector
    }

    fn no_reconnect() -> LiveConfig {
        let mut config = LiveConfig::default();
        config.reconnect.enabled = false;
        config
    }

    #[tokio::test]
    async fn emit_when_disconnected_returns_false() {
        let client = LiveClient::with_connector(
            no_reconnect(),
            Store::new(),
            Arc::new(MockChannelConnector::new()),
        );
        assert!(!client.dispense_food(10).await);
        assert!(!client.set_temperature(22.0).await);
    }

    #[tokio::test]
    async fn emit_writes_event_frame_and_disconnect_leaves_namespace() {
        let (pair, sent) = session(&[]);
        let client =
            LiveClient::with_connector(no_reconnect(), Store::new(), Arc::new(connector_once(pair)));
        client.connect(provider()).await.unwrap();
        assert!(client.is_connected().await);
        assert!(client.dispense_food(30).await);

        client.disconnect().await;
        assert!(!client.is_connected().await);
        assert_eq!(
            sent.lock().unwrap().as_slice(),
            &[
                r#"40{"token":"tok"}"#.to_string(),
                r#"42["dispenseFood",{"amount":30}]"#.to_string(),
                DISCONNECT.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn emit_write_failure_returns_false() {
        let mut writer = MockFrameWriter::new();
        writer
            .expect_write_frame()
            .withf(|frame| frame.starts_with("40"))
            .returning(|_| Box::pin(async { Ok(()) }));
        writer
            .expect_write_frame()
            .returning(|_| Box::pin(async { Err(PetCareError::SendError("broken pipe".to_string())) }));
        writer
            .expect_shutdown()
            .returning(|| Box::pin(async { Ok(()) }));

        let pair = ConnectionPair {
            reader: Box::new(scripted_reader(&[Some(OPEN_FRAME), Some(CONNECTED_FRAME)])),
            writer: Box::new(writer),
        };
        let client =
            LiveClient::with_connector(no_reconnect(), Store::new(), Arc::new(connector_once(pair)));
        client.connect(provider()).await.unwrap();
        assert!(!client.dispense_water(20).await);
        client.disconnect().await;
    }

    #[tokio::test]
    async fn failed_connect_without_reconnect_returns_error() {
        let mut connector = MockChannelConnector::new();
        connector.expect_connect().times(1).returning(|_, _| {
            Box::pin(async { Err(PetCareError::Timeout("slow".to_string())) })
        });

        let client = LiveClient::with_connector(no_reconnect(), Store::new(), Arc::new(connector));
        let result = client.connect(provider()).await;
        assert!(matches!(result, Err(PetCareError::Timeout(_))));
        assert!(!client.is_connected().await);
        assert!(!client.is_reconnecting().await);
    }

    #[tokio::test]
    async fn disconnect_when_not_connected_is_safe() {
        let client = LiveClient::with_connector(
            LiveConfig::default(),
            Store::new(),
            Arc::new(MockChannelConnector::new()),
        );
        client.disconnect().await;
        client.disconnect().await;
        assert!(!client.is_connected().await);
        assert_eq!(client.reconnect_attempts().await, 0);
    }
}
