//! Live channel tests using hand-written mock connections
//!
//! The mocks implement the connection traits directly so connection,
//! reconnection and frame handling can be exercised without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use petcare_client::config::LiveConfig;
use petcare_client::live::io::{ChannelConnector, ConnectionPair, FrameReader, FrameWriter};
use petcare_client::storage::{KeyValueStore, MemoryStore, TokenProvider, TokenStore};
use petcare_client::types::Severity;
use petcare_client::{LiveClient, LiveEvent, PetCareError, Store};
use tokio::sync::broadcast;

// ============================================================================
// Mock implementations
// ============================================================================

/// Replays frames; `None` closes the connection, running out keeps it open
struct ScriptedReader {
    frames: VecDeque<Option<String>>,
}

#[async_trait]
impl FrameReader for ScriptedReader {
    async fn read_frame(&mut self) -> petcare_client::Result<Option<String>> {
        match self.frames.pop_front() {
            Some(frame) => Ok(frame),
            None => std::future::pending().await,
        }
    }
}

struct RecordingWriter {
    sent: Arc<StdMutex<Vec<String>>>,
}

#[async_trait]
impl FrameWriter for RecordingWriter {
    async fn write_frame(&mut self, frame: &str) -> petcare_client::Result<()> {
        self.sent.lock().unwrap().push(frame.to_string());
        Ok(())
    }

    async fn shutdown(&mut self) -> petcare_client::Result<()> {
        Ok(())
    }
}

type MockPair = (Vec<Option<String>>, Arc<StdMutex<Vec<String>>>);

const OPEN: &str = r#"0{"sid":"mock","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;
const JOINED: &str = r#"40{"sid":"ns-mock"}"#;

/// Frames of a session that completes the handshake before `events`
fn joined(events: &[&str]) -> Vec<Option<String>> {
    [OPEN, JOINED]
        .iter()
        .chain(events.iter())
        .map(|frame| Some(frame.to_string()))
        .collect()
}

struct MockConnector {
    pairs: StdMutex<VecDeque<MockPair>>,
    connect_count: StdMutex<u32>,
    urls: StdMutex<Vec<String>>,
    fail_connect: StdMutex<bool>,
}

impl MockConnector {
    fn new() -> Self {
        Self {
            pairs: StdMutex::new(VecDeque::new()),
            connect_count: StdMutex::new(0),
            urls: StdMutex::new(Vec::new()),
            fail_connect: StdMutex::new(false),
        }
    }

    fn add_connection(&self, frames: Vec<Option<String>>) -> Arc<StdMutex<Vec<String>>> {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        self.pairs
            .lock()
            .unwrap()
            .push_back((frames, sent.clone()));
        sent
    }

    fn set_fail_connect(&self, fail: bool) {
        *self.fail_connect.lock().unwrap() = fail;
    }

    fn connect_count(&self) -> u32 {
        *self.connect_count.lock().unwrap()
    }
}

#[async_trait]
impl ChannelConnector for MockConnector {
    async fn connect(
        &self,
        url: &str,
        _timeout: Duration,
    ) -> petcare_client::Result<ConnectionPair> {
        *self.connect_count.lock().unwrap() += 1;
        self.urls.lock().unwrap().push(url.to_string());

        if *self.fail_connect.lock().unwrap() {
            return Err(PetCareError::ConnectionFailed(
                "Mock connection failure".to_string(),
            ));
        }

        match self.pairs.lock().unwrap().pop_front() {
            Some((frames, sent)) => Ok(ConnectionPair {
                reader: Box::new(ScriptedReader {
                    frames: frames.into_iter().collect(),
                }),
                writer: Box::new(RecordingWriter { sent }),
            }),
            None => Err(PetCareError::ConnectionFailed(
                "No mock connections available".to_string(),
            )),
        }
    }
}

async fn credentials(token: &str) -> Arc<dyn TokenProvider> {
    let kv = Arc::new(MemoryStore::new());
    kv.set("userToken", token).await.unwrap();
    Arc::new(TokenStore::new(kv))
}

fn config(interval_seconds: u64, max_retries: Option<u32>) -> LiveConfig {
    let mut config = LiveConfig {
        url: "ws://mock/live".to_string(),
        connection_timeout_seconds: 1,
        ..Default::default()
    };
    config.reconnect.interval_seconds = interval_seconds;
    config.reconnect.max_retries = max_retries;
    config
}

async fn wait_for<F>(receiver: &mut broadcast::Receiver<LiveEvent>, mut matches: F) -> LiveEvent
where
    F: FnMut(&LiveEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = receiver.recv().await.unwrap();
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for live event")
}

// ============================================================================
// Connection lifecycle
// ============================================================================

#[tokio::test]
async fn test_initial_state() {
    let client = LiveClient::with_connector(config(0, Some(5)), Store::new(), Arc::new(MockConnector::new()));
    assert!(!client.is_connected().await);
    assert!(!client.is_reconnecting().await);
    assert_eq!(client.reconnect_attempts().await, 0);
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let connector = Arc::new(MockConnector::new());
    connector.add_connection(joined(&[]));
    connector.add_connection(joined(&[]));

    let client = LiveClient::with_connector(config(0, Some(5)), Store::new(), connector.clone());
    client.connect(credentials("tok").await).await.unwrap();
    client.connect(credentials("tok").await).await.unwrap();

    assert!(client.is_connected().await);
    assert_eq!(connector.connect_count(), 1);
    client.disconnect().await;
}

#[tokio::test]
async fn test_connect_joins_namespace_with_stored_token() {
    let connector = Arc::new(MockConnector::new());
    let sent = connector.add_connection(joined(&[]));

    let client = LiveClient::with_connector(config(0, Some(5)), Store::new(), connector.clone());
    client.connect(credentials("secret-token").await).await.unwrap();

    assert_eq!(
        connector.urls.lock().unwrap().as_slice(),
        &["ws://mock/live?EIO=4&transport=websocket".to_string()]
    );
    assert_eq!(
        sent.lock().unwrap().first().map(String::as_str),
        Some(r#"40{"token":"secret-token"}"#)
    );
    client.disconnect().await;
    assert_eq!(sent.lock().unwrap().last().map(String::as_str), Some("41"));
}

#[tokio::test]
async fn test_refused_namespace_fails_connect() {
    let connector = Arc::new(MockConnector::new());
    connector.add_connection(vec![
        Some(OPEN.to_string()),
        Some(r#"44{"message":"Authentication error"}"#.to_string()),
    ]);

    let mut live = config(0, Some(5));
    live.reconnect.enabled = false;
    let client = LiveClient::with_connector(live, Store::new(), connector);
    let err = client.connect(credentials("expired").await).await.unwrap_err();

    assert!(err.to_string().contains("Authentication error"));
    assert!(!client.is_connected().await);
}

#[tokio::test]
async fn test_disconnect_then_reconnect_manually() {
    let connector = Arc::new(MockConnector::new());
    connector.add_connection(joined(&[]));
    connector.add_connection(joined(&[]));

    let client = LiveClient::with_connector(config(0, Some(5)), Store::new(), connector.clone());
    client.connect(credentials("tok").await).await.unwrap();
    client.disconnect().await;
    assert!(!client.is_connected().await);

    client.connect(credentials("tok").await).await.unwrap();
    assert!(client.is_connected().await);
    assert_eq!(connector.connect_count(), 2);
    client.disconnect().await;
}

// ============================================================================
// Incoming events
// ============================================================================

#[tokio::test]
async fn test_events_are_written_to_store() {
    let connector = Arc::new(MockConnector::new());
    connector.add_connection(joined(&[
        r#"42["foodLevelUpdate",{"level":18}]"#,
        r#"42["temperatureUpdate",{"temperature":27.5}]"#,
        r#"42["somethingElse",{}]"#,
        r#"42["notification",{"_id":"n1","title":"Low food","message":"Food at 18%","type":"warning","read":false,"timestamp":"2024-05-01T10:00:00Z"}]"#,
        r#"42["deviceStatus",{"online":true}]"#,
    ]));

    let store = Store::new();
    let client = LiveClient::with_connector(config(0, Some(5)), store.clone(), connector);
    let mut events = client.subscribe();
    client.connect(credentials("tok").await).await.unwrap();

    wait_for(&mut events, |e| matches!(e, LiveEvent::DeviceStatus(_))).await;

    let state = store.snapshot().await;
    assert_eq!(state.sensors.reading.food_level, 18.0);
    assert_eq!(state.sensors.reading.temperature, 27.5);
    assert!(state.sensors.reading.last_updated.is_some());
    assert_eq!(state.notifications.notifications.len(), 1);
    assert_eq!(state.notifications.notifications[0].severity, Severity::Warning);
    assert_eq!(
        state.device.status,
        Some(serde_json::json!({"online": true}))
    );
    client.disconnect().await;
}

#[tokio::test]
async fn test_server_ping_is_answered() {
    let connector = Arc::new(MockConnector::new());
    let sent = connector.add_connection(joined(&["2", r#"42["humidityUpdate",{"humidity":40}]"#]));

    let client = LiveClient::with_connector(config(0, Some(5)), Store::new(), connector);
    let mut events = client.subscribe();
    client.connect(credentials("tok").await).await.unwrap();

    wait_for(&mut events, |e| matches!(e, LiveEvent::Humidity(_))).await;
    assert!(sent.lock().unwrap().iter().any(|frame| frame == "3"));
    assert!(client.is_connected().await);
    client.disconnect().await;
}

// ============================================================================
// Outgoing commands
// ============================================================================

#[tokio::test]
async fn test_emit_sends_frame_when_connected() {
    let connector = Arc::new(MockConnector::new());
    let sent = connector.add_connection(joined(&[]));

    let client = LiveClient::with_connector(config(0, Some(5)), Store::new(), connector);
    client.connect(credentials("tok").await).await.unwrap();

    assert!(client.dispense_food(35).await);
    assert!(client.set_temperature(21.0).await);

    let sent = sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[1], r#"42["dispenseFood",{"amount":35}]"#);
    assert!(sent[2].starts_with(r#"42["setTemperature","#));
    client.disconnect().await;
}

#[tokio::test]
async fn test_emit_returns_false_when_disconnected() {
    let client = LiveClient::with_connector(config(0, Some(5)), Store::new(), Arc::new(MockConnector::new()));
    assert!(!client.dispense_water(10).await);
}

// ============================================================================
// Reconnection
// ============================================================================

#[tokio::test]
async fn test_reconnection_stops_at_cap() {
    let connector = Arc::new(MockConnector::new());
    connector.set_fail_connect(true);

    let client = LiveClient::with_connector(config(0, Some(3)), Store::new(), connector.clone());
    let mut events = client.subscribe();

    assert!(client.connect(credentials("tok").await).await.is_err());
    wait_for(&mut events, |e| matches!(e, LiveEvent::ReconnectFailed { .. })).await;

    // One initial attempt plus three retries
    assert_eq!(connector.connect_count(), 4);
    assert!(!client.is_connected().await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(connector.connect_count(), 4);
    assert!(!client.is_reconnecting().await);
}

#[tokio::test]
async fn test_reconnects_after_connection_loss() {
    let connector = Arc::new(MockConnector::new());
    let mut dropped = joined(&[]);
    dropped.push(None);
    connector.add_connection(dropped);
    connector.add_connection(joined(&[]));

    let client = LiveClient::with_connector(config(0, Some(5)), Store::new(), connector.clone());
    let mut events = client.subscribe();
    client.connect(credentials("tok").await).await.unwrap();

    wait_for(&mut events, |e| matches!(e, LiveEvent::ConnectionLost { .. })).await;
    wait_for(&mut events, |e| matches!(e, LiveEvent::Reconnected)).await;

    assert!(client.is_connected().await);
    assert_eq!(client.reconnect_attempts().await, 0);
    assert_eq!(connector.connect_count(), 2);
    client.disconnect().await;
}

#[tokio::test]
async fn test_no_reconnect_when_disabled() {
    let connector = Arc::new(MockConnector::new());
    connector.add_connection(joined(&["41"]));

    let mut live = config(0, Some(5));
    live.reconnect.enabled = false;
    let client = LiveClient::with_connector(live, Store::new(), connector.clone());
    let mut events = client.subscribe();
    client.connect(credentials("tok").await).await.unwrap();

    wait_for(&mut events, |e| matches!(e, LiveEvent::ConnectionLost { .. })).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!client.is_connected().await);
    assert_eq!(connector.connect_count(), 1);
}

#[tokio::test]
async fn test_disconnect_cancels_reconnection() {
    let connector = Arc::new(MockConnector::new());
    connector.set_fail_connect(true);

    let client = LiveClient::with_connector(config(1, None), Store::new(), connector.clone());
    assert!(client.connect(credentials("tok").await).await.is_err());

    client.disconnect().await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(connector.connect_count(), 1);
    assert!(!client.is_reconnecting().await);
}
