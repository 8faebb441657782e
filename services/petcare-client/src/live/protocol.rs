//! Live channel packets and events
//!
//! The backend runs a socket.io server. Each WebSocket text frame carries one
//! Engine.IO packet whose first character is the packet type; message packets
//! (`4`) wrap a socket.io packet on the default namespace:
//!
//! | frame | meaning |
//! |-------|---------|
//! | `0{"sid":..,"pingInterval":..}` | Engine.IO open |
//! | `1` | Engine.IO close |
//! | `2` / `3` | ping / pong |
//! | `40{"token":..}` | socket.io CONNECT, `auth` payload from the client |
//! | `40{"sid":..}` | CONNECT acknowledged |
//! | `41` | socket.io DISCONNECT |
//! | `42["name",{..}]` | event |
//! | `44{"message":..}` | CONNECT refused |

use serde::{Deserialize, Serialize};

use crate::error::{PetCareError, Result};
use crate::types::{DeviceCommand, Notification};

/// Engine.IO protocol revision spoken by the client
pub const ENGINE_IO_VERSION: &str = "4";

/// Pong frame sent in reply to a server ping
pub const PONG: &str = "3";

/// socket.io DISCONNECT frame for the default namespace
pub const DISCONNECT: &str = "41";

/// Payload of the Engine.IO open packet
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// `auth` payload of the socket.io CONNECT packet
#[derive(Debug, Serialize)]
struct ConnectAuth<'a> {
    token: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct ConnectErrorPayload {
    #[serde(default)]
    message: Option<String>,
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Connected,
    Disconnect,
    Event {
        name: String,
        data: serde_json::Value,
    },
    ConnectError(String),
    /// Packet types the client has no use for (upgrade, noop, acks, binary)
    Ignored,
}

impl Packet {
    /// Decode one text frame
    pub fn decode(text: &str) -> Result<Packet> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| protocol_error("empty frame"))?;
        let rest = chars.as_str();
        match kind {
            '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '4' => decode_socket_packet(rest),
            '5' | '6' => Ok(Packet::Ignored),
            other => Err(protocol_error(&format!("unknown packet type '{}'", other))),
        }
    }
}

fn protocol_error(detail: &str) -> PetCareError {
    PetCareError::ConnectionFailed(format!("Invalid socket.io packet: {}", detail))
}

fn decode_socket_packet(text: &str) -> Result<Packet> {
    let mut chars = text.chars();
    let kind = chars
        .next()
        .ok_or_else(|| protocol_error("empty message"))?;
    let rest = chars.as_str();
    if rest.starts_with('/') {
        // Only the default namespace is used
        return Ok(Packet::Ignored);
    }
    match kind {
        '0' => Ok(Packet::Connected),
        '1' => Ok(Packet::Disconnect),
        '2' => {
            // Optional ack id precedes the argument array
            let args = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let mut values: Vec<serde_json::Value> = serde_json::from_str(args)?;
            if values.is_empty() {
                return Err(protocol_error("event without a name"));
            }
            let name = match values.remove(0) {
                serde_json::Value::String(name) => name,
                other => return Err(protocol_error(&format!("event name {}", other))),
            };
            let data = values.into_iter().next().unwrap_or(serde_json::Value::Null);
            Ok(Packet::Event { name, data })
        }
        '4' => {
            let payload: ConnectErrorPayload = if rest.is_empty() {
                ConnectErrorPayload::default()
            } else {
                serde_json::from_str(rest)?
            };
            Ok(Packet::ConnectError(
                payload
                    .message
                    .unwrap_or_else(|| "connection refused".to_string()),
            ))
        }
        _ => Ok(Packet::Ignored),
    }
}

/// socket.io CONNECT frame carrying the bearer token as `auth.token`
pub fn encode_connect(token: Option<&str>) -> Result<String> {
    Ok(format!(
        "40{}",
        serde_json::to_string(&ConnectAuth { token })?
    ))
}

/// Event frame for `name` with a single argument
pub fn encode_event(name: &str, data: &serde_json::Value) -> Result<String> {
    Ok(format!("42{}", serde_json::to_string(&(name, data))?))
}

/// Encode a control command as an outgoing event frame
pub fn encode_command(command: &DeviceCommand) -> Result<String> {
    encode_event(command.event_name(), &command.payload())
}

/// WebSocket endpoint of the socket.io server at `base`
///
/// `http(s)` becomes `ws(s)`. A bare host gets the default `/socket.io/`
/// path; an explicit path is kept.
pub fn socket_url(base: &str) -> Result<String> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| PetCareError::Config(format!("Invalid live channel URL {}: {}", base, e)))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(PetCareError::Config(format!(
                "Unsupported live channel scheme: {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| PetCareError::Config(format!("Cannot use {} with {}", scheme, base)))?;
    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/socket.io/");
    }
    url.query_pairs_mut()
        .append_pair("EIO", ENGINE_IO_VERSION)
        .append_pair("transport", "websocket");
    Ok(url.to_string())
}

#[derive(Debug, Deserialize)]
struct LevelPayload {
    level: f64,
}

#[derive(Debug, Deserialize)]
struct TemperaturePayload {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct HumidityPayload {
    humidity: f64,
}

/// Events delivered to subscribers of the live channel
///
/// The first six variants come from the backend; the rest describe the
/// connection itself.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    FoodLevel(f64),
    WaterLevel(f64),
    Temperature(f64),
    Humidity(f64),
    Notification(Notification),
    DeviceStatus(serde_json::Value),

    /// Connection established
    Connected,
    /// Connection dropped
    ConnectionLost { reason: String },
    /// A reconnection attempt is starting
    Reconnecting {
        attempt: u32,
        max_attempts: Option<u32>,
    },
    /// Reconnection succeeded
    Reconnected,
    /// Reconnection gave up
    ReconnectFailed { reason: String },
}

impl LiveEvent {
    /// Decode a backend event; unknown names yield `Ok(None)`
    pub fn from_event(name: &str, data: serde_json::Value) -> Result<Option<LiveEvent>> {
        let event = match name {
            "foodLevelUpdate" => {
                LiveEvent::FoodLevel(serde_json::from_value::<LevelPayload>(data)?.level)
            }
            "waterLevelUpdate" => {
                LiveEvent::WaterLevel(serde_json::from_value::<LevelPayload>(data)?.level)
            }
            "temperatureUpdate" => LiveEvent::Temperature(
                serde_json::from_value::<TemperaturePayload>(data)?.temperature,
            ),
            "humidityUpdate" => {
                LiveEvent::Humidity(serde_json::from_value::<HumidityPayload>(data)?.humidity)
            }
            "notification" => LiveEvent::Notification(serde_json::from_value(data)?),
            "deviceStatus" => LiveEvent::DeviceStatus(data),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
