//! I/O traits and implementations for the live channel
//!
//! This module provides trait abstractions for frame reading, frame writing
//! and connection establishment. These traits enable mockall-based testing
//! without requiring an actual network connection.
//!
//! The default implementation carries text frames over a WebSocket; the
//! socket.io handshake on top of it lives in the connection layer.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{PetCareError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection pair containing a reader and writer
pub struct ConnectionPair {
    /// Reader for receiving frames
    pub reader: Box<dyn FrameReader>,
    /// Writer for sending frames
    pub writer: Box<dyn FrameWriter>,
}

// ============================================================================
// FrameReader trait and implementations
// ============================================================================

/// Trait for reading text frames from a connection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait FrameReader: Send {
    /// Read the next text frame
    ///
    /// Returns `Ok(Some(frame))` for a frame, `Ok(None)` once the
    /// connection is closed, or an error if reading failed.
    async fn read_frame(&mut self) -> Result<Option<String>>;
}

/// WebSocket implementation of FrameReader
pub struct WebSocketFrameReader {
    stream: SplitStream<WsStream>,
}

impl WebSocketFrameReader {
    pub fn new(stream: SplitStream<WsStream>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl FrameReader for WebSocketFrameReader {
    async fn read_frame(&mut self) -> Result<Option<String>> {
        loop {
            match self.stream.next().await {
                None => return Ok(None),
                Some(Err(e)) => {
                    return Err(PetCareError::ConnectionFailed(format!(
                        "WebSocket read failed: {}",
                        e
                    )))
                }
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Close(frame))) => {
                    debug!("WebSocket closed by server: {:?}", frame);
                    return Ok(None);
                }
                // Ping/pong are answered by tungstenite; binary frames are not part of the protocol
                Some(Ok(_)) => continue,
            }
        }
    }
}

// ============================================================================
// FrameWriter trait and implementations
// ============================================================================

/// Trait for writing text frames to a connection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait FrameWriter: Send {
    /// Write one text frame
    async fn write_frame(&mut self, frame: &str) -> Result<()>;

    /// Close the connection
    async fn shutdown(&mut self) -> Result<()>;
}

/// WebSocket implementation of FrameWriter
pub struct WebSocketFrameWriter {
    sink: SplitSink<WsStream, Message>,
}

impl WebSocketFrameWriter {
    pub fn new(sink: SplitSink<WsStream, Message>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl FrameWriter for WebSocketFrameWriter {
    async fn write_frame(&mut self, frame: &str) -> Result<()> {
        self.sink
            .send(Message::text(frame.to_string()))
            .await
            .map_err(|e| PetCareError::SendError(e.to_string()))
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.sink
            .close()
            .await
            .map_err(|e| PetCareError::SendError(e.to_string()))
    }
}

// ============================================================================
// ChannelConnector trait and implementations
// ============================================================================

/// Trait for opening live channel connections
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ChannelConnector: Send + Sync {
    /// Open a transport connection to `url`
    async fn connect(&self, url: &str, timeout: Duration) -> Result<ConnectionPair>;
}

/// WebSocket implementation of ChannelConnector
#[derive(Default, Clone)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelConnector for WebSocketConnector {
    async fn connect(&self, url: &str, timeout: Duration) -> Result<ConnectionPair> {
        debug!("Connecting to {} with timeout {:?}", url, timeout);

        let request = url
            .into_client_request()
            .map_err(|e| PetCareError::ConnectionFailed(format!("Invalid URL {}: {}", url, e)))?;

        let (stream, _response) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| PetCareError::Timeout(format!("Connection to {} timed out", url)))?
            .map_err(|e| {
                PetCareError::ConnectionFailed(format!("Failed to connect to {}: {}", url, e))
            })?;

        debug!("WebSocket connection established to {}", url);

        let (sink, stream) = stream.split();
        Ok(ConnectionPair {
            reader: Box::new(WebSocketFrameReader::new(stream)),
            writer: Box::new(WebSocketFrameWriter::new(sink)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_refused_returns_connection_failed() {
        let connector = WebSocketConnector::new();
        let result = connector
            .connect(
                "ws://127.0.0.1:1/socket.io/?EIO=4&transport=websocket",
                Duration::from_secs(2),
            )
            .await;
        assert!(matches!(result, Err(PetCareError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn connect_rejects_invalid_url() {
        let connector = WebSocketConnector::default();
        let result = connector
            .connect("not a url", Duration::from_secs(1))
            .await;
        match result {
            Err(PetCareError::ConnectionFailed(msg)) => assert!(msg.contains("Invalid URL"), "{msg}"),
            Err(other) => panic!("expected ConnectionFailed, got {other:?}"),
            Ok(_) => panic!("expected an error"),
        }
    }
}
