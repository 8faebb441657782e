//! Real-time channel to the backend
//!
//! One reconnecting connection carries sensor updates, notifications and
//! device status in, and control commands out.

mod client;
mod connection;
pub mod io;
pub mod protocol;

use async_trait::async_trait;

use crate::types::DeviceCommand;

pub use client::LiveClient;
pub use io::{ChannelConnector, ConnectionPair, FrameReader, FrameWriter, WebSocketConnector};
pub use protocol::LiveEvent;

/// Best-effort command sink used by dual dispatch
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait CommandChannel: Send + Sync {
    /// Try to deliver `command`; `false` means the caller should use REST
    async fn try_send(&self, command: &DeviceCommand) -> bool;
}
