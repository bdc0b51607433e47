//! Socket abstraction used by the connection manager.
//!
//! [`ws::WsConnector`] speaks real WebSocket; [`memory::MemoryConnector`] is an
//! in-process pair used to drive reconnect, heartbeat and cleanup without a network.

pub mod memory;
pub mod ws;

use async_trait::async_trait;

use crate::error::SyncResult;

pub use memory::{MemoryConnector, RemoteEnd};
pub use ws::WsConnector;

/// Opens connections to a URL.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> SyncResult<Box<dyn Connection>>;
}

/// One open text-frame connection.
#[async_trait]
pub trait Connection: Send {
    async fn send(&mut self, text: String) -> SyncResult<()>;

    /// Next text frame; `None` once the peer has closed. Cancel-safe.
    async fn recv(&mut self) -> Option<SyncResult<String>>;

    async fn close(&mut self);
}
