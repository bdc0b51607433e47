//! In-process transport: each successful connect yields a [`RemoteEnd`] that plays
//! the server side of the socket.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::{Connection, Connector};
use crate::error::{SyncError, SyncResult};

#[derive(Default)]
struct Attempts {
    urls: Vec<String>,
    failures_remaining: usize,
}

pub struct MemoryConnector {
    attempts: Mutex<Attempts>,
    remotes_tx: mpsc::UnboundedSender<RemoteEnd>,
    remotes_rx: Mutex<mpsc::UnboundedReceiver<RemoteEnd>>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        let (remotes_tx, remotes_rx) = mpsc::unbounded_channel();
        Self {
            attempts: Mutex::new(Attempts::default()),
            remotes_tx,
            remotes_rx: Mutex::new(remotes_rx),
        }
    }

    /// Refuse the next `n` connect attempts.
    pub async fn fail_next(&self, n: usize) {
        self.attempts.lock().await.failures_remaining = n;
    }

    /// Connect attempts so far, successful or not.
    pub async fn attempts(&self) -> usize {
        self.attempts.lock().await.urls.len()
    }

    pub async fn urls(&self) -> Vec<String> {
        self.attempts.lock().await.urls.clone()
    }

    /// Wait for the next accepted connection.
    pub async fn accept(&self) -> Option<RemoteEnd> {
        self.remotes_rx.lock().await.recv().await
    }

    /// Accepted connection if one is already waiting.
    pub async fn try_accept(&self) -> Option<RemoteEnd> {
        self.remotes_rx.lock().await.try_recv().ok()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> SyncResult<Box<dyn Connection>> {
        {
            let mut attempts = self.attempts.lock().await;
            attempts.urls.push(url.to_string());
            if attempts.failures_remaining > 0 {
                attempts.failures_remaining -= 1;
                return Err(SyncError::Transport("connection refused".to_string()));
            }
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let remote = RemoteEnd {
            url: url.to_string(),
            to_client: Some(to_client),
            from_client,
        };
        self.remotes_tx
            .send(remote)
            .map_err(|_| SyncError::Transport("connector dropped".to_string()))?;

        Ok(Box::new(MemoryConnection {
            inbound,
            outbound: Some(outbound),
        }))
    }
}

/// Server side of an in-memory connection. Dropping it closes the socket abnormally.
pub struct RemoteEnd {
    pub url: String,
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl RemoteEnd {
    /// Push a frame to the client. `false` if the client is gone.
    pub fn push(&self, frame: impl Into<String>) -> bool {
        self.to_client
            .as_ref()
            .map(|tx| tx.send(frame.into()).is_ok())
            .unwrap_or(false)
    }

    pub fn push_json(&self, value: &serde_json::Value) -> bool {
        self.push(value.to_string())
    }

    /// Next frame from the client; `None` once the client closed.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Frames already sent by the client, and whether the client side has closed.
    pub fn drain(&mut self) -> (Vec<String>, bool) {
        let mut frames = Vec::new();
        loop {
            match self.from_client.try_recv() {
                Ok(frame) => frames.push(frame),
                Err(mpsc::error::TryRecvError::Empty) => return (frames, false),
                Err(mpsc::error::TryRecvError::Disconnected) => return (frames, true),
            }
        }
    }

    /// Close from the server side.
    pub fn close(&mut self) {
        self.to_client.take();
    }
}

struct MemoryConnection {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn send(&mut self, text: String) -> SyncResult<()> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| SyncError::Transport("connection closed".to_string()))?;
        outbound
            .send(text)
            .map_err(|_| SyncError::Transport("peer gone".to_string()))
    }

    async fn recv(&mut self) -> Option<SyncResult<String>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.outbound.take();
        self.inbound.close();
    }
}
