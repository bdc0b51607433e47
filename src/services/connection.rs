//! Channel connections: one session task per open channel owns its socket,
//! heartbeat interval and reconnect timer. The caller holds a [`ChannelHandle`];
//! closing or dropping it ends the task.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::auth::AuthToken;
use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::models::{Channel, ChannelStatus, ConnectionState, OutboundFrame};
use crate::services::dispatcher::Dispatcher;
use crate::transport::{Connection, Connector};

enum Command {
    Send {
        text: String,
        reply: oneshot::Sender<SyncResult<()>>,
    },
    Close,
}

/// Opens channels. Holds no per-channel state; every channel belongs to its handle.
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    dispatcher: Dispatcher,
    ws_base_url: String,
    auth_token: Option<AuthToken>,
    reconnect_delay: Duration,
    heartbeat_interval: Duration,
}

impl ConnectionManager {
    pub fn new(config: &Config, connector: Arc<dyn Connector>, dispatcher: Dispatcher) -> Self {
        Self {
            connector,
            dispatcher,
            ws_base_url: config.ws_base_url.clone(),
            auth_token: config.auth_token.clone(),
            reconnect_delay: config.reconnect_delay,
            heartbeat_interval: config.heartbeat_interval,
        }
    }

    /// Login / logout. Already open channels keep the token they were opened with.
    pub fn set_auth_token(&mut self, token: Option<AuthToken>) {
        self.auth_token = token;
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Start a session for `channel`. Without a usable auth token, or for a
    /// malformed channel, nothing is attempted and `None` is returned.
    #[instrument(skip(self, channel), fields(channel = %channel))]
    pub fn open(&self, channel: Channel) -> Option<ChannelHandle> {
        match self.try_open(channel) {
            Ok(handle) => Some(handle),
            Err(SyncError::Unauthenticated) => {
                debug!("no usable auth token; channel not opened");
                None
            }
            Err(e) => {
                warn!(error = %e, "channel not opened");
                None
            }
        }
    }

    /// Like [`Self::open`], reporting why no session was started.
    pub fn try_open(&self, channel: Channel) -> SyncResult<ChannelHandle> {
        channel.validate()?;
        let token = match &self.auth_token {
            Some(token) if token.is_usable() => token,
            Some(_) => {
                info!(channel = %channel, "auth token expired");
                return Err(SyncError::Unauthenticated);
            }
            None => return Err(SyncError::Unauthenticated),
        };

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ChannelStatus::default());
        let session = Session {
            url: channel.url(&self.ws_base_url, token),
            channel: channel.clone(),
            connector: self.connector.clone(),
            dispatcher: self.dispatcher.clone(),
            reconnect_delay: self.reconnect_delay,
            heartbeat_interval: self.heartbeat_interval,
            status: status_tx,
            commands: commands_rx,
        };
        let task = tokio::spawn(session.run());

        Ok(ChannelHandle {
            channel,
            commands: commands_tx,
            status: status_rx,
            task: Some(task),
        })
    }
}

/// Exclusive owner of one open channel.
pub struct ChannelHandle {
    channel: Channel,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ChannelStatus>,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    pub fn status(&self) -> ChannelStatus {
        self.status.borrow().clone()
    }

    /// Presence updates for the UI.
    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }

    /// Resolves once connected, or `false` if the session ended first.
    pub async fn wait_connected(&self) -> bool {
        let mut status = self.status.clone();
        let connected = status.wait_for(|s| s.is_connected()).await.is_ok();
        connected
    }

    /// Send a frame on the live socket. Frames are not queued while disconnected.
    pub async fn send(&self, frame: &OutboundFrame) -> SyncResult<()> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected(self.channel.to_string()));
        }
        let text = frame.to_json()?;
        let (reply, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Send { text, reply })
            .map_err(|_| SyncError::NotConnected(self.channel.to_string()))?;
        reply_rx
            .await
            .map_err(|_| SyncError::NotConnected(self.channel.to_string()))?
    }

    /// Close the socket, cancel heartbeat and any pending reconnect, and wait for
    /// the session to finish.
    pub async fn close(mut self) {
        let _ = self.commands.send(Command::Close);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(channel = %self.channel, error = %e, "session task failed");
            }
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Close);
    }
}

enum Exit {
    Dropped,
    Shutdown,
}

struct Session {
    channel: Channel,
    url: String,
    connector: Arc<dyn Connector>,
    dispatcher: Dispatcher,
    reconnect_delay: Duration,
    heartbeat_interval: Duration,
    status: watch::Sender<ChannelStatus>,
    commands: mpsc::UnboundedReceiver<Command>,
}

fn reject(reply: oneshot::Sender<SyncResult<()>>, channel: &Channel) {
    let _ = reply.send(Err(SyncError::NotConnected(channel.to_string())));
}

impl Session {
    async fn run(mut self) {
        let mut reconnects: u32 = 0;
        loop {
            self.status.send_modify(|s| {
                s.state = ConnectionState::Connecting;
                s.reconnect_pending = false;
            });

            let exit = match self.connect().await {
                None => Exit::Shutdown,
                Some(Ok(conn)) => {
                    info!(channel = %self.channel, "channel connected");
                    self.status
                        .send_modify(|s| s.state = ConnectionState::Connected);
                    self.run_connected(conn).await
                }
                Some(Err(e)) => {
                    warn!(channel = %self.channel, error = %e, "connect failed");
                    Exit::Dropped
                }
            };
            self.status
                .send_modify(|s| s.state = ConnectionState::Disconnected);
            if let Exit::Shutdown = exit {
                break;
            }

            reconnects += 1;
            self.status.send_modify(|s| {
                s.reconnect_pending = true;
                s.reconnect_attempts = reconnects;
            });
            info!(
                channel = %self.channel,
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "reconnect scheduled"
            );
            if !self.wait_reconnect().await {
                break;
            }
        }

        self.status.send_modify(|s| {
            s.state = ConnectionState::Disconnected;
            s.reconnect_pending = false;
        });
        info!(channel = %self.channel, "channel closed");
    }

    /// `None` when the owner closed while connecting.
    async fn connect(&mut self) -> Option<SyncResult<Box<dyn Connection>>> {
        let connect = self.connector.connect(&self.url);
        tokio::pin!(connect);
        loop {
            tokio::select! {
                result = &mut connect => return Some(result),
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Send { reply, .. }) => reject(reply, &self.channel),
                    Some(Command::Close) | None => return None,
                },
            }
        }
    }

    async fn run_connected(&mut self, mut conn: Box<dyn Connection>) -> Exit {
        let period = self.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                frame = conn.recv() => match frame {
                    Some(Ok(text)) => {
                        self.dispatcher.dispatch(&self.channel, &text).await;
                    }
                    Some(Err(e)) => {
                        warn!(channel = %self.channel, error = %e, "socket error");
                        return Exit::Dropped;
                    }
                    None => {
                        info!(channel = %self.channel, "socket closed by peer");
                        return Exit::Dropped;
                    }
                },
                _ = heartbeat.tick() => {
                    let now = Utc::now();
                    let sent = match OutboundFrame::heartbeat_at(now).to_json() {
                        Ok(text) => conn.send(text).await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = sent {
                        warn!(channel = %self.channel, error = %e, "heartbeat failed");
                        return Exit::Dropped;
                    }
                    self.status.send_modify(|s| s.last_heartbeat = Some(now));
                },
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Send { text, reply }) => {
                        let result = conn.send(text).await;
                        let failed = result.is_err();
                        let _ = reply.send(result);
                        if failed {
                            warn!(channel = %self.channel, "send failed; dropping connection");
                            return Exit::Dropped;
                        }
                    }
                    Some(Command::Close) | None => {
                        conn.close().await;
                        return Exit::Shutdown;
                    }
                },
            }
        }
    }

    /// Wait out the reconnect delay. `false` if the owner closed meanwhile.
    async fn wait_reconnect(&mut self) -> bool {
        let sleep = tokio::time::sleep(self.reconnect_delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Send { reply, .. }) => reject(reply, &self.channel),
                    Some(Command::Close) | None => return false,
                },
            }
        }
    }
}
