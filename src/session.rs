//! Per-connection session
//!
//! Drives one client from connect to close:
//!
//! ```text
//! Connecting -> AwaitingName -> Active -> Closing -> Closed
//!                    |                                 ^
//!                    +---------- empty name -----------+
//! ```
//!
//! Chat lines become envelopes on the broadcast queue. Join, rename and
//! leave announcements go through the notifier instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::broadcaster::EnvelopeSender;
use crate::client::Connection;
use crate::error::AppError;
use crate::history;
use crate::message::{ClientLine, Envelope, ServerMessage};
use crate::notifier::Notifier;
use crate::registry::Registry;
use crate::types::{ClientId, Timestamp};

/// Protocol state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Sending banner and name prompt
    Connecting,
    /// Waiting for the display name
    AwaitingName,
    /// Registered, exchanging lines
    Active,
    /// Tearing down registration and connection
    Closing,
    /// Terminal
    Closed,
}

/// Collaborators shared by every session
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub registry: Arc<Registry>,
    pub notifier: Notifier,
    pub queue: EnvelopeSender,
    pub banner: Arc<str>,
    pub history_path: Arc<Path>,
}

impl SessionContext {
    pub fn new(
        registry: Arc<Registry>,
        queue: EnvelopeSender,
        banner: impl Into<Arc<str>>,
        history_path: impl Into<PathBuf>,
    ) -> Self {
        let history_path: PathBuf = history_path.into();
        Self {
            notifier: Notifier::new(registry.clone()),
            registry,
            queue,
            banner: banner.into(),
            history_path: Arc::from(history_path),
        }
    }
}

pub struct Session<R> {
    id: ClientId,
    reader: R,
    connection: Connection,
    ctx: SessionContext,
    state: SessionState,
    /// Current display tag, set once the name is accepted
    name: Option<String>,
    /// Captured at join, reused for every envelope
    joined_at: Option<Timestamp>,
    /// Error reported by `run` once teardown is done
    failure: Option<AppError>,
}

impl<R> Session<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, connection: Connection, ctx: SessionContext) -> Self {
        Self {
            id: connection.id(),
            reader,
            connection,
            ctx,
            state: SessionState::Connecting,
            name: None,
            joined_at: None,
            failure: None,
        }
    }

    /// Handle this session registers under
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Current protocol state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current display name, if the session got past naming
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Run the state machine until `Closed`
    ///
    /// Fails with `ChannelSend` if the broadcast queue was found closed,
    /// or `Registry` if the handle could not be registered; teardown has
    /// still run in both cases.
    pub async fn run(&mut self) -> Result<(), AppError> {
        while self.state != SessionState::Closed {
            self.state = match self.state {
                SessionState::Connecting => self.greet().await,
                SessionState::AwaitingName => self.await_name().await,
                SessionState::Active => self.step_active().await,
                SessionState::Closing => self.close().await,
                SessionState::Closed => SessionState::Closed,
            };
        }

        self.connection.close().await;

        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn greet(&mut self) -> SessionState {
        let banner = format!("{}\n", self.ctx.banner);
        let sent = match self.connection.send(&banner).await {
            Ok(()) => self.connection.send_message(&ServerMessage::NamePrompt).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => SessionState::AwaitingName,
            Err(e) => {
                debug!("Client {} unreachable before naming: {}", self.id, e);
                SessionState::Closed
            }
        }
    }

    async fn await_name(&mut self) -> SessionState {
        let name = self
            .read_line()
            .await
            .map(|line| line.trim().to_string())
            .unwrap_or_default();

        if name.is_empty() {
            info!("Client {} sent an empty name", self.id);
            let _ = self.connection.send_message(&ServerMessage::InvalidName).await;
            return SessionState::Closed;
        }

        self.joined_at = Some(Timestamp::now());
        if let Err(e) = self
            .ctx
            .registry
            .register(self.id, name.clone(), self.connection.clone())
        {
            error!("Client {} could not join: {}", self.id, e);
            self.failure = Some(e.into());
            return SessionState::Closed;
        }
        info!("Client {} joined as '{}'", self.id, name);

        // Nobody has been told about the join yet, so leave silently
        if let Err(e) = history::replay(&self.connection, &self.ctx.history_path).await {
            debug!("History replay to {} failed: {}", self.id, e);
            self.ctx.registry.unregister(self.id);
            return SessionState::Closed;
        }
        self.name = Some(name.clone());

        self.ctx
            .notifier
            .notify_except(self.id, &ServerMessage::Joined { name })
            .await;

        SessionState::Active
    }

    /// Handle one line while Active
    async fn step_active(&mut self) -> SessionState {
        let Some(raw) = self.read_line().await else {
            return SessionState::Closing;
        };

        match ClientLine::parse(&raw) {
            ClientLine::Empty => SessionState::Active,
            ClientLine::Exit => SessionState::Closing,
            ClientLine::Change(new_name) => self.change_name(new_name).await,
            ClientLine::Chat(text) => self.enqueue(&text),
        }
    }

    async fn change_name(&mut self, new_name: String) -> SessionState {
        if new_name.is_empty() {
            return match self.connection.send_message(&ServerMessage::RenameUsage).await {
                Ok(()) => SessionState::Active,
                Err(_) => SessionState::Closing,
            };
        }

        let old = match self.ctx.registry.rename(self.id, new_name.clone()) {
            Ok(old) => old,
            Err(e) => {
                // Dropped by a failed write; the close signal is on its way
                debug!("Rename for {} rejected: {}", self.id, e);
                return SessionState::Closing;
            }
        };

        info!("Client {} renamed '{}' -> '{}'", self.id, old, new_name);
        self.ctx
            .notifier
            .notify_except(
                self.id,
                &ServerMessage::Renamed {
                    old,
                    new: new_name.clone(),
                },
            )
            .await;
        self.name = Some(new_name);

        SessionState::Active
    }

    fn enqueue(&mut self, text: &str) -> SessionState {
        let (Some(joined_at), Some(name)) = (&self.joined_at, &self.name) else {
            return SessionState::Closing;
        };

        let envelope = Envelope::new(joined_at, name, text);
        if self.ctx.queue.send(envelope).is_err() {
            error!("Broadcast queue closed, dropping client {}", self.id);
            self.failure = Some(AppError::ChannelSend);
            return SessionState::Closing;
        }
        SessionState::Active
    }

    async fn close(&mut self) -> SessionState {
        // No-op when a failed write already removed us
        self.ctx.registry.unregister(self.id);

        if let Some(name) = self.name.clone() {
            self.ctx
                .notifier
                .notify_except(self.id, &ServerMessage::Left { name: name.clone() })
                .await;
            info!("Client {} ('{}') left", self.id, name);
        }

        self.connection.close().await;
        SessionState::Closed
    }

    /// Next line from the client
    ///
    /// `None` on end-of-stream, read error, or when the connection was
    /// closed from elsewhere.
    async fn read_line(&mut self) -> Option<String> {
        let mut buf = Vec::new();
        tokio::select! {
            result = self.reader.read_until(b'\n', &mut buf) => match result {
                Ok(0) => None,
                Ok(_) => Some(String::from_utf8_lossy(&buf).into_owned()),
                Err(e) => {
                    warn!("Read error from {}: {}", self.id, e);
                    None
                }
            },
            _ = self.connection.closed() => None,
        }
    }
}

/// Handle a new TCP connection
///
/// Splits the stream, wraps the write half as the client's connection
/// and runs a session over it.
pub async fn handle_connection(stream: TcpStream, ctx: SessionContext) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let (read_half, write_half) = stream.into_split();
    let connection = Connection::new(ClientId::new(), write_half);
    info!("Client {} connected from {}", connection.id(), peer_addr);

    let mut session = Session::new(BufReader::new(read_half), connection, ctx);
    let result = session.run().await;

    debug!("Client {} session ended", session.id());
    result
}
