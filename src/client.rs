//! Client and connection definitions
//!
//! `Connection` is the write side of one live stream; `Client` is the
//! registry entry pairing it with a display name.

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Type-erased write half of a connection
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Write handle for one live connection
///
/// Cheap to clone: all clones share the same writer and close signal.
/// Writes from different tasks are serialized by the writer lock, so
/// lines never interleave on the wire.
#[derive(Clone)]
pub struct Connection {
    id: ClientId,
    writer: Arc<Mutex<BoxedWriter>>,
    closed: CancellationToken,
}

impl Connection {
    /// Wrap a writer under the given handle
    pub fn new<W>(id: ClientId, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            id,
            writer: Arc::new(Mutex::new(Box::new(writer))),
            closed: CancellationToken::new(),
        }
    }

    /// Handle this connection is keyed by
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Write `text` and flush
    ///
    /// A pending write is abandoned as soon as the connection is closed.
    pub async fn send(&self, text: &str) -> Result<(), SendError> {
        if self.closed.is_cancelled() {
            return Err(SendError::Closed);
        }

        let write = async {
            let mut writer = self.writer.lock().await;
            writer.write_all(text.as_bytes()).await?;
            writer.flush().await?;
            Ok::<(), SendError>(())
        };

        tokio::select! {
            result = write => result,
            _ = self.closed.cancelled() => Err(SendError::Closed),
        }
    }

    /// Send a literal server message
    pub async fn send_message(&self, msg: &ServerMessage) -> Result<(), SendError> {
        self.send(&msg.to_string()).await
    }

    /// Close the connection
    ///
    /// Idempotent. Wakes everything waiting on `closed()` and shuts the
    /// write side down so the peer sees end-of-stream.
    pub async fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }

    /// Check if `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once `close()` has been called on any clone
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Registry entry for an authenticated session
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Current display name
    pub name: String,
    /// Write side of the client's connection
    pub connection: Connection,
}

impl Client {
    /// Create an entry keyed by the connection's handle
    pub fn new(name: String, connection: Connection) -> Self {
        Self {
            id: connection.id(),
            name,
            connection,
        }
    }
}
