//! Chat server listener
//!
//! Owns the shared state, starts the broadcaster and accepts
//! connections, spawning one session task per accepted client.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::broadcaster::{self, Broadcaster};
use crate::chat_log::ChatLog;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::registry::Registry;
use crate::session::{handle_connection, SessionContext};

pub struct ChatServer {
    config: ServerConfig,
    registry: Arc<Registry>,
    ctx: SessionContext,
}

impl ChatServer {
    /// Open the chat log, load the banner and start the broadcaster
    ///
    /// Fails if the log file cannot be created. The broadcaster runs
    /// until every queue sender is gone.
    pub async fn new(config: ServerConfig) -> Result<Self, AppError> {
        let log_path = config.log_path();
        let log = ChatLog::create(&log_path).await.map_err(|e| {
            error!("Failed to open chat log {}: {}", log_path.display(), e);
            e
        })?;

        let banner = match tokio::fs::read_to_string(&config.banner_path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("No banner at {}: {}", config.banner_path.display(), e);
                String::new()
            }
        };

        let registry = Arc::new(Registry::new());
        let (queue_tx, queue_rx) = broadcaster::queue();
        tokio::spawn(Broadcaster::new(registry.clone(), log, queue_rx).run());

        let ctx = SessionContext::new(registry.clone(), queue_tx, banner, log_path);

        Ok(Self {
            config,
            registry,
            ctx,
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener, AppError> {
        let addr = self.config.bind_address();
        let listener = TcpListener::bind(&addr).await?;
        info!("Listening on the port {}", self.config.port);
        Ok(listener)
    }

    /// Connection accept loop
    ///
    /// Never returns on its own; per-accept errors are logged and
    /// skipped.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), AppError> {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    self.admit(stream).await;
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Start a session, or turn the connection away when full
    ///
    /// The capacity check races with concurrent joins; the ceiling is
    /// best-effort.
    async fn admit(&self, mut stream: TcpStream) {
        let size = self.registry.size();
        if size >= self.config.max_clients {
            info!("Chatroom full ({} clients), rejecting connection", size);
            let msg = ServerMessage::ChatroomFull.to_string();
            let _ = stream.write_all(msg.as_bytes()).await;
            let _ = stream.shutdown().await;
            return;
        }

        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, ctx).await {
                error!("Connection handler error: {}", e);
            }
        });
    }
}
