//! Error types for the chat server
//!
//! Defines application-level errors, registry errors and connection send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::ClientId;

/// Application-level errors
///
/// Covers process-level failures (bind, log file) and the
/// command-line surface.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal at startup)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Message queue closed (broadcaster gone)
    #[error("Channel send error")]
    ChannelSend,

    /// Registry operation rejected
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Too many command-line arguments
    #[error("[USAGE]: ./TCPChat $port")]
    Usage,

    /// Port argument is not a valid port number
    #[error("Invalid port: {0}")]
    InvalidPort(String),
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Handle already has an entry
    #[error("Client {0} is already registered")]
    AlreadyRegistered(ClientId),

    /// Handle has no entry
    #[error("Client {0} is not registered")]
    NotRegistered(ClientId),
}

/// Message send errors
///
/// Occurs when writing to a connection that is closed or broken.
#[derive(Debug, Error)]
pub enum SendError {
    /// The connection was closed locally
    #[error("Connection closed")]
    Closed,

    /// Writing to the peer failed
    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),
}
