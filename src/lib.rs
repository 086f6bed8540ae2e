//! Multi-client TCP Chat Server Library
//!
//! A line-oriented chat relay built on tokio. Every accepted connection
//! becomes a session that picks a display name, receives prior history,
//! and then exchanges `\n`-delimited lines with every other session.
//!
//! # Features
//! - Name prompt and empty-name rejection
//! - History replay from the chat log
//! - `/change <name>` renames and `/exit`
//! - Join, rename and leave announcements
//! - Ordered, logged broadcast of chat lines
//! - Capacity ceiling at accept time
//!
//! # Architecture
//! - `Registry` is the single lock-guarded table of named sessions
//! - Each connection runs a `Session` state machine in its own task
//! - Chat lines go through an unbounded queue to one `Broadcaster` task,
//!   which logs each envelope and then fans it out
//! - Lifecycle announcements go straight out through the `Notifier`
//! - No I/O happens under the registry lock: writers snapshot targets,
//!   release, write, then drop failed clients in a second short pass
//!
//! # Example
//! ```ignore
//! use tcp_chat::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tcp_chat::AppError> {
//!     let server = ChatServer::new(ServerConfig::default()).await?;
//!     let listener = server.bind().await?;
//!     server.serve(listener).await
//! }
//! ```

pub mod broadcaster;
pub mod chat_log;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod message;
pub mod notifier;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use broadcaster::{Broadcaster, EnvelopeReceiver, EnvelopeSender};
pub use chat_log::ChatLog;
pub use client::{Client, Connection};
pub use config::ServerConfig;
pub use error::{AppError, RegistryError, SendError};
pub use message::{ClientLine, Envelope, ServerMessage};
pub use notifier::Notifier;
pub use registry::Registry;
pub use server::ChatServer;
pub use session::{handle_connection, Session, SessionContext, SessionState};
pub use types::{ClientId, Timestamp};
