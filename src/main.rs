//! TCP Chat Server - Entry Point
//!
//! Parses the optional port argument, starts the server and runs the
//! accept loop.

use std::env;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tcp_chat::{AppError, ChatServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=tcp_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tcp_chat=info")),
        )
        .init();

    let config = match ServerConfig::from_args(env::args().skip(1)) {
        Ok(config) => config,
        Err(AppError::Usage) => {
            println!("{}", AppError::Usage);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let server = ChatServer::new(config).await?;
    let listener = server.bind().await.map_err(|e| {
        error!("Failed to start server: {}", e);
        e
    })?;

    info!("Chat server ready, max {} clients", server.config().max_clients);
    server.serve(listener).await?;

    Ok(())
}
