//! Chat history replay for newly joined clients

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::client::Connection;
use crate::error::SendError;
use crate::message::ServerMessage;

/// Send every line of the history file to `connection`
///
/// A missing or unreadable file is not an error: the client gets the
/// "no history" marker instead.
pub async fn replay(connection: &Connection, path: &Path) -> Result<(), SendError> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            debug!("No history at {}: {}", path.display(), e);
            return connection.send_message(&ServerMessage::NoHistory).await;
        }
    };

    let mut lines = BufReader::new(file).lines();
    // A read error mid-file ends the replay early
    while let Ok(Some(line)) = lines.next_line().await {
        connection.send(&format!("{}\n", line)).await?;
    }
    Ok(())
}
