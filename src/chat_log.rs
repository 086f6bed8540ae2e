//! Append-only chat log
//!
//! One file per server instance, truncated at startup. Only envelopes
//! delivered by the broadcaster are written here.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::message::Envelope;

#[derive(Debug)]
pub struct ChatLog {
    path: PathBuf,
    file: File,
}

impl ChatLog {
    /// Create (or truncate) the log file, creating parent directories
    pub async fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one envelope and flush it to the file
    pub async fn append(&mut self, envelope: &Envelope) -> std::io::Result<()> {
        self.file.write_all(envelope.as_str().as_bytes()).await?;
        self.file.flush().await
    }
}
