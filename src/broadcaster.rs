//! Broadcaster task
//!
//! The single consumer of the message queue. For each envelope, in
//! queue order: append it to the chat log, then write it to every
//! registered client. All writes for one envelope complete before the
//! next is dequeued. Runs until every sender is dropped and the queue is
//! drained.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat_log::ChatLog;
use crate::message::Envelope;
use crate::notifier::{deliver, drop_failed};
use crate::registry::Registry;

/// Producer side of the message queue, one clone per session
pub type EnvelopeSender = mpsc::UnboundedSender<Envelope>;

/// Consumer side of the message queue
pub type EnvelopeReceiver = mpsc::UnboundedReceiver<Envelope>;

/// Create the message queue
///
/// Unbounded: producers never wait on a slow broadcaster.
pub fn queue() -> (EnvelopeSender, EnvelopeReceiver) {
    mpsc::unbounded_channel()
}

pub struct Broadcaster {
    registry: Arc<Registry>,
    log: ChatLog,
    receiver: EnvelopeReceiver,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>, log: ChatLog, receiver: EnvelopeReceiver) -> Self {
        Self {
            registry,
            log,
            receiver,
        }
    }

    /// Run the broadcast loop
    ///
    /// Returns the log once the queue is closed and drained.
    pub async fn run(mut self) -> ChatLog {
        info!("Broadcaster started, logging to {}", self.log.path().display());

        while let Some(envelope) = self.receiver.recv().await {
            self.process(&envelope).await;
        }

        info!("Broadcaster shutting down");
        self.log
    }

    async fn process(&mut self, envelope: &Envelope) {
        if let Err(e) = self.log.append(envelope).await {
            warn!("Failed to write chat log: {}", e);
        }

        let targets = self.registry.snapshot(None);
        debug!("Broadcasting to {} clients", targets.len());

        let failed = deliver(&targets, envelope.as_str()).await;
        drop_failed(&self.registry, &failed).await;
    }
}
