//! Lifecycle announcements
//!
//! Direct, unlogged "send to everyone except one" path used for join,
//! rename and leave messages. Bypasses the broadcast queue and the log.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::client::Connection;
use crate::message::ServerMessage;
use crate::registry::Registry;
use crate::types::ClientId;

#[derive(Debug, Clone)]
pub struct Notifier {
    registry: Arc<Registry>,
}

impl Notifier {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Write `message` to every registered client except `excluded`
    ///
    /// Clients whose write fails are removed from the registry and
    /// closed, the same way the broadcaster treats them.
    pub async fn notify_except(&self, excluded: ClientId, message: &ServerMessage) {
        let targets = self.registry.snapshot(Some(excluded));
        let text = message.to_string();
        debug!("Notifying {} clients: {}", targets.len(), text.trim_end());

        let failed = deliver(&targets, &text).await;
        drop_failed(&self.registry, &failed).await;
    }
}

/// Write `text` to all targets concurrently, returning the handles that failed
pub(crate) async fn deliver(targets: &[(ClientId, Connection)], text: &str) -> Vec<ClientId> {
    let results = join_all(targets.iter().map(|(id, conn)| async move {
        match conn.send(text).await {
            Ok(()) => None,
            Err(e) => {
                debug!("Write to {} failed: {}", id, e);
                Some(*id)
            }
        }
    }))
    .await;

    results.into_iter().flatten().collect()
}

/// Remove failed handles in one short locked pass, then close them
///
/// Closing wakes each owning session, which announces the departure.
pub(crate) async fn drop_failed(registry: &Registry, failed: &[ClientId]) {
    for client in registry.remove_failed(failed) {
        warn!("Dropping client {} ({}) after write failure", client.id, client.name);
        client.connection.close().await;
    }
}
