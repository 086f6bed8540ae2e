//! Client registry
//!
//! The shared table of live, named sessions: `ClientId -> Client`.
//! Guarded by a single lock whose critical sections are pure map
//! operations; no I/O is ever performed while it is held. Callers that
//! need to write to members take a `snapshot` and write after release.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::client::{Client, Connection};
use crate::error::RegistryError;
use crate::types::ClientId;

#[derive(Debug, Default)]
pub struct Registry {
    clients: Mutex<HashMap<ClientId, Client>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry
    ///
    /// The entry is visible to the broadcaster and notifier as soon as
    /// this returns.
    pub fn register(
        &self,
        id: ClientId,
        name: String,
        connection: Connection,
    ) -> Result<(), RegistryError> {
        let mut clients = self.clients.lock();
        if clients.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        clients.insert(id, Client::new(name, connection));
        debug!("Registered {}, total clients: {}", id, clients.len());
        Ok(())
    }

    /// Remove an entry, returning it if it was present
    pub fn unregister(&self, id: ClientId) -> Option<Client> {
        let mut clients = self.clients.lock();
        let removed = clients.remove(&id);
        if removed.is_some() {
            debug!("Unregistered {}, total clients: {}", id, clients.len());
        }
        removed
    }

    /// Replace the display name, returning the previous one
    pub fn rename(&self, id: ClientId, new_name: String) -> Result<String, RegistryError> {
        let mut clients = self.clients.lock();
        let client = clients
            .get_mut(&id)
            .ok_or(RegistryError::NotRegistered(id))?;
        Ok(std::mem::replace(&mut client.name, new_name))
    }

    /// Current entry count
    ///
    /// A snapshot: concurrent registrations may change it immediately.
    pub fn size(&self) -> usize {
        self.clients.lock().len()
    }

    /// Check if a handle has an entry
    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.lock().contains_key(&id)
    }

    /// Display name currently registered for a handle
    pub fn name_of(&self, id: ClientId) -> Option<String> {
        self.clients.lock().get(&id).map(|c| c.name.clone())
    }

    /// Visit every entry while holding the lock
    ///
    /// `f` must not touch the registry (the lock is not reentrant) and
    /// must not block.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&ClientId, &str),
    {
        let clients = self.clients.lock();
        for (id, client) in clients.iter() {
            f(id, &client.name);
        }
    }

    /// Copy out the write targets, optionally skipping one handle
    pub fn snapshot(&self, except: Option<ClientId>) -> Vec<(ClientId, Connection)> {
        let clients = self.clients.lock();
        clients
            .iter()
            .filter(|(id, _)| Some(**id) != except)
            .map(|(id, client)| (*id, client.connection.clone()))
            .collect()
    }

    /// Remove exactly the listed handles, returning the entries removed
    ///
    /// Handles that already left are skipped.
    pub fn remove_failed(&self, ids: &[ClientId]) -> Vec<Client> {
        if ids.is_empty() {
            return Vec::new();
        }
        let mut clients = self.clients.lock();
        ids.iter().filter_map(|id| clients.remove(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn connection() -> Connection {
        let (local, _peer) = tokio::io::duplex(64);
        Connection::new(ClientId::new(), local)
    }

    #[test]
    fn test_register_and_duplicate() {
        let registry = Registry::new();
        let conn = connection();
        let id = conn.id();

        registry.register(id, "Alice".to_string(), conn.clone()).unwrap();
        assert_eq!(registry.size(), 1);
        assert!(registry.contains(id));
        assert_eq!(registry.name_of(id).as_deref(), Some("Alice"));

        let err = registry.register(id, "Again".to_string(), conn).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered(id));
        assert_eq!(registry.name_of(id).as_deref(), Some("Alice"));
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = Registry::new();
        let conn = connection();
        let id = conn.id();
        registry.register(id, "Bob".to_string(), conn).unwrap();

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert!(!registry.contains(id));
        assert_eq!(registry.size(), 0);
    }

    #[test]
    fn test_rename() {
        let registry = Registry::new();
        let conn = connection();
        let id = conn.id();

        assert_eq!(
            registry.rename(id, "Nobody".to_string()),
            Err(RegistryError::NotRegistered(id))
        );

        registry.register(id, "Alice".to_string(), conn).unwrap();
        assert_eq!(registry.rename(id, "Alicia".to_string()).unwrap(), "Alice");
        assert_eq!(registry.name_of(id).as_deref(), Some("Alicia"));
    }

    #[test]
    fn test_snapshot_skips_excluded() {
        let registry = Registry::new();
        let a = connection();
        let b = connection();
        registry.register(a.id(), "A".to_string(), a.clone()).unwrap();
        registry.register(b.id(), "B".to_string(), b.clone()).unwrap();

        let all = registry.snapshot(None);
        assert_eq!(all.len(), 2);

        let others = registry.snapshot(Some(a.id()));
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].0, b.id());
    }

    #[test]
    fn test_for_each_visits_all() {
        let registry = Registry::new();
        for name in ["A", "B", "C"] {
            let conn = connection();
            registry.register(conn.id(), name.to_string(), conn).unwrap();
        }

        let mut names = Vec::new();
        registry.for_each(|_, name| names.push(name.to_string()));
        names.sort();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_remove_failed_only_listed() {
        let registry = Registry::new();
        let a = connection();
        let b = connection();
        registry.register(a.id(), "A".to_string(), a.clone()).unwrap();
        registry.register(b.id(), "B".to_string(), b.clone()).unwrap();

        let removed = registry.remove_failed(&[a.id(), ClientId::new()]);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].name, "A");
        assert!(!registry.contains(a.id()));
        assert!(registry.contains(b.id()));
    }

    #[test]
    fn test_concurrent_register_unregister() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let mut kept = Vec::new();
                    for j in 0..50 {
                        let conn = connection();
                        let id = conn.id();
                        registry.register(id, format!("user-{}-{}", i, j), conn).unwrap();
                        if j % 2 == 0 {
                            registry.unregister(id);
                            assert!(!registry.contains(id));
                        } else {
                            kept.push(id);
                        }
                    }
                    kept
                })
            })
            .collect();

        let kept: Vec<ClientId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(registry.size(), kept.len());
        for id in kept {
            assert!(registry.contains(id));
        }
    }
}
