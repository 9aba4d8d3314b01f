//! Connection Registry
//!
//! The table of live connections. Each entry holds the client's public
//! description, whether it has become a source, the ids of the connections
//! listening to it, and the sending half of its outbound queue.
//!
//! Connections are addressed by [`ConnectionId`]. Listener sets store ids
//! only; the socket itself is owned by the connection's handler task.
//! The registry is not synchronized on its own; [`RelayHub`](super::RelayHub)
//! guards it with a single lock.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::messages::ClientDescription;

/// Sending half of a connection's outbound text queue
///
/// Unbounded: enqueueing never waits, so pushes can happen under the registry
/// lock. A peer that stops reading grows only its own queue until its socket
/// write fails or the stream ends.
pub type Outbox = mpsc::UnboundedSender<String>;

/// Stable handle for one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry value for one connection
#[derive(Debug)]
pub struct ClientEntry {
    /// Name and uuid as shown to other clients
    pub description: ClientDescription,
    /// Set once the client names itself; never cleared
    pub is_source: bool,
    /// Connections receiving this client's samples
    pub listeners: HashSet<ConnectionId>,
    outbox: Outbox,
}

impl ClientEntry {
    pub fn uuid(&self) -> &str {
        &self.description.uuid
    }
}

/// A connection selected to receive a message
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: ConnectionId,
    pub outbox: Outbox,
}

/// Mapping of every live connection to its entry
#[derive(Debug, Default)]
pub struct Registry {
    // Ordered so that source lists come out in connect order
    entries: BTreeMap<ConnectionId, ClientEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return its uuid
    ///
    /// Adding an id that is already present changes nothing and returns the
    /// existing uuid.
    pub fn add(&mut self, id: ConnectionId, outbox: Outbox) -> String {
        if let Some(entry) = self.entries.get(&id) {
            return entry.uuid().to_string();
        }

        let uuid = self.fresh_uuid();
        let entry = ClientEntry {
            description: ClientDescription {
                display_name: uuid.clone(),
                uuid: uuid.clone(),
            },
            is_source: false,
            listeners: HashSet::new(),
            outbox,
        };
        self.entries.insert(id, entry);
        uuid
    }

    fn fresh_uuid(&self) -> String {
        loop {
            let candidate = Uuid::new_v4().to_string();
            if self.find_by_uuid(&candidate).is_none() {
                return candidate;
            }
        }
    }

    /// Set the display name and mark the connection as a source
    ///
    /// Returns false if the connection is not registered.
    pub fn set_name(&mut self, id: ConnectionId, name: impl Into<String>) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.description.display_name = name.into();
                entry.is_source = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: ConnectionId) -> Option<&ClientEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Find the entry with the given uuid
    ///
    /// Scans every entry. uuids are unique while registered, so at most one
    /// can match; were that ever violated the last match would be returned.
    pub fn find_by_uuid(&self, uuid: &str) -> Option<(ConnectionId, &ClientEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.uuid() == uuid)
            .map(|(id, entry)| (*id, entry))
            .last()
    }

    fn find_by_uuid_mut(&mut self, uuid: &str) -> Option<&mut ClientEntry> {
        self.entries
            .values_mut()
            .filter(|entry| entry.uuid() == uuid)
            .last()
    }

    /// Add `listener` to the listeners of the source with `source_uuid`
    ///
    /// Returns false if no entry has that uuid, or if `listener` itself is
    /// not registered.
    pub fn add_listener(&mut self, source_uuid: &str, listener: ConnectionId) -> bool {
        if !self.entries.contains_key(&listener) {
            return false;
        }
        match self.find_by_uuid_mut(source_uuid) {
            Some(entry) => {
                entry.listeners.insert(listener);
                true
            }
            None => false,
        }
    }

    /// Remove `listener` from the listeners of the source with `source_uuid`
    ///
    /// Returns false if no entry has that uuid.
    pub fn remove_listener(&mut self, source_uuid: &str, listener: ConnectionId) -> bool {
        match self.find_by_uuid_mut(source_uuid) {
            Some(entry) => {
                entry.listeners.remove(&listener);
                true
            }
            None => false,
        }
    }

    /// Remove a connection and every subscription edge pointing at it
    ///
    /// Safe to call for ids that were never added or are already gone.
    pub fn remove(&mut self, id: ConnectionId) -> Option<ClientEntry> {
        let removed = self.entries.remove(&id);
        for entry in self.entries.values_mut() {
            entry.listeners.remove(&id);
        }
        removed
    }

    /// Descriptions of every source, in connect order
    pub fn source_list(&self) -> Vec<ClientDescription> {
        self.entries
            .values()
            .filter(|entry| entry.is_source)
            .map(|entry| entry.description.clone())
            .collect()
    }

    pub fn source_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_source).count()
    }

    /// Every registered connection
    pub fn recipients(&self) -> Vec<Recipient> {
        self.entries
            .iter()
            .map(|(id, entry)| Recipient {
                id: *id,
                outbox: entry.outbox.clone(),
            })
            .collect()
    }

    /// The live listeners of `source`, or `None` if it is not registered
    pub fn listeners_of(&self, source: ConnectionId) -> Option<Vec<Recipient>> {
        let entry = self.entries.get(&source)?;
        Some(
            entry
                .listeners
                .iter()
                .filter_map(|id| {
                    self.entries.get(id).map(|listener| Recipient {
                        id: *id,
                        outbox: listener.outbox.clone(),
                    })
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outbox() -> (Outbox, mpsc::UnboundedReceiver<String>) {
        mpsc::unbounded_channel()
    }

    fn registry_with(ids: &[u64]) -> (Registry, Vec<String>) {
        let mut registry = Registry::new();
        let uuids = ids
            .iter()
            .map(|raw| registry.add(ConnectionId::new(*raw), outbox().0))
            .collect();
        (registry, uuids)
    }

    #[test]
    fn test_add_then_find_by_uuid() {
        let mut registry = Registry::new();
        let id = ConnectionId::new(1);
        let uuid = registry.add(id, outbox().0);

        let (found_id, entry) = registry.find_by_uuid(&uuid).unwrap();
        assert_eq!(found_id, id);
        assert_eq!(entry.description.uuid, uuid);
        assert_eq!(entry.description.display_name, uuid);
        assert!(!entry.is_source);
        assert!(entry.listeners.is_empty());
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut registry = Registry::new();
        let id = ConnectionId::new(1);
        let first = registry.add(id, outbox().0);
        let second = registry.add(id, outbox().0);

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_uuids_are_unique() {
        let (_registry, uuids) = registry_with(&[1, 2, 3, 4]);
        let distinct: HashSet<_> = uuids.iter().collect();
        assert_eq!(distinct.len(), uuids.len());
    }

    #[test]
    fn test_set_name_marks_source() {
        let (mut registry, uuids) = registry_with(&[1]);
        let id = ConnectionId::new(1);

        assert!(registry.set_name(id, "ECG-1"));
        let entry = registry.get(id).unwrap();
        assert!(entry.is_source);
        assert_eq!(entry.description.display_name, "ECG-1");

        let sources = registry.source_list();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].display_name, "ECG-1");
        assert_eq!(sources[0].uuid, uuids[0]);
    }

    #[test]
    fn test_rename_preserves_uuid_and_listeners() {
        let (mut registry, uuids) = registry_with(&[1, 2]);
        let source = ConnectionId::new(1);
        let listener = ConnectionId::new(2);

        registry.set_name(source, "ECG-1");
        registry.add_listener(&uuids[0], listener);
        registry.set_name(source, "ECG-renamed");

        let entry = registry.get(source).unwrap();
        assert!(entry.is_source);
        assert_eq!(entry.description.display_name, "ECG-renamed");
        assert_eq!(entry.description.uuid, uuids[0]);
        assert!(entry.listeners.contains(&listener));
    }

    #[test]
    fn test_set_name_unknown_connection() {
        let mut registry = Registry::new();
        assert!(!registry.set_name(ConnectionId::new(9), "ghost"));
        assert!(registry.source_list().is_empty());
    }

    #[test]
    fn test_subscribe_unsubscribe_round_trip() {
        let (mut registry, uuids) = registry_with(&[1, 2, 3]);
        let source = ConnectionId::new(1);
        registry.add_listener(&uuids[0], ConnectionId::new(3));
        let before = registry.get(source).unwrap().listeners.clone();

        assert!(registry.add_listener(&uuids[0], ConnectionId::new(2)));
        assert!(registry.remove_listener(&uuids[0], ConnectionId::new(2)));

        assert_eq!(registry.get(source).unwrap().listeners, before);
    }

    #[test]
    fn test_add_listener_is_idempotent() {
        let (mut registry, uuids) = registry_with(&[1, 2]);
        registry.add_listener(&uuids[0], ConnectionId::new(2));
        registry.add_listener(&uuids[0], ConnectionId::new(2));

        let entry = registry.get(ConnectionId::new(1)).unwrap();
        assert_eq!(entry.listeners.len(), 1);
    }

    #[test]
    fn test_unknown_target_is_noop() {
        let (mut registry, _) = registry_with(&[1]);
        assert!(!registry.add_listener("no-such-uuid", ConnectionId::new(1)));
        assert!(!registry.remove_listener("no-such-uuid", ConnectionId::new(1)));
        assert!(registry.get(ConnectionId::new(1)).unwrap().listeners.is_empty());
    }

    #[test]
    fn test_removed_connection_cannot_listen() {
        let (mut registry, uuids) = registry_with(&[1, 2]);
        registry.remove(ConnectionId::new(2));

        assert!(!registry.add_listener(&uuids[0], ConnectionId::new(2)));
        assert!(!registry.add_listener(&uuids[0], ConnectionId::new(42)));
        assert!(registry.get(ConnectionId::new(1)).unwrap().listeners.is_empty());
    }

    #[test]
    fn test_self_subscription_allowed() {
        let (mut registry, uuids) = registry_with(&[1]);
        assert!(registry.add_listener(&uuids[0], ConnectionId::new(1)));
        let listeners = registry.listeners_of(ConnectionId::new(1)).unwrap();
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_remove_purges_listener_edges() {
        let (mut registry, uuids) = registry_with(&[1, 2, 3]);
        let gone = ConnectionId::new(3);
        registry.add_listener(&uuids[0], gone);
        registry.add_listener(&uuids[1], gone);

        assert!(registry.remove(gone).is_some());
        assert!(!registry.contains(gone));
        assert!(!registry.get(ConnectionId::new(1)).unwrap().listeners.contains(&gone));
        assert!(!registry.get(ConnectionId::new(2)).unwrap().listeners.contains(&gone));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut registry, uuids) = registry_with(&[1, 2]);
        registry.add_listener(&uuids[0], ConnectionId::new(2));

        assert!(registry.remove(ConnectionId::new(2)).is_some());
        assert!(registry.remove(ConnectionId::new(2)).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(ConnectionId::new(1)).unwrap().listeners.is_empty());

        // Never-added ids are fine too
        assert!(registry.remove(ConnectionId::new(42)).is_none());
    }

    #[test]
    fn test_uuid_reusable_after_remove() {
        let (mut registry, uuids) = registry_with(&[1]);
        registry.remove(ConnectionId::new(1));
        assert!(registry.find_by_uuid(&uuids[0]).is_none());
    }

    #[test]
    fn test_source_list_in_connect_order() {
        let (mut registry, _) = registry_with(&[1, 2, 3]);
        registry.set_name(ConnectionId::new(3), "third");
        registry.set_name(ConnectionId::new(1), "first");

        let names: Vec<_> = registry
            .source_list()
            .into_iter()
            .map(|d| d.display_name)
            .collect();
        assert_eq!(names, vec!["first", "third"]);
        assert_eq!(registry.source_count(), 2);
    }

    #[test]
    fn test_listeners_of_unknown_source() {
        let registry = Registry::new();
        assert!(registry.listeners_of(ConnectionId::new(1)).is_none());
    }
}
