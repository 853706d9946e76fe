// src/storage/status_store.rs
//! Durable mapping from status-list identifier to its latest encoded form.
//!
//! The store holds the *transport-encoded* bytes (gzip + base64 text) of
//! each status list; it never interprets them. Read-modify-write cycles
//! over a single id are serialized by the request layer, not here, so the
//! store only needs atomic individual operations.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;

use crate::errors::StatusError;

/// Storage capability consumed by the request-handling layer.
///
/// Passed explicitly to whoever drives a read-modify-write cycle; there is
/// no process-wide store singleton.
pub trait StatusStore: Send + Sync {
    /// Fetches the latest encoded bytes for a status list.
    ///
    /// # Errors
    /// [`StatusError::NotFound`] if no list exists under `id`,
    /// [`StatusError::Storage`] / [`StatusError::StorageUnavailable`] on
    /// backend failure.
    fn get(&self, id: &str) -> Result<Vec<u8>, StatusError>;

    /// Replaces the encoded bytes for an existing status list.
    fn put(&self, id: &str, bytes: Vec<u8>) -> Result<(), StatusError>;

    /// Creates a new status list with the given initial encoded bytes and
    /// returns its freshly assigned identifier.
    fn create(&self, initial: Vec<u8>) -> Result<String, StatusError>;

    /// Lists all known status-list identifiers.
    fn list_ids(&self) -> Result<Vec<String>, StatusError>;
}

/// In-memory status store.
///
/// Hashmap-backed, O(1) lookups, suitable for tests and single-process
/// deployments; a relational backend can implement [`StatusStore`] without
/// touching the core.
pub struct MemoryStatusStore {
    /// Encoded status lists keyed by id.
    lists: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStatusStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStatusStore {
            lists: Mutex::new(HashMap::new()),
        }
    }

    /// Generates a fresh random hex identifier.
    fn new_id() -> String {
        let bytes: [u8; 8] = rand::thread_rng().gen();
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, StatusError> {
        // A poisoned lock means a writer died mid-operation; the store is
        // no longer trustworthy for this process.
        self.lists.lock().map_err(|_| StatusError::StorageUnavailable)
    }
}

impl Default for MemoryStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore for MemoryStatusStore {
    fn get(&self, id: &str) -> Result<Vec<u8>, StatusError> {
        let lists = self.lock()?;
        lists.get(id).cloned().ok_or(StatusError::NotFound)
    }

    fn put(&self, id: &str, bytes: Vec<u8>) -> Result<(), StatusError> {
        let mut lists = self.lock()?;
        if !lists.contains_key(id) {
            return Err(StatusError::NotFound);
        }
        lists.insert(id.to_string(), bytes);
        Ok(())
    }

    fn create(&self, initial: Vec<u8>) -> Result<String, StatusError> {
        let mut lists = self.lock()?;
        let mut id = Self::new_id();
        while lists.contains_key(&id) {
            id = Self::new_id();
        }
        lists.insert(id.clone(), initial);
        Ok(id)
    }

    fn list_ids(&self) -> Result<Vec<String>, StatusError> {
        let lists = self.lock()?;
        Ok(lists.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_get() {
        let store = MemoryStatusStore::new();
        let id = store.create(b"encoded".to_vec()).unwrap();
        assert_eq!(store.get(&id).unwrap(), b"encoded".to_vec());
    }

    #[test]
    fn test_get_unknown_id_is_not_found() {
        let store = MemoryStatusStore::new();
        assert!(matches!(store.get("missing"), Err(StatusError::NotFound)));
    }

    #[test]
    fn test_put_replaces_existing_bytes() {
        let store = MemoryStatusStore::new();
        let id = store.create(b"v1".to_vec()).unwrap();
        store.put(&id, b"v2".to_vec()).unwrap();
        assert_eq!(store.get(&id).unwrap(), b"v2".to_vec());
    }

    #[test]
    fn test_put_unknown_id_is_not_found() {
        let store = MemoryStatusStore::new();
        assert!(matches!(
            store.put("missing", b"v".to_vec()),
            Err(StatusError::NotFound)
        ));
    }

    #[test]
    fn test_list_ids_covers_all_created_lists() {
        let store = MemoryStatusStore::new();
        let a = store.create(Vec::new()).unwrap();
        let b = store.create(Vec::new()).unwrap();
        assert_ne!(a, b);

        let mut ids = store.list_ids().unwrap();
        ids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
