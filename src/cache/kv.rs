//! Key-Value Store Module
//!
//! The storage collaborator the session layer is built on: named collections of
//! session records keyed by session id. Replication and partitioning are the
//! implementation's concern; this crate only relies on the operations below.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::cache::SessionRecord;

// == Store Error ==
/// Failures reported by a key-value store implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The named collection does not exist
    #[error("collection not found: {0}")]
    CollectionMissing(String),
}

/// Atomic read-modify-write applied to a single key.
///
/// Receives the current value (if any) and returns the value to store.
/// Returning `None` leaves the key untouched.
pub type EntryProcessor = Box<dyn FnOnce(Option<SessionRecord>) -> Option<SessionRecord> + Send>;

// == Key-Value Store ==
/// Collection-oriented key-value store holding session records.
///
/// All per-key operations fail with [`StoreError::CollectionMissing`] when the
/// collection has not been created (or has been destroyed).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns true if a collection with this name exists.
    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Creates the collection if absent. Creating an existing collection is a no-op.
    async fn get_or_create_collection(&self, name: &str) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, key: Uuid) -> Result<Option<SessionRecord>, StoreError>;

    async fn put(&self, collection: &str, key: Uuid, value: SessionRecord) -> Result<(), StoreError>;

    /// Runs `processor` atomically against the entry and returns what was stored.
    async fn invoke(
        &self,
        collection: &str,
        key: Uuid,
        processor: EntryProcessor,
    ) -> Result<Option<SessionRecord>, StoreError>;

    /// Removes a key. Returns true if it was present.
    async fn delete(&self, collection: &str, key: Uuid) -> Result<bool, StoreError>;

    /// Point-in-time snapshot of every entry in the collection.
    async fn scan(&self, collection: &str) -> Result<Vec<(Uuid, SessionRecord)>, StoreError>;

    /// Removes every entry but keeps the collection. Returns the number removed.
    async fn clear(&self, collection: &str) -> Result<usize, StoreError>;

    /// Removes the collection and its entries. Returns true if it existed.
    async fn destroy_collection(&self, name: &str) -> Result<bool, StoreError>;

    async fn list_collection_names(&self) -> Result<Vec<String>, StoreError>;
}

type Collection = Arc<RwLock<HashMap<Uuid, SessionRecord>>>;

// == In-Memory Store ==
/// Single-process [`KeyValueStore`] backed by nested hash maps.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn collection(&self, name: &str) -> Result<Collection, StoreError> {
        self.collections
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::CollectionMissing(name.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn get_or_create_collection(&self, name: &str) -> Result<(), StoreError> {
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn get(&self, collection: &str, key: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        let entries = self.collection(collection).await?;
        let guard = entries.read().await;
        Ok(guard.get(&key).cloned())
    }

    async fn put(&self, collection: &str, key: Uuid, value: SessionRecord) -> Result<(), StoreError> {
        let entries = self.collection(collection).await?;
        entries.write().await.insert(key, value);
        Ok(())
    }

    async fn invoke(
        &self,
        collection: &str,
        key: Uuid,
        processor: EntryProcessor,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let entries = self.collection(collection).await?;
        let mut guard = entries.write().await;

        let current = guard.get(&key).cloned();
        match processor(current) {
            Some(updated) => {
                guard.insert(key, updated.clone());
                Ok(Some(updated))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, collection: &str, key: Uuid) -> Result<bool, StoreError> {
        let entries = self.collection(collection).await?;
        let removed = entries.write().await.remove(&key).is_some();
        Ok(removed)
    }

    async fn scan(&self, collection: &str) -> Result<Vec<(Uuid, SessionRecord)>, StoreError> {
        let entries = self.collection(collection).await?;
        let guard = entries.read().await;
        Ok(guard.iter().map(|(k, v)| (*k, v.clone())).collect())
    }

    async fn clear(&self, collection: &str) -> Result<usize, StoreError> {
        let entries = self.collection(collection).await?;
        let mut guard = entries.write().await;
        let count = guard.len();
        guard.clear();
        Ok(count)
    }

    async fn destroy_collection(&self, name: &str) -> Result<bool, StoreError> {
        let removed = self.collections.write().await.remove(name);
        match removed {
            Some(entries) => {
                // Writers still holding the handle land in an orphaned map.
                entries.write().await.clear();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_collection_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn record(user: &str, id: Uuid) -> SessionRecord {
        SessionRecord::new(user, id, json!({"v": 1}), Utc::now())
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = InMemoryKeyValueStore::new();

        store.get_or_create_collection("c").await.unwrap();
        let id = Uuid::new_v4();
        store.put("c", id, record("u", id)).await.unwrap();
        store.get_or_create_collection("c").await.unwrap();

        assert!(store.get("c", id).await.unwrap().is_some());
        assert_eq!(store.list_collection_names().await.unwrap(), vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_collection_errors() {
        let store = InMemoryKeyValueStore::new();
        let id = Uuid::new_v4();

        assert!(!store.collection_exists("nope").await.unwrap());
        assert_eq!(
            store.get("nope", id).await,
            Err(StoreError::CollectionMissing("nope".to_string()))
        );
        assert!(matches!(
            store.put("nope", id, record("u", id)).await,
            Err(StoreError::CollectionMissing(_))
        ));
        assert!(matches!(store.scan("nope").await, Err(StoreError::CollectionMissing(_))));
    }

    #[tokio::test]
    async fn test_invoke_none_leaves_entry_absent() {
        let store = InMemoryKeyValueStore::new();
        store.get_or_create_collection("c").await.unwrap();
        let id = Uuid::new_v4();

        let stored = store.invoke("c", id, Box::new(|current| current)).await.unwrap();

        assert!(stored.is_none());
        assert!(store.get("c", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = InMemoryKeyValueStore::new();
        store.get_or_create_collection("c").await.unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.put("c", a, record("u", a)).await.unwrap();
        store.put("c", b, record("u", b)).await.unwrap();

        assert!(store.delete("c", a).await.unwrap());
        assert!(!store.delete("c", a).await.unwrap());
        assert_eq!(store.clear("c").await.unwrap(), 1);
        assert!(store.collection_exists("c").await.unwrap());
        assert!(store.scan("c").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_collection() {
        let store = InMemoryKeyValueStore::new();
        store.get_or_create_collection("c").await.unwrap();

        assert!(store.destroy_collection("c").await.unwrap());
        assert!(!store.destroy_collection("c").await.unwrap());
        assert!(!store.collection_exists("c").await.unwrap());
    }
}
