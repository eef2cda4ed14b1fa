//! Session Store Module
//!
//! Typed get/put/delete/touch over per-user namespaces in the key-value store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{
    KeyValueStore, Namespace, NamespaceResolver, SessionRecord, SessionStats, StoreError,
    MAX_PAYLOAD_SIZE,
};
use crate::error::{Result, SessionError};

// == Session Store ==
/// The only component that mutates session records.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    resolver: NamespaceResolver,
    stats: Arc<SessionStats>,
    max_payload_size: usize,
}

impl SessionStore {
    // == Constructor ==
    /// Creates a store over `kv` using `resolver` for namespace naming.
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        resolver: NamespaceResolver,
        stats: Arc<SessionStats>,
    ) -> Self {
        Self {
            kv,
            resolver,
            stats,
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }

    /// Overrides the maximum serialized payload size accepted by writes.
    pub fn with_max_payload_size(mut self, bytes: usize) -> Self {
        self.max_payload_size = bytes;
        self
    }

    pub fn resolver(&self) -> &NamespaceResolver {
        &self.resolver
    }

    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }

    // == Lookup ==
    /// Resolves the user's namespace, failing with `NamespaceNotFound` if absent.
    pub async fn lookup(&self, user_id: &str) -> Result<Namespace> {
        self.resolver
            .lookup(user_id)
            .await?
            .ok_or_else(|| SessionError::NamespaceNotFound(user_id.to_string()))
    }

    // == Get ==
    /// Single-key lookup inside an already resolved namespace. Never creates anything.
    pub async fn get(&self, namespace: &Namespace, session_id: Uuid) -> Result<SessionRecord> {
        match self.kv.get(&namespace.name, session_id).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(SessionError::SessionNotFound {
                user_id: namespace.user_id.clone(),
                session_id: session_id.to_string(),
            }),
            // Evicted between lookup and get
            Err(StoreError::CollectionMissing(_)) => {
                Err(SessionError::NamespaceNotFound(namespace.user_id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    // == Read ==
    /// Lookup followed by get, recording a hit or miss.
    pub async fn read(&self, user_id: &str, session_id: Uuid) -> Result<SessionRecord> {
        let result = match self.lookup(user_id).await {
            Ok(namespace) => self.get(&namespace, session_id).await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(_) => self.stats.record_hit(),
            Err(SessionError::NamespaceNotFound(_)) | Err(SessionError::SessionNotFound { .. }) => {
                self.stats.record_miss()
            }
            Err(_) => {}
        }
        result
    }

    // == Put ==
    /// Upserts a record, creating the namespace on first write.
    ///
    /// `created_at` is kept from any existing record; `last_accessed_at` becomes now.
    pub async fn put(
        &self,
        user_id: &str,
        session_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<SessionRecord> {
        self.validate_payload(&payload)?;

        let mut recreated = false;
        loop {
            let namespace = self.resolver.get_or_create(user_id).await?;
            let processor = upsert(user_id.to_string(), session_id, payload.clone());

            match self.kv.invoke(&namespace.name, session_id, processor).await {
                Ok(Some(record)) => {
                    self.stats.record_write();
                    return Ok(record);
                }
                Ok(None) => {
                    return Err(SessionError::Internal(
                        "upsert stored no record".to_string(),
                    ))
                }
                Err(StoreError::CollectionMissing(name)) if !recreated => {
                    debug!("Namespace '{}' evicted mid-write, recreating", name);
                    recreated = true;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    // == Create ==
    /// Stores `payload` under a freshly generated session id.
    pub async fn create(&self, user_id: &str, payload: serde_json::Value) -> Result<SessionRecord> {
        self.put(user_id, Uuid::new_v4(), payload).await
    }

    // == Delete ==
    /// Removes one record. The namespace stays even if it is now empty.
    pub async fn delete(&self, user_id: &str, session_id: Uuid) -> Result<()> {
        let namespace = self.lookup(user_id).await?;

        match self.kv.delete(&namespace.name, session_id).await {
            Ok(true) => {
                self.stats.record_delete();
                Ok(())
            }
            Ok(false) => Err(SessionError::SessionNotFound {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
            }),
            Err(StoreError::CollectionMissing(_)) => {
                Err(SessionError::NamespaceNotFound(user_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    // == Touch ==
    /// Bumps `last_accessed_at` to now, never moving it backwards.
    ///
    /// Returns `Ok(false)` when the record or its namespace is gone; that is the
    /// expected outcome of a touch racing a delete or an eviction.
    pub async fn touch(&self, user_id: &str, session_id: Uuid) -> Result<bool> {
        let name = self.resolver.namespace_for(user_id);
        let now = Utc::now();
        let processor = Box::new(move |current: Option<SessionRecord>| {
            current.map(|mut record| {
                record.touch(now);
                record
            })
        });

        match self.kv.invoke(&name, session_id, processor).await {
            Ok(Some(_)) => Ok(true),
            Ok(None) | Err(StoreError::CollectionMissing(_)) => Ok(false),
            Err(err) => Err(SessionError::TouchFailed(err.to_string())),
        }
    }

    // == List ==
    /// All of a user's records, oldest first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let namespace = self.lookup(user_id).await?;
        let mut records = self.scan(&namespace).await?;
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    // == Namespaces ==
    /// Every session namespace currently in the store.
    pub async fn namespaces(&self) -> Result<Vec<Namespace>> {
        let names = self.kv.list_collection_names().await?;
        Ok(names
            .into_iter()
            .filter_map(|name| {
                let user_id = self.resolver.user_for(&name)?.to_string();
                Some(Namespace { name, user_id })
            })
            .collect())
    }

    // == Scan ==
    /// Snapshot of a namespace's records; not isolated from concurrent writes.
    pub async fn scan(&self, namespace: &Namespace) -> Result<Vec<SessionRecord>> {
        match self.kv.scan(&namespace.name).await {
            Ok(entries) => Ok(entries.into_iter().map(|(_, record)| record).collect()),
            Err(StoreError::CollectionMissing(_)) => {
                Err(SessionError::NamespaceNotFound(namespace.user_id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    // == Evict ==
    /// Clears every record in the namespace, and drops the namespace itself when
    /// `drop_namespace` is set. Returns the number of records cleared.
    pub async fn evict(&self, namespace: &Namespace, drop_namespace: bool) -> Result<usize> {
        let cleared = match self.kv.clear(&namespace.name).await {
            Ok(count) => count,
            Err(StoreError::CollectionMissing(_)) => 0,
            Err(err) => return Err(err.into()),
        };

        if drop_namespace {
            self.kv.destroy_collection(&namespace.name).await?;
        }
        Ok(cleared)
    }

    fn validate_payload(&self, payload: &serde_json::Value) -> Result<()> {
        let size = serde_json::to_vec(payload)
            .map_err(|e| SessionError::MalformedInput(e.to_string()))?
            .len();
        if size > self.max_payload_size {
            warn!("Rejected payload of {} bytes", size);
            return Err(SessionError::MalformedInput(format!(
                "Payload exceeds maximum size of {} bytes",
                self.max_payload_size
            )));
        }
        Ok(())
    }
}

fn upsert(
    user_id: String,
    session_id: Uuid,
    payload: serde_json::Value,
) -> crate::cache::EntryProcessor {
    let now = Utc::now();
    Box::new(move |current| {
        Some(match current {
            Some(mut record) => {
                record.replace_payload(payload, now);
                record
            }
            None => SessionRecord::new(user_id, session_id, payload, now),
        })
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryKeyValueStore, DEFAULT_NAMESPACE_PREFIX};
    use chrono::Duration;
    use serde_json::json;

    fn new_store() -> (Arc<InMemoryKeyValueStore>, SessionStore) {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let resolver = NamespaceResolver::new(kv.clone(), DEFAULT_NAMESPACE_PREFIX);
        let store = SessionStore::new(kv.clone(), resolver, Arc::new(SessionStats::new()));
        (kv, store)
    }

    #[tokio::test]
    async fn test_read_before_any_put() {
        let (_, store) = new_store();

        let result = store.read("u1", Uuid::new_v4()).await;
        assert!(matches!(result, Err(SessionError::NamespaceNotFound(u)) if u == "u1"));
        assert_eq!(store.stats().snapshot().misses, 1);
    }

    #[tokio::test]
    async fn test_put_and_read() {
        let (_, store) = new_store();
        let id = Uuid::new_v4();

        let written = store.put("u1", id, json!({"rows": [1, 2, 3]})).await.unwrap();
        let read = store.read("u1", id).await.unwrap();

        assert_eq!(read.payload, json!({"rows": [1, 2, 3]}));
        assert_eq!(read.created_at, written.created_at);
        assert_eq!(store.stats().snapshot().hits, 1);
    }

    #[tokio::test]
    async fn test_read_unknown_session_in_existing_namespace() {
        let (_, store) = new_store();
        store.put("u1", Uuid::new_v4(), json!(1)).await.unwrap();

        let result = store.read("u1", Uuid::new_v4()).await;
        assert!(matches!(result, Err(SessionError::SessionNotFound { .. })));
    }

    #[tokio::test]
    async fn test_namespace_isolation() {
        let (_, store) = new_store();
        let id = Uuid::new_v4();
        store.put("u1", id, json!("secret")).await.unwrap();
        store.put("u2", Uuid::new_v4(), json!("other")).await.unwrap();

        let result = store.read("u2", id).await;
        assert!(matches!(result, Err(SessionError::SessionNotFound { .. })));
    }

    #[tokio::test]
    async fn test_put_overwrite_preserves_created_at() {
        let (_, store) = new_store();
        let id = Uuid::new_v4();

        let first = store.put("u1", id, json!("v1")).await.unwrap();
        let second = store.put("u1", id, json!("v2")).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert!(second.last_accessed_at >= first.last_accessed_at);
        assert_eq!(store.read("u1", id).await.unwrap().payload, json!("v2"));
    }

    #[tokio::test]
    async fn test_put_rejects_large_payload() {
        let (_, store) = new_store();
        let store = store.with_max_payload_size(16);

        let result = store.put("u1", Uuid::new_v4(), json!("x".repeat(64))).await;
        assert!(matches!(result, Err(SessionError::MalformedInput(_))));
        assert!(store.resolver().lookup("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_keeps_namespace() {
        let (_, store) = new_store();
        let id = Uuid::new_v4();
        store.put("u1", id, json!(1)).await.unwrap();

        store.delete("u1", id).await.unwrap();

        assert!(matches!(
            store.read("u1", id).await,
            Err(SessionError::SessionNotFound { .. })
        ));
        assert!(store.resolver().lookup("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_not_found() {
        let (_, store) = new_store();
        assert!(matches!(
            store.delete("u1", Uuid::new_v4()).await,
            Err(SessionError::NamespaceNotFound(_))
        ));

        store.put("u1", Uuid::new_v4(), json!(1)).await.unwrap();
        assert!(matches!(
            store.delete("u1", Uuid::new_v4()).await,
            Err(SessionError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_touch_bumps_timestamp() {
        let (_, store) = new_store();
        let id = Uuid::new_v4();
        let written = store.put("u1", id, json!(1)).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(store.touch("u1", id).await.unwrap());

        let read = store.read("u1", id).await.unwrap();
        assert!(read.last_accessed_at > written.last_accessed_at);
        assert_eq!(read.created_at, written.created_at);
    }

    #[tokio::test]
    async fn test_touch_never_decreases_timestamp() {
        let (kv, store) = new_store();
        let id = Uuid::new_v4();
        store.put("u1", id, json!(1)).await.unwrap();

        // A write stamped in the future must survive a touch stamped now
        let namespace = store.lookup("u1").await.unwrap();
        let mut record = kv.get(&namespace.name, id).await.unwrap().unwrap();
        let future = Utc::now() + Duration::minutes(10);
        record.last_accessed_at = future;
        kv.put(&namespace.name, id, record).await.unwrap();

        assert!(store.touch("u1", id).await.unwrap());
        assert_eq!(store.read("u1", id).await.unwrap().last_accessed_at, future);
    }

    #[tokio::test]
    async fn test_touch_after_delete_or_eviction_is_silent() {
        let (_, store) = new_store();
        let id = Uuid::new_v4();

        assert!(!store.touch("u1", id).await.unwrap());

        store.put("u1", id, json!(1)).await.unwrap();
        store.delete("u1", id).await.unwrap();
        assert!(!store.touch("u1", id).await.unwrap());
        // Touch must not resurrect the record
        assert!(matches!(
            store.read("u1", id).await,
            Err(SessionError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_sorted_by_creation() {
        let (_, store) = new_store();
        let first = store.create("u1", json!("a")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = store.create("u1", json!("b")).await.unwrap();

        let listed = store.list("u1").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.session_id).collect();
        assert_eq!(ids, vec![first.session_id, second.session_id]);
    }

    #[tokio::test]
    async fn test_namespaces_ignores_foreign_collections() {
        let (kv, store) = new_store();
        kv.get_or_create_collection("metrics").await.unwrap();
        store.put("u1", Uuid::new_v4(), json!(1)).await.unwrap();

        let namespaces = store.namespaces().await.unwrap();
        assert_eq!(namespaces.len(), 1);
        assert_eq!(namespaces[0].user_id, "u1");
    }

    #[tokio::test]
    async fn test_evict_modes() {
        let (_, store) = new_store();
        store.put("u1", Uuid::new_v4(), json!(1)).await.unwrap();
        store.put("u2", Uuid::new_v4(), json!(1)).await.unwrap();

        let ns1 = store.lookup("u1").await.unwrap();
        assert_eq!(store.evict(&ns1, false).await.unwrap(), 1);
        assert!(store.scan(&ns1).await.unwrap().is_empty());

        let ns2 = store.lookup("u2").await.unwrap();
        assert_eq!(store.evict(&ns2, true).await.unwrap(), 1);
        assert!(matches!(
            store.lookup("u2").await,
            Err(SessionError::NamespaceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_put_after_eviction_recreates_namespace() {
        let (_, store) = new_store();
        store.put("u1", Uuid::new_v4(), json!(1)).await.unwrap();
        let namespace = store.lookup("u1").await.unwrap();
        store.evict(&namespace, true).await.unwrap();

        let id = Uuid::new_v4();
        store.put("u1", id, json!(2)).await.unwrap();
        assert_eq!(store.list("u1").await.unwrap().len(), 1);
    }
}
