//! Touch Dispatch
//!
//! Moves the "last accessed" update off the read path. Delivery is best effort:
//! a rejected or failed touch only leaves the idle clock stale.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::SessionStore;
use crate::tasks::TaskRunner;

/// Schedules [`SessionStore::touch`] on a [`TaskRunner`] without waiting for it.
#[derive(Clone)]
pub struct TouchDispatcher {
    runner: Arc<dyn TaskRunner>,
    store: SessionStore,
}

impl TouchDispatcher {
    pub fn new(runner: Arc<dyn TaskRunner>, store: SessionStore) -> Self {
        Self { runner, store }
    }

    /// Queues a touch and returns immediately. Failures are logged and counted, never returned.
    pub fn schedule_touch(&self, user_id: &str, session_id: Uuid) {
        let store = self.store.clone();
        let stats = self.store.stats().clone();
        let user = user_id.to_string();

        let job = Box::pin(async move {
            match store.touch(&user, session_id).await {
                Ok(true) => store.stats().record_touch_applied(),
                Ok(false) => {
                    store.stats().record_touch_skipped();
                    debug!("Touch skipped, session {} of user '{}' is gone", session_id, user);
                }
                Err(err) => {
                    store.stats().record_touch_failed();
                    warn!("Touch of session {} for user '{}' failed: {}", session_id, user, err);
                }
            }
        });

        match self.runner.run_async(job) {
            Ok(()) => stats.record_touch_dispatched(),
            Err(err) => {
                stats.record_touch_dropped();
                debug!("Touch of session {} dropped: {}", session_id, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{
        InMemoryKeyValueStore, NamespaceResolver, SessionStats, DEFAULT_NAMESPACE_PREFIX,
    };
    use crate::tasks::{Job, PoolError, WorkerPool};
    use serde_json::json;
    use std::time::{Duration, Instant};

    struct RejectingRunner;

    impl TaskRunner for RejectingRunner {
        fn run_async(&self, _job: Job) -> Result<(), PoolError> {
            Err(PoolError::Closed)
        }
    }

    fn new_store() -> SessionStore {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let resolver = NamespaceResolver::new(kv.clone(), DEFAULT_NAMESPACE_PREFIX);
        SessionStore::new(kv, resolver, Arc::new(SessionStats::new()))
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_touch_is_applied_asynchronously() {
        let store = new_store();
        let id = Uuid::new_v4();
        let written = store.put("u1", id, json!(1)).await.unwrap();
        let dispatcher = TouchDispatcher::new(Arc::new(WorkerPool::new(2, 8)), store.clone());

        tokio::time::sleep(Duration::from_millis(5)).await;
        dispatcher.schedule_touch("u1", id);

        let stats = store.stats().clone();
        wait_for(|| stats.snapshot().touches_applied == 1).await;

        let read = store.read("u1", id).await.unwrap();
        assert!(read.last_accessed_at > written.last_accessed_at);
        assert_eq!(store.stats().snapshot().touches_dispatched, 1);
    }

    #[tokio::test]
    async fn test_rejected_touch_is_dropped_silently() {
        let store = new_store();
        let id = Uuid::new_v4();
        let written = store.put("u1", id, json!(1)).await.unwrap();
        let dispatcher = TouchDispatcher::new(Arc::new(RejectingRunner), store.clone());

        dispatcher.schedule_touch("u1", id);

        let snap = store.stats().snapshot();
        assert_eq!(snap.touches_dropped, 1);
        assert_eq!(snap.touches_dispatched, 0);
        // Payload untouched, clock merely stale
        let read = store.read("u1", id).await.unwrap();
        assert_eq!(read, written);
    }

    #[tokio::test]
    async fn test_touch_of_missing_session_counts_as_skipped() {
        let store = new_store();
        let dispatcher = TouchDispatcher::new(Arc::new(WorkerPool::new(1, 4)), store.clone());

        dispatcher.schedule_touch("nobody", Uuid::new_v4());

        let stats = store.stats().clone();
        wait_for(|| stats.snapshot().touches_skipped == 1).await;
        let snap = store.stats().snapshot();
        assert_eq!(snap.touches_skipped, 1);
        assert_eq!(snap.touches_failed, 0);
        assert!(store.resolver().lookup("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_schedule_touch_on_saturated_pool_returns_immediately() {
        let store = new_store();
        let pool = WorkerPool::new(1, 1);

        // Park the only worker and fill the backlog
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        pool.try_submit(Box::pin(async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
        }))
        .unwrap();
        started_rx.await.unwrap();
        pool.try_submit(Box::pin(async {})).unwrap();

        let dispatcher = TouchDispatcher::new(Arc::new(pool), store.clone());
        let started = Instant::now();
        dispatcher.schedule_touch("u1", Uuid::new_v4());

        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(store.stats().snapshot().touches_dropped, 1);
        let _ = release_tx.send(());
    }
}
