//! Cache Module
//!
//! Per-user session namespaces over a key-value store, with typed record access.

mod kv;
mod namespace;
mod record;
mod stats;
mod store;


// Re-export public types
pub use kv::{EntryProcessor, InMemoryKeyValueStore, KeyValueStore, StoreError};
pub use namespace::{Namespace, NamespaceResolver, DEFAULT_NAMESPACE_PREFIX};
pub use record::SessionRecord;
pub use stats::{SessionStats, StatsSnapshot};
pub use store::SessionStore;

// == Public Constants ==
/// Maximum allowed user id length in bytes
pub const MAX_USER_ID_LENGTH: usize = 256;

/// Default maximum serialized payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024; // 1 MB
