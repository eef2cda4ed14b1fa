//! Namespace Resolver Module
//!
//! Maps user ids to the names of their dedicated session collections.

use std::sync::Arc;

use crate::cache::KeyValueStore;
use crate::error::Result;

/// Default prefix for per-user session collections.
pub const DEFAULT_NAMESPACE_PREFIX: &str = "user-data-sessions";

// == Namespace ==
/// Handle to one user's session collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// Collection name in the key-value store
    pub name: String,
    /// Owning user
    pub user_id: String,
}

// == Namespace Resolver ==
/// Derives, looks up and lazily creates per-user namespaces.
#[derive(Clone)]
pub struct NamespaceResolver {
    prefix: String,
    kv: Arc<dyn KeyValueStore>,
}

impl NamespaceResolver {
    pub fn new(kv: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            kv,
        }
    }

    /// Collection name for `user_id`. Pure; touches nothing.
    pub fn namespace_for(&self, user_id: &str) -> String {
        format!("{}:{}", self.prefix, user_id)
    }

    /// Reverse of [`namespace_for`](Self::namespace_for). `None` for names
    /// that are not session namespaces.
    pub fn user_for<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(self.prefix.as_str())?.strip_prefix(':')
    }

    /// Finds the user's namespace without creating it.
    pub async fn lookup(&self, user_id: &str) -> Result<Option<Namespace>> {
        let name = self.namespace_for(user_id);
        if self.kv.collection_exists(&name).await? {
            Ok(Some(Namespace {
                name,
                user_id: user_id.to_string(),
            }))
        } else {
            Ok(None)
        }
    }

    /// Returns the user's namespace, creating it if needed. Safe to race.
    pub async fn get_or_create(&self, user_id: &str) -> Result<Namespace> {
        let name = self.namespace_for(user_id);
        self.kv.get_or_create_collection(&name).await?;
        Ok(Namespace {
            name,
            user_id: user_id.to_string(),
        })
    }
}
