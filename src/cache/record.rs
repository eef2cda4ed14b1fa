//! Session Record Module
//!
//! Defines the unit stored in a user's namespace, with creation and access timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// == Session Record ==
/// A single data session owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Session identifier, unique within the owning user's namespace
    pub session_id: Uuid,
    /// Owning user
    pub user_id: String,
    /// Opaque computed result
    pub payload: serde_json::Value,
    /// Set once on first insert
    pub created_at: DateTime<Utc>,
    /// Bumped by every write and (eventually) every read
    pub last_accessed_at: DateTime<Utc>,
}

impl SessionRecord {
    // == Constructor ==
    /// Creates a fresh record with both timestamps set to `now`.
    pub fn new(
        user_id: impl Into<String>,
        session_id: Uuid,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            user_id: user_id.into(),
            payload,
            created_at: now,
            last_accessed_at: now,
        }
    }

    // == Touch ==
    /// Moves `last_accessed_at` forward to `now`.
    ///
    /// A touch carrying an older instant than the current value is a no-op, so a
    /// delayed touch can never pull the timestamp below a more recent write.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = self.last_accessed_at.max(now);
    }

    // == Replace Payload ==
    /// Overwrites the payload and bumps the access time. `created_at` is preserved.
    pub fn replace_payload(&mut self, payload: serde_json::Value, now: DateTime<Utc>) {
        self.payload = payload;
        self.touch(now);
    }

    // == Idle Duration ==
    /// How long the record has gone without access as of `now` (zero if accessed in the future).
    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.last_accessed_at).max(chrono::Duration::zero())
    }
}
