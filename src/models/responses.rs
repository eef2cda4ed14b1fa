//! Response DTOs for the session server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::cache::{SessionRecord, StatsSnapshot};
use crate::tasks::SweepPhase;

/// Response body for DELETE /data-session/delete/:sessionId
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The session that was deleted
    pub session_id: Uuid,
}

impl DeleteResponse {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            message: format!("Data session '{}' deleted successfully", session_id),
            session_id,
        }
    }
}

/// Session metadata without the payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(record: &SessionRecord) -> Self {
        Self {
            session_id: record.session_id,
            created_at: record.created_at,
            last_accessed_at: record.last_accessed_at,
        }
    }
}

/// Response body for GET /data-sessions/list/:userId
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub user_id: String,
    pub sessions: Vec<SessionSummary>,
}

impl ListResponse {
    pub fn new(user_id: impl Into<String>, records: &[SessionRecord]) -> Self {
        Self {
            user_id: user_id.into(),
            sessions: records.iter().map(SessionSummary::from).collect(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Current idle sweeper phase
    pub sweep_phase: SweepPhase,
    /// Jobs waiting for a worker
    pub queued_jobs: usize,
}

impl StatsResponse {
    pub fn new(counters: StatsSnapshot, sweep_phase: SweepPhase, queued_jobs: usize) -> Self {
        Self {
            hit_rate: counters.hit_rate(),
            counters,
            sweep_phase,
            queued_jobs,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delete_response_serialize() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(DeleteResponse::new(id)).unwrap();
        assert_eq!(json["sessionId"], json!(id.to_string()));
        assert!(json["message"].as_str().unwrap().contains("deleted"));
    }

    #[test]
    fn test_list_response_omits_payload() {
        let record = SessionRecord::new("u1", Uuid::new_v4(), json!({"big": "data"}), Utc::now());
        let json = serde_json::to_value(ListResponse::new("u1", &[record])).unwrap();

        assert_eq!(json["userId"], "u1");
        assert_eq!(json["sessions"].as_array().unwrap().len(), 1);
        assert!(json["sessions"][0].get("payload").is_none());
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let counters = StatsSnapshot {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(StatsResponse::new(counters, SweepPhase::Idle, 0)).unwrap();

        assert_eq!(json["hits"], 3);
        assert_eq!(json["sweep_phase"], "idle");
        assert!((json["hit_rate"].as_f64().unwrap() - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
