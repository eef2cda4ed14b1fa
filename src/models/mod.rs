//! Request and Response models for the session server API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{parse_session_id, validate_user_id, PutSessionRequest, UserQuery};
pub use responses::{DeleteResponse, HealthResponse, ListResponse, SessionSummary, StatsResponse};
