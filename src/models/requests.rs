//! Request DTOs for the session server API
//!
//! Defines incoming bodies and query parameters, plus identifier parsing.

use serde::Deserialize;
use uuid::Uuid;

use crate::cache::MAX_USER_ID_LENGTH;
use crate::error::{Result, SessionError};

/// Request body for creating or updating a session
#[derive(Debug, Clone, Deserialize)]
pub struct PutSessionRequest {
    /// Opaque session content
    pub payload: serde_json::Value,
}

/// `?userId=` query parameter shared by the session routes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl UserQuery {
    /// Returns the validated user id.
    pub fn user_id(self) -> Result<String> {
        let user_id = self
            .user_id
            .ok_or_else(|| SessionError::MalformedInput("Missing 'userId' parameter".to_string()))?;
        validate_user_id(&user_id)?;
        Ok(user_id)
    }
}

/// Rejects empty or oversized user ids.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.is_empty() {
        return Err(SessionError::MalformedInput("User id cannot be empty".to_string()));
    }
    if user_id.len() > MAX_USER_ID_LENGTH {
        return Err(SessionError::MalformedInput(format!(
            "User id exceeds maximum length of {} bytes",
            MAX_USER_ID_LENGTH
        )));
    }
    Ok(())
}

/// Parses a session id path segment.
pub fn parse_session_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| SessionError::MalformedInput(format!("Invalid session id '{}'", raw)))
}
