//! Error types for the session server
//!
//! Provides unified error handling using thiserror.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cache::StoreError;

// == Session Error Enum ==
/// Unified error type for the session server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The user has never had a session written (or their namespace was evicted)
    #[error("User with id '{0}' does not have any sessions")]
    NamespaceNotFound(String),

    /// The namespace exists but the session id is not in it
    #[error("Data session '{session_id}' does not exist for user '{user_id}'")]
    SessionNotFound { user_id: String, session_id: String },

    /// A touch could not be applied; never surfaced to a client
    #[error("Touch failed: {0}")]
    TouchFailed(String),

    /// The key-value store failed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Unparsable identifiers or parameters
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The worker pool backlog is full
    #[error("Server busy: {0}")]
    ServerBusy(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::StoreUnavailable(err.to_string())
    }
}

impl From<JsonRejection> for SessionError {
    fn from(rejection: JsonRejection) -> Self {
        SessionError::MalformedInput(rejection.body_text())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            SessionError::NamespaceNotFound(_) | SessionError::SessionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            SessionError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            SessionError::ServerBusy(_) | SessionError::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            SessionError::TouchFailed(_) | SessionError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Plain-text body; axum sets text/plain for String responses
        (status, self.to_string()).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the session server.
pub type Result<T> = std::result::Result<T, SessionError>;
