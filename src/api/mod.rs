//! API Module
//!
//! HTTP handlers and routing for the session server REST API.
//!
//! # Endpoints
//! - `POST /data-session/new` - Store a payload under a new session id
//! - `PUT /data-session/update/:session_id` - Create or replace a session
//! - `GET /data-session/get/:session_id` - Fetch a session
//! - `DELETE /data-session/delete/:session_id` - Delete a session
//! - `GET /data-sessions/list/:user_id` - List a user's sessions
//! - `GET /stats` - Session statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
