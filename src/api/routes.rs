//! API Routes
//!
//! Configures the Axum router with all session server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_handler, delete_handler, get_handler, health_handler, list_handler, stats_handler,
    update_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /data-session/new?userId=` - Store a payload under a new session id
/// - `PUT /data-session/update/:session_id?userId=` - Create or replace a session
/// - `GET /data-session/get/:session_id?userId=` - Fetch a session (touches it)
/// - `DELETE /data-session/delete/:session_id?userId=` - Delete a session
/// - `GET /data-sessions/list/:user_id` - List a user's sessions
/// - `GET /stats` - Counters and sweeper phase
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/data-session/new", post(create_handler))
        .route("/data-session/update/:session_id", put(update_handler))
        .route("/data-session/get/:session_id", get(get_handler))
        .route("/data-session/delete/:session_id", delete(delete_handler))
        .route("/data-sessions/list/:user_id", get(list_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
