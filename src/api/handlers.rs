//! API Handlers
//!
//! HTTP request handlers for each session server endpoint.
//!
//! Handlers parse identifiers inline and hand every store call, plus response
//! serialization, to the worker pool.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::cache::{
    InMemoryKeyValueStore, KeyValueStore, NamespaceResolver, SessionRecord, SessionStats,
    SessionStore,
};
use crate::config::Config;
use crate::error::{Result, SessionError};
use crate::models::{
    parse_session_id, validate_user_id, DeleteResponse, HealthResponse, ListResponse,
    PutSessionRequest, StatsResponse, UserQuery,
};
use crate::tasks::{IdleSweeper, TouchDispatcher, WorkerPool};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub pool: WorkerPool,
    pub touches: TouchDispatcher,
    pub sweeper: Arc<IdleSweeper>,
}

impl AppState {
    /// Wires the session components over the given key-value store.
    ///
    /// Spawns the worker pool, so it must be called from within a Tokio runtime.
    pub fn new(kv: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        let resolver = NamespaceResolver::new(kv.clone(), config.namespace_prefix.clone());
        let store = SessionStore::new(kv, resolver, Arc::new(SessionStats::new()))
            .with_max_payload_size(config.max_payload_size);
        let pool = WorkerPool::new(config.worker_count, config.worker_backlog);
        let touches = TouchDispatcher::new(Arc::new(pool.clone()), store.clone());
        let sweeper = Arc::new(IdleSweeper::new(
            store.clone(),
            config.idle_threshold_duration(),
            config.drop_idle_namespaces,
        ));

        Self {
            store,
            pool,
            touches,
            sweeper,
        }
    }

    /// Creates a new AppState backed by an in-process store.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(InMemoryKeyValueStore::new()), config)
    }
}

/// JSON body with explicit content type and length.
fn json_bytes(status: StatusCode, body: Vec<u8>) -> Response {
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
        (header::CONTENT_LENGTH, HeaderValue::from(body.len())),
    ];
    (status, headers, body).into_response()
}

fn serialize(record: &SessionRecord) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| SessionError::Internal(e.to_string()))
}

/// Handler for GET /data-session/get/:session_id?userId=
///
/// Responds with the serialized record and schedules a touch without waiting for it.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Response> {
    let user_id = query.user_id()?;
    let session_id = parse_session_id(&session_id)?;

    let AppState { store, touches, .. } = state.clone();
    let body = state
        .pool
        .run(async move {
            let record = store.read(&user_id, session_id).await?;
            touches.schedule_touch(&user_id, session_id);

            let body = serialize(&record)?;
            debug!("Data session {} sent to '{}' ({} bytes)", session_id, user_id, body.len());
            Ok(body)
        })
        .await?;

    Ok(json_bytes(StatusCode::OK, body))
}

/// Handler for POST /data-session/new?userId=
///
/// Stores the payload under a new session id.
pub async fn create_handler(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    body: std::result::Result<Json<PutSessionRequest>, JsonRejection>,
) -> Result<Response> {
    let user_id = query.user_id()?;
    let Json(req) = body?;

    let store = state.store.clone();
    let body = state
        .pool
        .run(async move {
            let record = store.create(&user_id, req.payload).await?;
            serialize(&record)
        })
        .await?;

    Ok(json_bytes(StatusCode::CREATED, body))
}

/// Handler for PUT /data-session/update/:session_id?userId=
///
/// Upserts the payload; the creation time of an existing session is kept.
pub async fn update_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<UserQuery>,
    body: std::result::Result<Json<PutSessionRequest>, JsonRejection>,
) -> Result<Response> {
    let user_id = query.user_id()?;
    let Json(req) = body?;
    let session_id = parse_session_id(&session_id)?;

    let store = state.store.clone();
    let body = state
        .pool
        .run(async move {
            let record = store.put(&user_id, session_id, req.payload).await?;
            serialize(&record)
        })
        .await?;

    Ok(json_bytes(StatusCode::OK, body))
}

/// Handler for DELETE /data-session/delete/:session_id?userId=
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<DeleteResponse>> {
    let user_id = query.user_id()?;
    let session_id = parse_session_id(&session_id)?;

    let store = state.store.clone();
    state
        .pool
        .run(async move { store.delete(&user_id, session_id).await })
        .await?;

    Ok(Json(DeleteResponse::new(session_id)))
}

/// Handler for GET /data-sessions/list/:user_id
///
/// Lists session metadata. Does not count as an access.
pub async fn list_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ListResponse>> {
    validate_user_id(&user_id)?;

    let store = state.store.clone();
    let response = state
        .pool
        .run(async move {
            let records = store.list(&user_id).await?;
            Ok(ListResponse::new(user_id, &records))
        })
        .await?;

    Ok(Json(response))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.store.stats().snapshot(),
        state.sweeper.phase(),
        state.pool.queued(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
