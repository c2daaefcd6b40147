//! Routes and handlers.
//!
//! | Method | Path                                        | Operation             |
//! |--------|---------------------------------------------|-----------------------|
//! | GET    | `/healthz`                                  | liveness              |
//! | POST   | `/api/sessions/{source}/{type}`             | add_session           |
//! | GET    | `/api/sessions/{source}/{type}`             | get_sessions          |
//! | GET    | `/api/sessions/{source}/{type}/query`       | get_sessions_by_query |
//! | GET    | `/api/sessions/{source}/{type}/{id}`        | get_session           |
//! | PUT    | `/api/sessions/{source}/{type}/{id}`        | update_session        |
//! | DELETE | `/api/sessions/{source}/{type}/{id}`        | delete_session        |
//!
//! Request bodies are taken as raw text and parsed by the service, so a
//! malformed document gets the same error body as any other invalid input.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use session_core::entities::SessionRecord;
use session_core::enums::OperationType;
use session_db::service::SessionService;

use crate::error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<SessionService>,
}

impl AppState {
    #[must_use]
    pub fn new(service: SessionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Build the router over `service`.
pub fn router(service: SessionService) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/sessions/{source}/{session_type}",
            get(get_sessions).post(add_session),
        )
        .route(
            "/api/sessions/{source}/{session_type}/query",
            get(query_sessions),
        )
        .route(
            "/api/sessions/{source}/{session_type}/{id}",
            get(get_session).put(update_session).delete(delete_session),
        )
        .with_state(AppState::new(service))
}

#[derive(Debug, Deserialize)]
struct FieldQuery {
    field: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateParams {
    operation: Option<String>,
}

async fn healthz() -> Json<&'static str> {
    Json("ok")
}

async fn add_session(
    State(state): State<AppState>,
    Path((source, session_type)): Path<(String, String)>,
    body: String,
) -> Result<Json<SessionRecord>, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::empty_body());
    }
    let record = state
        .service
        .add_session(&source, &session_type, &body)
        .await?;
    Ok(Json(record))
}

async fn get_sessions(
    State(state): State<AppState>,
    Path((source, session_type)): Path<(String, String)>,
) -> Result<Json<Vec<SessionRecord>>, ApiError> {
    Ok(Json(state.service.get_sessions(&source, &session_type).await?))
}

async fn query_sessions(
    State(state): State<AppState>,
    Path((source, session_type)): Path<(String, String)>,
    Query(query): Query<FieldQuery>,
) -> Result<Json<Vec<SessionRecord>>, ApiError> {
    let field = query.field.ok_or_else(|| ApiError::missing_parameter("field"))?;
    let value = query.value.ok_or_else(|| ApiError::missing_parameter("value"))?;
    let records = state
        .service
        .get_sessions_by_query(&source, &session_type, &field, &value)
        .await?;
    Ok(Json(records))
}

async fn get_session(
    State(state): State<AppState>,
    Path((source, session_type, id)): Path<(String, String, String)>,
) -> Result<Json<SessionRecord>, ApiError> {
    Ok(Json(
        state.service.get_session(&source, &session_type, &id).await?,
    ))
}

async fn update_session(
    State(state): State<AppState>,
    Path((source, session_type, id)): Path<(String, String, String)>,
    Query(params): Query<UpdateParams>,
    body: String,
) -> Result<StatusCode, ApiError> {
    let operation = params
        .operation
        .as_deref()
        .map(str::parse::<OperationType>)
        .transpose()?;
    if body.trim().is_empty() {
        return Err(ApiError::empty_body());
    }
    state
        .service
        .update_session(&source, &session_type, &id, &body, operation)
        .await?;
    Ok(StatusCode::OK)
}

async fn delete_session(
    State(state): State<AppState>,
    Path((source, session_type, id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete_session(&source, &session_type, &id)
        .await?;
    Ok(StatusCode::OK)
}
