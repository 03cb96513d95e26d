// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP API
//!
//! Axum router over [`WorkflowService`]. The acting identity arrives in
//! headers set by the upstream authenticator (`x-actor-*`); every error is
//! rendered as `{"error": <kind>, "message": <text>}`.

use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, FromRequestParts, Multipart, Path,
        Query, State,
    },
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::application::search_aggregator::{PagingLimits, SearchParams};
use crate::application::transition_executor::TransitionMetadata;
use crate::application::workflow_service::WorkflowService;
use crate::domain::actor::{ActorContext, ActorRole};
use crate::domain::error::{PreconditionCause, WorkflowError};
use crate::domain::record::{NewRecord, RecordId, RecordRevision};
use crate::domain::status::StatusDefinition;
use crate::domain::workflow::{TransitionRule, WorkflowDomain};
use crate::infrastructure::uploads::{LocalUploadStore, UploadError};

/// Multipart framing allowance on top of the configured file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub struct AppState {
    pub workflow_service: Arc<dyn WorkflowService>,
    pub uploads: LocalUploadStore,
    pub paging: PagingLimits,
    pub start_time: Instant,
}

pub fn app(state: AppState) -> Router {
    let upload_limit = usize::try_from(state.uploads.max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    let uploads_dir = ServeDir::new(state.uploads.directory());
    let public_path = state.uploads.public_path().map(str::to_string);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/uploads", post(upload_handler).layer(DefaultBodyLimit::max(upload_limit)))
        .route("/api/{domain}/records", post(submit_handler).get(search_handler))
        .route(
            "/api/{domain}/records/{id}",
            get(detail_handler).patch(revise_handler).delete(delete_handler),
        )
        .route("/api/{domain}/records/{id}/logs", get(logs_handler))
        .route("/api/{domain}/transitions/{action}", put(transition_handler))
        .route("/api/{domain}/statuses", get(statuses_handler));

    let router = match public_path {
        Some(path) => router.nest_service(&path, uploads_dir),
        None => router,
    };

    router.layer(TraceLayer::new_for_http()).with_state(Arc::new(state))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Workflow(WorkflowError),
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Empty => ApiError::BadRequest(err.to_string()),
            UploadError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            UploadError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

/// HTTP status for a workflow error.
pub fn status_for(err: &WorkflowError) -> StatusCode {
    match err {
        WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
        WorkflowError::PreconditionFailed { cause: Some(PreconditionCause::WrongStatus), .. } => {
            StatusCode::METHOD_NOT_ALLOWED
        }
        WorkflowError::PreconditionFailed { .. } => StatusCode::NOT_FOUND,
        WorkflowError::Conflict(_) => StatusCode::CONFLICT,
        WorkflowError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Workflow(err) => {
                if let WorkflowError::Persistence(e) = &err {
                    error!(error = %e, "Persistence failure while handling request");
                }
                (status_for(&err), err.kind(), err.to_string())
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "validation_error", message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::PayloadTooLarge(message) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", message),
            ApiError::Internal(message) => {
                error!(error = %message, "Internal error while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// Acting identity read from the `x-actor-*` headers.
#[derive(Debug, Clone)]
pub struct Actor(pub ActorContext);

fn header(headers: &HeaderMap, name: &str) -> ApiResult<Option<String>> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let text = String::from_utf8(value.as_bytes().to_vec())
                .map_err(|_| ApiError::BadRequest(format!("Header '{}' is not valid UTF-8", name)))?;
            let text = text.trim().to_string();
            Ok((!text.is_empty()).then_some(text))
        }
    }
}

impl Actor {
    pub fn from_headers(headers: &HeaderMap) -> ApiResult<Self> {
        let id = header(headers, "x-actor-id")?
            .ok_or_else(|| ApiError::BadRequest("Missing x-actor-id header".to_string()))?;
        let role = header(headers, "x-actor-role")?
            .ok_or_else(|| ApiError::BadRequest("Missing x-actor-role header".to_string()))?
            .parse::<ActorRole>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let name = header(headers, "x-actor-name")?.unwrap_or_else(|| id.clone());

        let mut actor = ActorContext::new(id, role, name);
        actor.department_id = header(headers, "x-department-id")?;
        actor.department_short = header(headers, "x-department-short")?;
        actor.department_full = header(headers, "x-department-full")?;
        actor.position = header(headers, "x-actor-position")?;
        actor.phone = header(headers, "x-actor-phone")?;
        actor.carpool_ids = header(headers, "x-carpool-ids")?
            .map(|csv| {
                csv.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Actor(actor))
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Actor::from_headers(&parts.headers)
    }
}

fn parse_domain(slug: &str) -> ApiResult<WorkflowDomain> {
    slug.parse::<WorkflowDomain>().map_err(|e| ApiError::NotFound(e.to_string()))
}

fn parse_record_id(raw: &str) -> ApiResult<RecordId> {
    RecordId::from_string(raw)
        .map_err(|_| ApiError::Workflow(WorkflowError::validation(format!("Invalid record id '{}'", raw))))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
    Actor(actor): Actor,
    payload: Result<Json<NewRecord>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let domain = parse_domain(&domain)?;
    let Json(details) = payload?;
    let detail = state.workflow_service.submit(domain, &actor, details).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
    Actor(actor): Actor,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let domain = parse_domain(&domain)?;
    let params = SearchParams::from_query(domain, &query)?;
    let result = state.workflow_service.search(domain, &actor, &params).await?;
    Ok(Json(result))
}

async fn detail_handler(
    State(state): State<Arc<AppState>>,
    Path((domain, id)): Path<(String, String)>,
    Actor(actor): Actor,
) -> ApiResult<impl IntoResponse> {
    let domain = parse_domain(&domain)?;
    let detail = state.workflow_service.detail(domain, parse_record_id(&id)?, &actor).await?;
    Ok(Json(detail))
}

async fn revise_handler(
    State(state): State<Arc<AppState>>,
    Path((domain, id)): Path<(String, String)>,
    Actor(actor): Actor,
    payload: Result<Json<RecordRevision>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let domain = parse_domain(&domain)?;
    let record_id = parse_record_id(&id)?;
    let Json(revision) = payload?;
    let detail = state.workflow_service.revise(domain, record_id, &actor, revision).await?;
    Ok(Json(detail))
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path((domain, id)): Path<(String, String)>,
    Actor(actor): Actor,
) -> ApiResult<StatusCode> {
    let domain = parse_domain(&domain)?;
    state.workflow_service.soft_delete(domain, parse_record_id(&id)?, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn logs_handler(
    State(state): State<Arc<AppState>>,
    Path((domain, id)): Path<(String, String)>,
    Actor(actor): Actor,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let domain = parse_domain(&domain)?;
    let record_id = parse_record_id(&id)?;
    let params = SearchParams::from_query(domain, &query)?;
    let page = state.paging.page_request(params.page, params.limit);
    let history = state.workflow_service.history(domain, record_id, &actor, page).await?;
    Ok(Json(history))
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub id: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

async fn transition_handler(
    State(state): State<Arc<AppState>>,
    Path((domain, action)): Path<(String, String)>,
    Actor(actor): Actor,
    payload: Result<Json<TransitionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let domain = parse_domain(&domain)?;
    let Json(request) = payload?;
    let record_id = parse_record_id(&request.id)?;
    let metadata = TransitionMetadata { reason: request.reason, attachments: request.attachments };
    let detail = state
        .workflow_service
        .transition(domain, &action, record_id, &actor, metadata)
        .await?;
    Ok(Json(detail))
}

#[derive(Debug, Serialize)]
struct StatusesResponse {
    domain: WorkflowDomain,
    status_param: &'static str,
    initial_status: &'static str,
    terminal_statuses: &'static [&'static str],
    statuses: &'static [StatusDefinition],
    transitions: &'static [TransitionRule],
}

async fn statuses_handler(Path(domain): Path<String>) -> ApiResult<impl IntoResponse> {
    let descriptor = parse_domain(&domain)?.descriptor();
    Ok(Json(StatusesResponse {
        domain: descriptor.domain,
        status_param: descriptor.status_param,
        initial_status: descriptor.initial_status,
        terminal_statuses: descriptor.terminal_statuses,
        statuses: descriptor.registry.definitions(),
        transitions: descriptor.transitions,
    }))
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Actor(_actor): Actor,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") && field.file_name().is_none() {
            continue;
        }
        let original_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        let stored = state.uploads.store(original_name.as_deref(), bytes).await?;
        return Ok((StatusCode::CREATED, Json(stored)));
    }
    Err(ApiError::BadRequest("Multipart body has no 'file' field".to_string()))
}
