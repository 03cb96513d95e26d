// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP surface tests: header identity, error mapping and response shapes.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;

use fleetflow_core::application::search_aggregator::PagingLimits;
use fleetflow_core::application::{EngineSettings, StandardWorkflowService};
use fleetflow_core::domain::config::UploadConfig;
use fleetflow_core::infrastructure::reference::InMemoryReferenceDirectory;
use fleetflow_core::infrastructure::repositories::{InMemoryAuditLogRepository, InMemoryWorkflowRecordRepository};
use fleetflow_core::infrastructure::uploads::LocalUploadStore;
use fleetflow_core::presentation::api::{app, AppState};

fn router(upload_dir: &std::path::Path, precondition_detail: bool) -> Router {
    let service = StandardWorkflowService::new(
        Arc::new(InMemoryWorkflowRecordRepository::new()),
        Arc::new(InMemoryAuditLogRepository::new()),
        Arc::new(InMemoryReferenceDirectory::new()),
        EngineSettings { precondition_detail, paging: PagingLimits::default() },
    );
    app(AppState {
        workflow_service: Arc::new(service),
        uploads: LocalUploadStore::new(&UploadConfig {
            directory: upload_dir.to_string_lossy().into_owned(),
            public_base_url: "/uploads".to_string(),
            max_bytes: 1024,
        }),
        paging: PagingLimits::default(),
        start_time: Instant::now(),
    })
}

struct Caller {
    id: &'static str,
    role: &'static str,
    department: Option<&'static str>,
}

const REQUESTER: Caller = Caller { id: "req-1", role: "requester", department: Some("dept-ops") };
const APPROVER: Caller = Caller { id: "appr-1", role: "department_approver", department: Some("dept-ops") };
const OUTSIDER: Caller = Caller { id: "appr-9", role: "department_approver", department: Some("dept-far") };

fn request(method: Method, uri: &str, caller: Option<&Caller>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header("x-actor-id", caller.id).header("x-actor-role", caller.role).header("x-actor-name", "Tester");
        if let Some(department) = caller.department {
            builder = builder.header("x-department-id", department);
        }
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

async fn submit_booking(app: &Router) -> String {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/booking/records",
            Some(&REQUESTER),
            Some(json!({
                "purpose": "Client meeting",
                "start_at": "2030-05-01T01:00:00Z",
                "end_at": "2030-05-01T09:00:00Z"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_uptime() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), false);
    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn missing_identity_headers_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), false);

    let (status, body) = send(&app, request(Method::GET, "/api/booking/records", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let bad_role = Caller { id: "x", role: "wizard", department: None };
    let (status, _) = send(&app, request(Method::GET, "/api/booking/records", Some(&bad_role), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_domain_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), false);
    let (status, body) = send(&app, request(Method::GET, "/api/fuel/records", Some(&REQUESTER), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn submit_then_transition_returns_detail() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), false);
    let id = submit_booking(&app).await;

    let (status, body) = send(
        &app,
        request(Method::PUT, "/api/booking/transitions/approve", Some(&APPROVER), Some(json!({ "id": id }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "30");
    assert_eq!(body["status_name"], "Approved");
    assert_eq!(body["stamps"]["approver"]["actor"]["id"], "appr-1");
    assert!(body["progress"].is_array());

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/api/booking/records/{}/logs?limit=5", id), Some(&REQUESTER), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["totalPages"], 1);
    assert_eq!(body["entries"][1]["status_code"], "30");
}

#[tokio::test]
async fn precondition_failures_map_to_not_found_when_merged() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), false);
    let id = submit_booking(&app).await;

    let (status, body) = send(
        &app,
        request(Method::PUT, "/api/booking/transitions/approve", Some(&OUTSIDER), Some(json!({ "id": id }))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "precondition_failed");
}

#[tokio::test]
async fn wrong_status_maps_to_method_not_allowed_when_detailed() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), true);
    let id = submit_booking(&app).await;

    let (status, _) = send(
        &app,
        request(Method::PUT, "/api/booking/transitions/return_vehicle", Some(&REQUESTER), Some(json!({ "id": id }))),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = send(
        &app,
        request(Method::PUT, "/api/booking/transitions/approve", Some(&OUTSIDER), Some(json!({ "id": id }))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), false);

    let (status, _) = send(
        &app,
        request(Method::PUT, "/api/booking/transitions/approve", Some(&APPROVER), Some(json!({ "id": "not-a-uuid" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(Method::PUT, "/api/booking/transitions/approve", Some(&APPROVER), Some(json!({ "reason": "x" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/booking/records?startdate=2026-02-01&enddate=2026-01-01", Some(&REQUESTER), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn search_response_shape() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), false);
    submit_booking(&app).await;
    submit_booking(&app).await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/booking/records?ref_request_status_code=20&limit=1", Some(&REQUESTER), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["records"].as_array().unwrap().len(), 1);
    assert_eq!(body["records"][0]["status_name"], "Pending approval");
    assert_eq!(body["records"][0]["flags"]["can_edit"], true);

    let summary = body["summary"].as_array().unwrap();
    let pending = summary.iter().find(|s| s["code"] == "20").unwrap();
    assert_eq!(pending["count"], 2);
    assert!(body["buckets"].as_array().unwrap().iter().any(|b| b["bucket"] == "pending"));
}

#[tokio::test]
async fn delete_then_detail_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), false);
    let id = submit_booking(&app).await;
    let uri = format!("/api/booking/records/{}", id);

    let (status, body) = send(&app, request(Method::PATCH, &uri, Some(&REQUESTER), Some(json!({ "purpose": "Changed" })))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["purpose"], "Changed");

    let (status, _) = send(&app, request(Method::DELETE, &uri, Some(&REQUESTER), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, request(Method::GET, &uri, Some(&REQUESTER), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn statuses_lists_the_universe() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), false);
    let (status, body) = send(&app, request(Method::GET, "/api/license-annual/statuses", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["initial_status"], "10");
    assert_eq!(body["statuses"].as_array().unwrap().len(), 9);
    assert_eq!(body["status_param"], "ref_request_annual_driver_status_code");
}

#[tokio::test]
async fn upload_is_stored_and_served() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), false);

    let boundary = "fleetflow-boundary";
    let payload = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"receipt.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4 test\r\n--{b}--\r\n",
        b = boundary
    );
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/uploads")
        .header("x-actor-id", "req-1")
        .header("x-actor-role", "requester")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(payload))
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let file_name = body["file_name"].as_str().unwrap().to_string();
    assert!(file_name.ends_with(".pdf"));
    assert_eq!(body["url"], format!("/uploads/{}", file_name));
    assert!(dir.path().join(&file_name).exists());

    let served = app
        .clone()
        .oneshot(Request::builder().uri(format!("/uploads/{}", file_name)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(served.status(), StatusCode::OK);
    let bytes = to_bytes(served.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.4 test");
}
