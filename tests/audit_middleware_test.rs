use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    middleware::{from_fn, from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use buildtrust_backend::{
    middleware::{audit::audit_submission, auth::AuthUser},
    models::{audit_log::AuditEvent, user::Role},
    services::audit_service::{AuditPolicy, AuditQueue, AuditRecorder, REDACTION_MARKER},
};
use serde_json::{json, Value as JsonValue};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

async fn stamp_identity(req: axum::extract::Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response.extensions_mut().insert(AuthUser {
        user_id: 42,
        email: "client@example.com".into(),
        role: Some(Role::Client),
        token: "token".into(),
    });
    response
}

fn app(policy: AuditPolicy) -> (Router, UnboundedReceiver<AuditEvent>) {
    let (queue, rx) = AuditQueue::channel();
    let recorder = AuditRecorder::new(queue, Arc::new(policy));

    let identified = Router::new()
        .route("/api/auth/me", get(|| async { Json(json!({"user": {"id": 42}})) }))
        .route_layer(from_fn(stamp_identity));

    let router = Router::new()
        .route("/api/health", get(|| async { Json(json!({"status": "ok"})) }))
        .route(
            "/api/auth/login",
            post(|Json(body): Json<JsonValue>| async move {
                Json(json!({"received": body["email"], "token": "abc"}))
            }),
        )
        .route(
            "/api/long",
            get(|| async { Json(json!({ "data": "x".repeat(2000) })) }),
        )
        .route(
            "/api/missing",
            get(|| async {
                (StatusCode::NOT_FOUND, Json(json!({"error": "Project not found"}))).into_response()
            }),
        )
        .route("/api/projects", get(|| async { Json(json!({"projects": []})) }))
        .merge(identified)
        .layer(from_fn_with_state(recorder, audit_submission));
    (router, rx)
}

fn json_post(uri: &str, body: JsonValue) -> Request<Body> {
    let payload = body.to_string();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .header(header::USER_AGENT, "audit-test")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .body(Body::from(payload))
        .unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_checks_are_never_recorded() {
    let (app, mut rx) = app(AuditPolicy::default());
    let resp = app.oneshot(get_req("/api/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn sensitive_fields_are_redacted_and_response_is_untouched() {
    let (app, mut rx) = app(AuditPolicy::default());
    let body = json!({
        "email": "someone@example.com",
        "password": "Secret!1",
        "profile": {"token": "nested-secret", "name": "Ada"}
    });
    let resp = app.oneshot(json_post("/api/auth/login", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let returned: JsonValue = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(returned, json!({"received": "someone@example.com", "token": "abc"}));

    let event = rx.try_recv().expect("event recorded");
    assert_eq!(event.route, "/api/auth/login");
    assert_eq!(event.method, "POST");
    assert_eq!(event.status_code, 200);
    let recorded = event.request_body.expect("request body captured");
    assert_eq!(recorded["password"], REDACTION_MARKER);
    assert_eq!(recorded["profile"]["token"], REDACTION_MARKER);
    assert_eq!(recorded["profile"]["name"], "Ada");
    assert_eq!(event.email.as_deref(), Some("someone@example.com"));
    assert_eq!(event.user_id, None);
    assert_eq!(event.user_agent.as_deref(), Some("audit-test"));
    assert_eq!(event.ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(
        event.response_body.as_deref(),
        Some(String::from_utf8_lossy(&bytes).as_ref())
    );
}

#[tokio::test]
async fn long_responses_are_truncated_in_the_record_only() {
    let (app, mut rx) = app(AuditPolicy::default());
    let resp = app.oneshot(get_req("/api/long")).await.unwrap();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.len() > 2000);

    let event = rx.try_recv().expect("event recorded");
    let recorded = event.response_body.expect("response captured");
    assert_eq!(recorded.chars().count(), 1000 + 3);
    assert!(recorded.ends_with("..."));
    assert!(event.request_body.is_none());
}

#[tokio::test]
async fn authenticated_identity_is_attributed() {
    let (app, mut rx) = app(AuditPolicy::default());
    let resp = app.oneshot(get_req("/api/auth/me")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let event = rx.try_recv().expect("event recorded");
    assert_eq!(event.user_id, Some(42));
    assert_eq!(event.email.as_deref(), Some("client@example.com"));
}

#[tokio::test]
async fn query_parameters_are_recorded_as_json() {
    let (app, mut rx) = app(AuditPolicy::default());
    app.oneshot(get_req("/api/projects?intent=developer-setup"))
        .await
        .unwrap();

    let event = rx.try_recv().expect("event recorded");
    assert_eq!(event.route, "/api/projects?intent=developer-setup");
    assert_eq!(
        event.request_query,
        Some(json!({"intent": "developer-setup"}))
    );
}

#[tokio::test]
async fn status_filter_limits_what_is_recorded() {
    let policy = AuditPolicy {
        status_range: Some(400..=599),
        ..AuditPolicy::default()
    };
    let (app, mut rx) = app(policy);

    app.clone().oneshot(get_req("/api/projects")).await.unwrap();
    assert!(rx.try_recv().is_err());

    let resp = app.oneshot(get_req("/api/missing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let event = rx.try_recv().expect("error exchange recorded");
    assert_eq!(event.status_code, 404);
}

#[tokio::test]
async fn sensitive_query_parameters_are_redacted() {
    let (app, mut rx) = app(AuditPolicy::default());
    let resp = app
        .oneshot(get_req("/api/projects?token=s3cr3t&password=hunter2&page=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let event = rx.try_recv().expect("event recorded");
    assert!(!event.route.contains("s3cr3t"));
    assert!(!event.route.contains("hunter2"));
    assert!(event.route.starts_with("/api/projects?"));
    assert!(event.route.contains("page=2"));
    let query = event.request_query.expect("query captured");
    assert_eq!(query["token"], REDACTION_MARKER);
    assert_eq!(query["password"], REDACTION_MARKER);
    assert_eq!(query["page"], "2");
}
