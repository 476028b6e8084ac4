use std::net::SocketAddr;

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Map, Value as JsonValue};

use crate::middleware::auth::AuthUser;
use crate::models::audit_log::AuditEvent;
use crate::services::audit_service::{AuditPolicy, AuditRecorder, REDACTION_MARKER};

/// Records every exchange that survives the policy filters.
///
/// Request and response bodies are buffered only when they are JSON and small
/// enough; the caller always receives exactly the bytes and status the inner
/// service produced.
pub async fn audit_submission(
    State(recorder): State<AuditRecorder>,
    req: Request,
    next: Next,
) -> Response {
    let policy = recorder.policy.as_ref();
    let raw_route = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.uri().path());
    if policy.skips_route(raw_route) {
        return next.run(req).await;
    }

    let route = redacted_route(req.uri().path(), req.uri().query(), policy);
    let method = req.method().clone();
    let user_agent = header_string(req.headers(), header::USER_AGENT.as_str());
    let ip_address = client_ip(&req);
    let request_query = req.uri().query().and_then(query_to_json).map(|mut query| {
        policy.redact(&mut query);
        query
    });

    let (req, raw_body) = match capture_request_body(req, &method, policy).await {
        Ok(captured) => captured,
        Err(()) => {
            let response = (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Failed to read request body" })),
            )
                .into_response();
            record(
                &recorder,
                AuditEvent {
                    user_id: None,
                    route,
                    method: method.to_string(),
                    status_code: response.status().as_u16(),
                    request_body: None,
                    request_query,
                    response_body: None,
                    user_agent,
                    ip_address,
                    email: None,
                },
                &method,
            );
            return response;
        }
    };

    let body_email = raw_body
        .as_ref()
        .and_then(|b| b.get("email"))
        .and_then(JsonValue::as_str)
        .map(str::to_string);
    let request_body = raw_body.map(|mut body| {
        policy.redact(&mut body);
        body
    });

    let response = next.run(req).await;
    let (response, response_body) = capture_response_body(response, policy).await;

    let identity = response.extensions().get::<AuthUser>().cloned();
    let event = AuditEvent {
        user_id: identity.as_ref().map(|u| u.user_id),
        route,
        method: method.to_string(),
        status_code: response.status().as_u16(),
        request_body,
        request_query,
        response_body,
        user_agent,
        ip_address,
        email: identity.map(|u| u.email).or(body_email),
    };
    record(&recorder, event, &method);

    response
}

fn record(recorder: &AuditRecorder, event: AuditEvent, method: &Method) {
    let status = StatusCode::from_u16(event.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if recorder.policy.records(method, status) {
        recorder.queue.enqueue(event);
    }
}

async fn capture_request_body(
    req: Request,
    method: &Method,
    policy: &AuditPolicy,
) -> Result<(Request, Option<JsonValue>), ()> {
    let wants_body = matches!(*method, Method::POST | Method::PUT | Method::PATCH);
    if !wants_body || !is_json(req.headers()) {
        return Ok((req, None));
    }
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    match declared {
        Some(len) if len <= policy.max_capture_bytes => {}
        _ => return Ok((req, None)),
    }

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, policy.max_capture_bytes).await.map_err(|e| {
        tracing::warn!(error = %e, "failed to buffer request body for audit");
    })?;
    let parsed = serde_json::from_slice::<JsonValue>(&bytes).ok();
    Ok((Request::from_parts(parts, Body::from(bytes)), parsed))
}

async fn capture_response_body(response: Response, policy: &AuditPolicy) -> (Response, Option<String>) {
    if !is_json(response.headers()) {
        return (response, None);
    }
    let fits = response
        .body()
        .size_hint()
        .exact()
        .is_some_and(|len| len as usize <= policy.max_capture_bytes);
    if !fits {
        return (response, None);
    }

    let (parts, body) = response.into_parts();
    match to_bytes(body, policy.max_capture_bytes).await {
        Ok(bytes) => {
            let captured = policy.truncate_response(&String::from_utf8_lossy(&bytes));
            (Response::from_parts(parts, Body::from(bytes)), Some(captured))
        }
        Err(e) => {
            // The body is gone at this point; say so instead of sending it truncated.
            tracing::error!(error = %e, status = %parts.status, "failed to buffer response body");
            let response = (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to read response body" })),
            )
                .into_response();
            (response, None)
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn client_ip(req: &Request) -> Option<String> {
    header_string(req.headers(), "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

/// Path plus query string with sensitive parameter values masked.
fn redacted_route(path: &str, query: Option<&str>, policy: &AuditPolicy) -> String {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return path.to_string();
    };
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if policy.is_sensitive(&key) {
            serializer.append_pair(&key, REDACTION_MARKER);
        } else {
            serializer.append_pair(&key, &value);
        }
    }
    format!("{}?{}", path, serializer.finish())
}

fn query_to_json(query: &str) -> Option<JsonValue> {
    let map: Map<String, JsonValue> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), JsonValue::String(v.into_owned())))
        .collect();
    if map.is_empty() {
        None
    } else {
        Some(JsonValue::Object(map))
    }
}
