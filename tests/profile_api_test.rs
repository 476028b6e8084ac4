mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::put,
    Extension, Router,
};
use buildtrust_backend::{middleware::auth::AuthUser, models::user::Role, routes};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

fn json_request(method: &str, uri: &str, token: Option<&str>, body: JsonValue) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn sign_up(app: &Router, intent: Option<&str>, role: Option<&str>) -> String {
    let uri = match intent {
        Some(intent) => format!("/api/auth/signup?intent={}", intent),
        None => "/api/auth/signup".to_string(),
    };
    let mut body = json!({
        "email": common::unique_email("profile"),
        "password": "Secret!1",
        "name": "Member",
    });
    if let Some(role) = role {
        body["role"] = json!(role);
    }
    let resp = app
        .clone()
        .oneshot(json_request("POST", &uri, None, body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = common::json_body(resp).await;
    assert_eq!(body["user"]["setup_completed"], false);
    body["token"].as_str().expect("token").to_string()
}

#[tokio::test]
async fn non_numeric_years_experience_is_rejected() {
    let (state, _events) = common::offline_state();
    let app = Router::new()
        .route("/api/auth/me", put(routes::auth::update_profile))
        .layer(Extension(AuthUser {
            user_id: 1,
            email: "dev@example.com".into(),
            role: Some(Role::Developer),
            token: "unused".into(),
        }))
        .with_state(state);

    let req = json_request(
        "PUT",
        "/api/auth/me",
        None,
        json!({ "years_experience": "not-a-number" }),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = common::json_body(resp).await;
    assert_eq!(body["error"], "Validation error");
    assert!(body["details"].get("years_experience").is_some());
}

#[tokio::test]
async fn developer_profile_completion_flow() {
    let Some((state, _events)) = common::database_state().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let app = routes::router(state);

    let email = common::unique_email("dev");
    let req = json_request(
        "POST",
        "/api/auth/signup?intent=developer-setup",
        None,
        json!({ "email": email, "password": "Secret!1", "name": "Dev" }),
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = common::json_body(resp).await;
    assert_eq!(body["user"]["role"], "developer");
    assert_eq!(body["user"]["setup_completed"], false);
    let token = body["token"].as_str().expect("token").to_string();

    // Partial profile: still incomplete.
    let req = json_request(
        "PUT",
        "/api/auth/me",
        Some(&token),
        json!({ "name": "Dev", "bio": "Builds things", "years_experience": 0 }),
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = common::json_body(resp).await;
    assert_eq!(body["message"], "Profile updated successfully");
    assert_eq!(body["user"]["setup_completed"], false);
    assert_eq!(body["user"]["years_experience"], 0);
    assert_eq!(body["user"]["project_types"], "[]");

    let complete = json!({
        "name": "Dev",
        "bio": "Builds things",
        "company_type": "Contractor",
        "years_experience": "7",
        "project_types": ["Residential", "Commercial"],
        "preferred_cities": "[\"Lagos\"]",
        "budget_range": "50k-100k",
        "working_style": "Hands-on",
        "availability": "Immediately",
        "specializations": ["Roofing"],
    });
    let resp = app
        .clone()
        .oneshot(json_request("PUT", "/api/auth/me", Some(&token), complete))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = common::json_body(resp).await;
    assert_eq!(body["user"]["setup_completed"], true);
    assert_eq!(body["user"]["years_experience"], 7);
    assert_eq!(body["user"]["project_types"], "[\"Residential\",\"Commercial\"]");
    assert_eq!(body["user"]["preferred_cities"], "[\"Lagos\"]");

    // Completion is never revoked by a later, sparser update.
    let resp = app
        .clone()
        .oneshot(json_request("PUT", "/api/auth/me", Some(&token), json!({ "name": "Dev" })))
        .await
        .unwrap();
    let body = common::json_body(resp).await;
    assert_eq!(body["user"]["setup_completed"], true);

    let req = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = common::json_body(resp).await;
    assert_eq!(body["user"]["email"], email);
    assert_eq!(body["user"]["setup_completed"], true);
}

#[tokio::test]
async fn force_flag_completes_an_incomplete_profile() {
    let Some((state, _events)) = common::database_state().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let app = routes::router(state);
    let token = sign_up(&app, Some("developer-setup"), None).await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/auth/me",
            Some(&token),
            json!({ "name": "Dev", "setup_completed": true }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = common::json_body(resp).await;
    assert_eq!(body["user"]["role"], "developer");
    assert_eq!(body["user"]["bio"], JsonValue::Null);
    assert_eq!(body["user"]["setup_completed"], true);
}

#[tokio::test]
async fn client_profile_completion_flow() {
    let Some((state, _events)) = common::database_state().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let app = routes::router(state);
    let token = sign_up(&app, None, Some("client")).await;

    let missing_contact = json!({
        "name": "Client",
        "phone": "+234 800 000 0000",
        "location": "Lagos",
        "bio": "Building a house",
        "preferred_contact": "   ",
    });
    let resp = app
        .clone()
        .oneshot(json_request("PUT", "/api/auth/me", Some(&token), missing_contact))
        .await
        .unwrap();
    let body = common::json_body(resp).await;
    assert_eq!(body["user"]["role"], "client");
    assert_eq!(body["user"]["setup_completed"], false);

    let complete = json!({
        "name": "Client",
        "phone": "+234 800 000 0000",
        "location": "Lagos",
        "bio": "Building a house",
        "preferred_contact": "email",
    });
    let resp = app
        .oneshot(json_request("PUT", "/api/auth/me", Some(&token), complete))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = common::json_body(resp).await;
    assert_eq!(body["user"]["setup_completed"], true);
}
