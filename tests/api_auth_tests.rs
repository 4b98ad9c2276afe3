// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication, session cookie and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Sign-in issues a session cookie that authenticates later requests
//! 3. Logout clears the cookie with matching attributes
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
};
use banner_studio::config::Config;
use serde_json::json;
use tower::ServiceExt;

mod common;

fn set_cookie_headers(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = common::create_test_app();
    let response = app.send("GET", "/api/dashboard", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_garbage_token() {
    let app = common::create_test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/designs")
                .header(header::AUTHORIZATION, "Bearer not.a.jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let app = common::create_test_app();
    let response = app
        .send("GET", "/api/dashboard", Some("ada@example.com"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body["tab"], "create");
    assert_eq!(body["customization_state"], "idle");
}

#[tokio::test]
async fn test_health_is_public() {
    let app = common::create_test_app();
    let response = app.send("GET", "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_sign_in_sets_cookie_usable_for_auth() {
    let app = common::create_test_app();
    let response = app
        .send(
            "POST",
            "/auth/session",
            None,
            Some(json!({"email": "ada@example.com", "password": common::PASSWORD})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = find_cookie(&set_cookie_headers(&response), "banner_session");
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(!cookie.contains("Secure"), "local frontend: {cookie}");

    let body = common::body_json(response).await;
    assert_eq!(body["account_id"], "acct-ada@example.com");
    assert_eq!(body["refresh_token"], "rt-ada@example.com");

    let pair = cookie.split(';').next().unwrap().to_string();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        common::body_json(response).await["email"],
        "ada@example.com"
    );
}

#[tokio::test]
async fn test_cookie_secure_for_remote_frontend() {
    let mut config = Config::test_default();
    config.frontend_url = "https://banners.example.com".to_string();
    let app = common::create_test_app_with_config(config);

    let response = app
        .send(
            "POST",
            "/auth/session",
            None,
            Some(json!({"email": "ada@example.com", "password": common::PASSWORD})),
        )
        .await;
    let cookie = find_cookie(&set_cookie_headers(&response), "banner_session");
    assert!(cookie.contains("Secure"));
}

#[tokio::test]
async fn test_sign_in_rejects_bad_credentials_and_input() {
    let app = common::create_test_app();

    let response = app
        .send(
            "POST",
            "/auth/session",
            None,
            Some(json!({"email": "ada@example.com", "password": "wrong"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(common::body_json(response).await["error"], "unauthorized");

    let response = app
        .send(
            "POST",
            "/auth/session",
            None,
            Some(json!({"email": "nope", "password": common::PASSWORD})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_issues_new_session() {
    let app = common::create_test_app();
    let response = app
        .send(
            "POST",
            "/auth/refresh",
            None,
            Some(json!({"refresh_token": "rt-ada@example.com"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!set_cookie_headers(&response).is_empty());

    let response = app
        .send(
            "POST",
            "/auth/refresh",
            None,
            Some(json!({"refresh_token": "garbage"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(common::body_json(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_logout_clears_cookie_and_dashboard() {
    let app = common::create_test_app();
    app.send("GET", "/api/dashboard", Some("ada@example.com"), None)
        .await;
    assert_eq!(app.state.sessions.len(), 1);

    let token = app.token_for("ada@example.com");
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::COOKIE, format!("banner_session={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let cookie = find_cookie(&set_cookie_headers(&response), "banner_session");
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=0"));
    assert!(app.state.sessions.is_empty());
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = common::create_test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/customize")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let app = common::create_test_app();
    let response = app.send("GET", "/health", None, None).await;
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
}
