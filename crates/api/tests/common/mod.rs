//! Shared helpers for integration tests.
//!
//! Tests run the full application router (same middleware stack as
//! production) over the in-memory store, so no database is needed.
#![allow(dead_code)] // not every test binary uses every helper

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use lingochat_api::auth::{self, JwtConfig};
use lingochat_api::config::{ServerConfig, StoreBackend};
use lingochat_api::router::build_app_router;
use lingochat_api::service::ProgressService;
use lingochat_api::state::AppState;
use lingochat_store::memory::MemoryStore;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        store_backend: StoreBackend::Memory,
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// Build the full application router over a fresh in-memory store.
pub fn build_test_app() -> Router {
    let config = test_config();
    let service = ProgressService::new(Arc::new(MemoryStore::new()));

    let state = AppState {
        service,
        config: Arc::new(config.clone()),
    };

    build_app_router(state, &config)
}

/// A valid Bearer token for the given user id.
pub fn token_for(uid: &str) -> String {
    auth::generate_access_token(uid, &test_config().jwt).unwrap()
}

/// Send a GET request with a Bearer token.
pub async fn get(app: Router, path: &str, token: &str) -> Response<Body> {
    request(app, Method::GET, path, Some(token), None).await
}

/// Send a GET request without any Authorization header.
pub async fn get_unauthenticated(app: Router, path: &str) -> Response<Body> {
    request(app, Method::GET, path, None, None).await
}

/// Send a POST request with a JSON body and a Bearer token.
pub async fn post_json(
    app: Router,
    path: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    request(app, Method::POST, path, Some(token), Some(body)).await
}

/// Send a PUT request with a JSON body and a Bearer token.
pub async fn put_json(
    app: Router,
    path: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    request(app, Method::PUT, path, Some(token), Some(body)).await
}

/// Send a POST request with a JSON body and no Authorization header.
pub async fn post_json_unauthenticated(
    app: Router,
    path: &str,
    body: serde_json::Value,
) -> Response<Body> {
    request(app, Method::POST, path, None, Some(body)).await
}

async fn request(
    app: Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert a response is an error with the given status and `code` field.
pub async fn assert_error(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code);
}
