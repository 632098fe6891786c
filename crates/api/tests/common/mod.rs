#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use entistore_db::Repositories;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use entistore_api::config::ServerConfig;
use entistore_api::router::build_app_router;
use entistore_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: "memory://".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        db_max_connections: 1,
    }
}

/// Build the full application router over a fresh in-memory backend.
///
/// Clones of the returned router share the same storage, so a test can
/// issue several requests against one app.
pub fn build_test_app() -> Router {
    let config = test_config();
    let state = AppState {
        repos: Repositories::in_memory(),
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::delete(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    json_request(app, "POST", uri, body).await
}

pub async fn put_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    json_request(app, "PUT", uri, body).await
}

async fn json_request(app: &Router, method: &str, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// POST a schema and return its generated id.
pub async fn create_schema(app: &Router, body: Value) -> String {
    let response = post_json(app, "/v1/schemas", body).await;
    assert_eq!(response.status(), 201);
    let json = body_json(response).await;
    json["value"]["id"].as_str().unwrap().to_string()
}

/// POST an entity under `schema_id` and return the created entity.
pub async fn create_entity(app: &Router, schema_id: &str, body: Value) -> Value {
    let response = post_json(app, &format!("/v1/schemas/{schema_id}/entities"), body).await;
    assert_eq!(response.status(), 201);
    body_json(response).await["value"].clone()
}
