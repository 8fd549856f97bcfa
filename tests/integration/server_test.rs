//! HTTP router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use geoquery::config::ConnectionConfig;
use geoquery::db::{MockDatabaseClient, PostgresStore};
use geoquery::llm::{MockLlmClient, Role};
use geoquery::safety::MultiStatementPolicy;
use geoquery::server::router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use super::build_pipeline;

fn mock_app() -> Router {
    let pipeline = build_pipeline(
        MockLlmClient::new(),
        Arc::new(MockDatabaseClient::with_sample_data()),
        MultiStatementPolicy::Truncate,
    );
    router(Arc::new(pipeline))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

fn post_json(body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/nl-to-map")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

#[tokio::test]
async fn test_root_welcome() {
    let request = Request::get("/").body(Body::empty()).unwrap();
    let (status, body) = send(mock_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().starts_with("Welcome"));
}

#[tokio::test]
async fn test_health() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(mock_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_nl_to_map_success() {
    let (status, body) = send(mock_app(), post_json(r#"{"query": "hospitals in Bandra"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows_count"], json!(2));
    assert_eq!(body["headers"], json!(["name", "amenity"]));
    assert_eq!(body["geojson"]["type"], json!("FeatureCollection"));
    assert_eq!(body["geojson"]["features"].as_array().unwrap().len(), 2);
    assert_eq!(body["map_view"]["center"], json!([19.0509, 72.8295]));
    assert!(body["sql"].as_str().unwrap().contains("Bandra"));
}

#[tokio::test]
async fn test_missing_query_is_400() {
    let (status, body) = send(mock_app(), post_json("{}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("validation_error"));
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Query is required"));
}

#[tokio::test]
async fn test_blank_query_is_400() {
    let (status, _) = send(mock_app(), post_json(r#"{"query": "   "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (status, body) = send(mock_app(), post_json("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("validation_error"));
}

#[tokio::test]
async fn test_unanswerable_question_is_400() {
    let (status, body) = send(mock_app(), post_json(r#"{"query": "tell me a joke"}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("generation_error"));
}

#[tokio::test]
async fn test_incomplete_database_config_is_503() {
    let pipeline = build_pipeline(
        MockLlmClient::new(),
        Arc::new(PostgresStore::new(ConnectionConfig::default())),
        MultiStatementPolicy::Truncate,
    );
    let app = router(Arc::new(pipeline));

    let (status, body) = send(app, post_json(r#"{"query": "hospitals"}"#)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], json!("configuration_error"));
    // Credential details stay out of the response.
    assert!(!body["error"]["message"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_session_reset_clears_history() {
    let pipeline = Arc::new(build_pipeline(
        MockLlmClient::new(),
        Arc::new(MockDatabaseClient::with_sample_data()),
        MultiStatementPolicy::Truncate,
    ));
    let app = router(pipeline.clone());

    let (status, _) = send(app.clone(), post_json(r#"{"query": "schools in Bandra"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pipeline.session().history().await.len(), 3);

    let request = Request::post("/session/reset").body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "reset"}));
    let history = pipeline.session().history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::System);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let request = Request::get("/health")
        .header(header::ORIGIN, "https://maps.example.com")
        .body(Body::empty())
        .unwrap();
    let response = mock_app().oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
