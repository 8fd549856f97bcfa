//! End-to-end pipeline tests against the mock model and store.

use std::sync::Arc;

use geoquery::db::{FailingDatabaseClient, MockDatabaseClient, QueryResult, Value};
use geoquery::error::GeoQueryError;
use geoquery::llm::{MockLlmClient, Role};
use geoquery::safety::MultiStatementPolicy;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::build_pipeline;

fn hospital_rows() -> QueryResult {
    QueryResult::from_headers(
        ["name", "amenity", "st_asgeojson"],
        vec![
            vec![
                Value::from("Test Hospital"),
                Value::from("hospital"),
                Value::from(r#"{"type":"Point","coordinates":[72.8,19.0]}"#),
            ],
            vec![
                Value::from("Unmapped Clinic"),
                Value::from("hospital"),
                Value::Null,
            ],
            vec![
                Value::from("Broken Geometry"),
                Value::from("hospital"),
                Value::from("not json"),
            ],
        ],
    )
}

#[tokio::test]
async fn test_named_region_question() {
    let store = Arc::new(MockDatabaseClient::new().with_result("hospital", hospital_rows()));
    let pipeline = build_pipeline(
        MockLlmClient::new(),
        store.clone(),
        MultiStatementPolicy::Truncate,
    );

    let response = pipeline.run("hospitals in Bandra").await.unwrap();

    assert!(response.sql.starts_with("WITH AreaCandidate AS"));
    assert!(response.sql.contains("similarity(name, 'Bandra')"));
    assert!(!response.sql.contains("```"));
    assert_eq!(store.executed(), vec![response.sql.clone()]);

    // Every row stays in the table; only parseable geometry becomes a feature.
    assert_eq!(response.rows_count, 3);
    assert_eq!(response.headers, vec!["name", "amenity"]);
    assert_eq!(response.display_rows.len(), 3);
    assert_eq!(response.geojson.len(), 1);

    let payload = serde_json::to_value(&response).unwrap();
    assert_eq!(
        payload["geojson"]["features"][0],
        json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [72.8, 19.0]},
            "properties": {"name": "Test Hospital", "amenity": "hospital"}
        })
    );
    assert_eq!(payload["geojson"]["bbox"], json!([72.8, 19.0, 72.8, 19.0]));
    assert_eq!(payload["map_view"]["center"], json!([19.0, 72.8]));
}

#[tokio::test]
async fn test_polygon_result_centers_on_bounds() {
    let store = Arc::new(MockDatabaseClient::with_sample_data());
    let pipeline = build_pipeline(MockLlmClient::new(), store, MultiStatementPolicy::Truncate);

    let response = pipeline.run("parks in Dadar").await.unwrap();

    assert_eq!(response.geojson.len(), 1);
    let bounds = response.map_view.bounds.unwrap();
    assert_eq!(bounds, [72.8365, 19.0266, 72.8405, 19.03]);
    let [lat, lon] = response.map_view.center;
    assert!((lat - 19.0283).abs() < 1e-9);
    assert!((lon - 72.8385).abs() < 1e-9);
}

#[tokio::test]
async fn test_session_keeps_history_across_requests() {
    let pipeline = build_pipeline(
        MockLlmClient::new(),
        Arc::new(MockDatabaseClient::with_sample_data()),
        MultiStatementPolicy::Truncate,
    );

    pipeline.run("schools in Bandra").await.unwrap();
    pipeline.run("now show cafes").await.unwrap();

    let history = pipeline.session().history().await;
    let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant
        ]
    );
    assert_eq!(history[3].content, "User Query: now show cafes");
}

#[tokio::test]
async fn test_unanswerable_question_is_generation_error() {
    let store = Arc::new(MockDatabaseClient::with_sample_data());
    let pipeline = build_pipeline(
        MockLlmClient::new(),
        store.clone(),
        MultiStatementPolicy::Truncate,
    );

    let err = pipeline.run("tell me a joke").await.unwrap_err();

    assert!(matches!(err, GeoQueryError::Generation(_)));
    assert_eq!(err.status_code(), 400);
    assert!(store.executed().is_empty());
}

#[tokio::test]
async fn test_write_statement_never_reaches_store() {
    let llm = MockLlmClient::new().with_response("delete", "DELETE FROM planet_osm_point");
    let store = Arc::new(MockDatabaseClient::new());
    let pipeline = build_pipeline(llm, store.clone(), MultiStatementPolicy::Truncate);

    let err = pipeline.run("delete all points").await.unwrap_err();

    assert!(err.is_client_error());
    assert!(store.executed().is_empty());
}

#[tokio::test]
async fn test_trailing_statement_is_dropped() {
    let llm = MockLlmClient::new().with_response(
        "twice",
        "```sql\nSELECT 1; SELECT 2;\n```",
    );
    let store = Arc::new(MockDatabaseClient::new());
    let pipeline = build_pipeline(llm, store.clone(), MultiStatementPolicy::Reject);

    let response = pipeline.run("select twice").await.unwrap();

    assert_eq!(response.sql, "SELECT 1");
    assert_eq!(store.executed(), vec!["SELECT 1"]);
}

#[tokio::test]
async fn test_store_failure_is_server_error() {
    let pipeline = build_pipeline(
        MockLlmClient::new(),
        Arc::new(FailingDatabaseClient::default()),
        MultiStatementPolicy::Truncate,
    );

    let err = pipeline.run("hospitals").await.unwrap_err();

    assert_eq!(err.status_code(), 500);
    assert!(err.to_string().contains("planet_osm_point"));
    assert!(!err.public_message().contains("planet_osm_point"));
}

#[tokio::test]
async fn test_empty_result() {
    let pipeline = build_pipeline(
        MockLlmClient::new(),
        Arc::new(MockDatabaseClient::new()),
        MultiStatementPolicy::Truncate,
    );

    let response = pipeline.run("banks").await.unwrap();
    let payload = serde_json::to_value(&response).unwrap();

    assert_eq!(payload["rows_count"], json!(0));
    assert_eq!(payload["display_rows"], json!([]));
    assert_eq!(
        payload["geojson"],
        json!({"type": "FeatureCollection", "features": []})
    );
}
