//! Pipeline tests against a live PostGIS database.
//!
//! Skipped unless DATABASE_URL is set.

use std::sync::Arc;

use geoquery::config::ConnectionConfig;
use geoquery::db::{DatabaseClient, PostgresStore};
use geoquery::error::GeoQueryError;
use geoquery::llm::MockLlmClient;
use geoquery::safety::MultiStatementPolicy;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::build_pipeline;

/// Helper to create a store for the test database.
fn get_test_store() -> Option<Arc<dyn DatabaseClient>> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    Some(Arc::new(PostgresStore::new(config)))
}

#[tokio::test]
async fn test_point_geometry_round_trip() {
    let Some(store) = get_test_store() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let llm = MockLlmClient::new().with_response(
        "test hospital",
        "```sql\nSELECT 'Test Hospital' AS name, \
         ST_AsGeoJSON(ST_SetSRID(ST_MakePoint(72.8, 19.0), 4326)) AS geojson;\n```",
    );
    let pipeline = build_pipeline(llm, store, MultiStatementPolicy::Truncate);

    let response = pipeline.run("where is the test hospital").await.unwrap();

    assert_eq!(response.headers, vec!["name"]);
    let payload = serde_json::to_value(&response).unwrap();
    assert_eq!(
        payload["geojson"]["features"][0]["geometry"],
        json!({"type": "Point", "coordinates": [72.8, 19.0]})
    );
    assert_eq!(
        payload["geojson"]["features"][0]["properties"],
        json!({"name": "Test Hospital"})
    );
}

#[tokio::test]
async fn test_tabular_query_round_trip() {
    let Some(store) = get_test_store() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let llm = MockLlmClient::new().with_response("count", "SELECT 3 AS total");
    let pipeline = build_pipeline(llm, store, MultiStatementPolicy::Truncate);

    let response = pipeline.run("count something").await.unwrap();

    assert_eq!(response.headers, vec!["total"]);
    assert_eq!(response.rows_count, 1);
    assert!(response.geojson.is_empty());
}

#[tokio::test]
async fn test_numeric_column_is_a_number() {
    let Some(store) = get_test_store() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let llm = MockLlmClient::new().with_response("area", "SELECT 1.5::numeric AS n");
    let pipeline = build_pipeline(llm, store, MultiStatementPolicy::Truncate);

    let response = pipeline.run("area of the park").await.unwrap();
    let payload = serde_json::to_value(&response).unwrap();

    assert_eq!(response.headers, vec!["n"]);
    assert_eq!(payload["display_rows"], json!([[1.5]]));
}

#[tokio::test]
async fn test_missing_relation_reports_sql() {
    let Some(store) = get_test_store() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let llm = MockLlmClient::new()
        .with_response("missing", "SELECT name FROM geoquery_missing_relation");
    let pipeline = build_pipeline(llm, store, MultiStatementPolicy::Truncate);

    let err = pipeline.run("missing table").await.unwrap_err();

    match err {
        GeoQueryError::Execution { sql, .. } => {
            assert_eq!(sql, "SELECT name FROM geoquery_missing_relation");
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}
