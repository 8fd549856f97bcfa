//! Mock spatial store clients for testing.
//!
//! Provides in-memory store implementations for running the pipeline
//! without a database.

use super::{DatabaseClient, QueryResult, Value};
use crate::error::{GeoQueryError, Result};
use crate::safety::ApprovedSql;
use async_trait::async_trait;
use std::sync::Mutex;

/// A mock store that returns predefined results keyed by SQL substrings.
///
/// Queries that match no pattern get the default result, which is empty
/// unless set with [`MockDatabaseClient::with_default`].
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    results: Vec<(String, QueryResult)>,
    default_result: QueryResult,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a new mock store with no configured results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `result` for queries whose text contains `pattern` (case-insensitive).
    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.results.push((pattern.into().to_lowercase(), result));
        self
    }

    /// Sets the result for queries that match no pattern.
    pub fn with_default(mut self, result: QueryResult) -> Self {
        self.default_result = result;
        self
    }

    /// Creates a store seeded with a few Mumbai points and a park polygon.
    ///
    /// Used by `--mock-db` so the server and CLI can run without Postgres.
    pub fn with_sample_data() -> Self {
        let point_rows = |amenity: &str, places: &[(&str, f64, f64)]| {
            let rows = places
                .iter()
                .map(|(name, lon, lat)| {
                    vec![
                        Value::from(*name),
                        Value::from(amenity),
                        Value::from(format!(
                            r#"{{"type":"Point","coordinates":[{lon},{lat}]}}"#
                        )),
                    ]
                })
                .collect();
            QueryResult::from_headers(["name", "amenity", "st_asgeojson"], rows)
        };

        let parks = QueryResult::from_headers(
            ["name", "leisure", "st_asgeojson"],
            vec![vec![
                Value::from("Shivaji Park"),
                Value::from("park"),
                Value::from(
                    r#"{"type":"Polygon","coordinates":[[[72.8365,19.0266],[72.8405,19.0266],[72.8405,19.0300],[72.8365,19.0300],[72.8365,19.0266]]]}"#,
                ),
            ]],
        );

        Self::new()
            .with_result(
                "hospital",
                point_rows(
                    "hospital",
                    &[
                        ("Lilavati Hospital", 72.8295, 19.0509),
                        ("Holy Family Hospital", 72.8318, 19.0553),
                    ],
                ),
            )
            .with_result(
                "school",
                point_rows("school", &[("St. Stanislaus High School", 72.8327, 19.0478)]),
            )
            .with_result(
                "cafe",
                point_rows("cafe", &[("Candies", 72.8262, 19.0540)]),
            )
            .with_result("leisure", parks)
    }

    /// Returns every SQL statement executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &ApprovedSql) -> Result<QueryResult> {
        if let Ok(mut log) = self.executed.lock() {
            log.push(sql.as_str().to_string());
        }

        let lowered = sql.as_str().to_lowercase();
        let result = self
            .results
            .iter()
            .find(|(pattern, _)| lowered.contains(pattern.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| self.default_result.clone());

        Ok(result)
    }
}

/// A store that fails every query with an execution error.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a failing store that reports the given diagnostic.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingDatabaseClient {
    fn default() -> Self {
        Self::new("ERROR: relation \"planet_osm_nowhere\" does not exist")
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute_query(&self, sql: &ApprovedSql) -> Result<QueryResult> {
        Err(GeoQueryError::execution(self.message.clone(), sql.as_str()))
    }
}
