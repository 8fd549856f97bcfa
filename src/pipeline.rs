//! Question-to-map pipeline.
//!
//! Runs one request through every stage: generate SQL, gate it, execute it,
//! then split the rows into a table and a feature collection.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::MapConfig;
use crate::db::{DatabaseClient, Row};
use crate::error::{GeoQueryError, Result};
use crate::geo::{self, FeatureCollection, MapView};
use crate::llm::QuerySession;
use crate::safety::SqlGate;

/// Response payload for one natural-language query.
#[derive(Debug, Clone, Serialize)]
pub struct MapResponse {
    /// The SQL that was executed.
    pub sql: String,

    /// Raw row count, before the geometry column was split off.
    pub rows_count: usize,

    /// Display headers without the geometry column.
    pub headers: Vec<String>,

    /// Display rows without the geometry column.
    pub display_rows: Vec<Row>,

    pub geojson: FeatureCollection,

    pub map_view: MapView,
}

/// Wires the session, gate and store together.
pub struct Pipeline {
    session: Arc<QuerySession>,
    store: Arc<dyn DatabaseClient>,
    gate: SqlGate,
    map: MapConfig,
}

impl Pipeline {
    /// Creates a pipeline.
    pub fn new(
        session: Arc<QuerySession>,
        store: Arc<dyn DatabaseClient>,
        gate: SqlGate,
        map: MapConfig,
    ) -> Self {
        Self {
            session,
            store,
            gate,
            map,
        }
    }

    /// Returns the query session.
    pub fn session(&self) -> &Arc<QuerySession> {
        &self.session
    }

    /// Answers one natural-language question.
    pub async fn run(&self, query: &str) -> Result<MapResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeoQueryError::validation("Query is required"));
        }

        let started = Instant::now();
        info!(query, "Processing query");

        let stage = Instant::now();
        let candidate = self.session.ask(query).await?;
        debug!(elapsed_ms = stage.elapsed().as_millis() as u64, sql = %candidate, "Generated SQL");

        let approved = self.gate.validate(candidate.as_str()).map_err(|e| {
            warn!(error = %e, sql = %candidate, "Generated SQL rejected");
            e
        })?;

        let stage = Instant::now();
        let result = self.store.execute_query(&approved).await.map_err(|e| {
            warn!(error = %e, "Query execution failed");
            e
        })?;
        debug!(
            elapsed_ms = stage.elapsed().as_millis() as u64,
            query_ms = result.execution_time.as_millis() as u64,
            rows = result.row_count,
            "Executed SQL"
        );

        let rows_count = result.rows.len();
        let partitioned = geo::partition(&result);
        let geojson = FeatureCollection::assemble(partitioned.features).with_bbox();
        let map_view = MapView::from_collection(&geojson, &self.map);

        info!(
            rows = rows_count,
            features = geojson.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query complete"
        );

        Ok(MapResponse {
            sql: approved.into_inner(),
            rows_count,
            headers: partitioned.headers,
            display_rows: partitioned.rows,
            geojson,
            map_view,
        })
    }
}
