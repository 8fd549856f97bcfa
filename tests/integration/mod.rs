//! Integration tests for geoquery.

pub mod pipeline_test;
pub mod postgres_test;
pub mod server_test;

use std::sync::Arc;

use geoquery::config::MapConfig;
use geoquery::db::DatabaseClient;
use geoquery::llm::{LlmClient, QuerySession};
use geoquery::pipeline::Pipeline;
use geoquery::safety::{MultiStatementPolicy, SqlGate};

/// Builds a pipeline over the given model and store with default map settings.
pub fn build_pipeline(
    llm: impl LlmClient + 'static,
    store: Arc<dyn DatabaseClient>,
    policy: MultiStatementPolicy,
) -> Pipeline {
    let session = QuerySession::create(Box::new(llm), "Answer with PostGIS SQL only.", 10)
        .expect("session");
    Pipeline::new(session, store, SqlGate::new(policy), MapConfig::default())
}
