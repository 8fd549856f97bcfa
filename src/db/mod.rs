//! Spatial store abstraction for geoquery.
//!
//! Provides a trait-based interface for running approved queries, allowing
//! the PostGIS backend to be swapped for mocks in tests.

mod mock;
mod postgres;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use postgres::PostgresStore;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::error::Result;
use crate::safety::ApprovedSql;
use async_trait::async_trait;

/// Trait defining the interface for spatial store clients.
///
/// Only gate-approved SQL can be executed.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes an approved query and returns all result rows.
    async fn execute_query(&self, sql: &ApprovedSql) -> Result<QueryResult>;
}
