//! PostGIS spatial store implementation.
//!
//! Provides the `PostgresStore` struct that implements the `DatabaseClient`
//! trait for PostgreSQL/PostGIS databases using sqlx. Each call opens its own
//! connection and closes it before returning, on success and failure alike.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{GeoQueryError, Result};
use crate::safety::ApprovedSql;
use async_trait::async_trait;
use sqlx::postgres::types::PgHstore;
use sqlx::postgres::{PgColumn, PgConnectOptions, PgConnection, PgRow, PgSslMode};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{BigDecimal, Uuid};
use sqlx::{Column as SqlxColumn, Connection, Executor, Row as SqlxRow, Statement, TypeInfo};
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, warn};

/// Enables trigram similarity matching. Idempotent.
const ENSURE_TRGM_SQL: &str = "CREATE EXTENSION IF NOT EXISTS pg_trgm";

/// PostGIS spatial store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    config: ConnectionConfig,
}

impl PostgresStore {
    /// Creates a store for the given connection settings.
    ///
    /// Credentials are checked on each call, not here.
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    /// Returns the connection settings.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    async fn open(&self) -> Result<PgConnection> {
        let options = connect_options(&self.config)?;
        debug!(target = %self.config.display_string(), "Opening database connection");
        PgConnection::connect_with(&options)
            .await
            .map_err(|e| map_connection_error(e, &self.config))
    }
}

#[async_trait]
impl DatabaseClient for PostgresStore {
    async fn execute_query(&self, sql: &ApprovedSql) -> Result<QueryResult> {
        let mut conn = self.open().await?;

        let result = run_on_connection(&mut conn, sql).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close database connection cleanly");
        }

        result
    }
}

/// Ensures pg_trgm, then runs the query and collects every row.
async fn run_on_connection(conn: &mut PgConnection, sql: &ApprovedSql) -> Result<QueryResult> {
    sqlx::query(ENSURE_TRGM_SQL)
        .execute(&mut *conn)
        .await
        .map_err(|e| GeoQueryError::execution(format_query_error(e), ENSURE_TRGM_SQL))?;

    let start = Instant::now();

    let statement = (&mut *conn)
        .prepare(sql.as_str())
        .await
        .map_err(|e| GeoQueryError::execution(format_query_error(e), sql.as_str()))?;

    // Column metadata comes from the statement, so empty results keep their headers.
    let columns: Vec<ColumnInfo> = statement
        .columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name()))
        .collect();

    let pg_rows = statement
        .query()
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| GeoQueryError::execution(format_query_error(e), sql.as_str()))?;

    let rows: Vec<Row> = pg_rows.iter().map(convert_row).collect();
    let execution_time = start.elapsed();

    debug!(
        rows = rows.len(),
        elapsed_ms = execution_time.as_millis() as u64,
        "Query executed"
    );

    Ok(QueryResult::with_data(columns, rows).with_execution_time(execution_time))
}

/// Builds sqlx connect options, failing when any credential is missing.
fn connect_options(config: &ConnectionConfig) -> Result<PgConnectOptions> {
    config.require_complete()?;

    let (Some(host), Some(port), Some(database), Some(user), Some(password)) = (
        config.host.as_deref(),
        config.port,
        config.database.as_deref(),
        config.user.as_deref(),
        config.password.as_deref(),
    ) else {
        return Err(GeoQueryError::config(
            "Database connection details are incomplete",
        ));
    };

    let mut options = PgConnectOptions::new()
        .host(host)
        .port(port)
        .database(database)
        .username(user)
        .password(password);

    if let Some(mode) = config.sslmode.as_deref() {
        let mode = PgSslMode::from_str(mode)
            .map_err(|_| GeoQueryError::config(format!("Invalid sslmode '{mode}'")))?;
        options = options.ssl_mode(mode);
    }

    Ok(options)
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col))
        .collect()
}

/// Converts a single column value, logging any value that fails to decode.
fn convert_value(row: &PgRow, index: usize, column: &PgColumn) -> Value {
    let type_name = column.type_info().name();
    match decode_value(row, index, type_name) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                column = column.name(),
                type_name,
                error = %e,
                "Could not decode column value, showing null"
            );
            Value::Null
        }
    }
}

/// Decodes a column by its Postgres type name. NULL of any type is `Value::Null`.
fn decode_value(row: &PgRow, index: usize, type_name: &str) -> sqlx::Result<Value> {
    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)?
            .map(|v| Value::Int(i64::from(v))),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)?
            .map(|v| Value::Int(i64::from(v))),

        "INT8" | "BIGINT" => row.try_get::<Option<i64>, _>(index)?.map(Value::Int),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|v| Value::Float(f64::from(v))),

        "FLOAT8" | "DOUBLE PRECISION" => row.try_get::<Option<f64>, _>(index)?.map(Value::Float),

        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(index)?
            .map(|v| numeric_value(&v)),

        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)?
            .map(|v| Value::String(v.to_string())),

        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)?
            .map(|v| Value::String(v.to_string())),

        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),

        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(|v| Value::String(v.to_rfc3339())),

        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)?
            .map(|v| Value::String(v.to_string())),

        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)?
            .map(Value::Json),

        // osm2pgsql keeps the raw OSM tags in an hstore column
        "HSTORE" => row.try_get::<Option<PgHstore>, _>(index)?.map(|tags| {
            let object = tags
                .0
                .into_iter()
                .map(|(k, v)| (k, v.map_or(serde_json::Value::Null, serde_json::Value::String)))
                .collect();
            Value::Json(serde_json::Value::Object(object))
        }),

        "TEXT[]" | "VARCHAR[]" | "NAME[]" | "BPCHAR[]" => row
            .try_get::<Option<Vec<Option<String>>>, _>(index)?
            .map(|items| Value::Json(serde_json::json!(items))),

        "INT4[]" => row
            .try_get::<Option<Vec<Option<i32>>>, _>(index)?
            .map(|items| Value::Json(serde_json::json!(items))),

        "INT8[]" => row
            .try_get::<Option<Vec<Option<i64>>>, _>(index)?
            .map(|items| Value::Json(serde_json::json!(items))),

        "FLOAT8[]" => row
            .try_get::<Option<Vec<Option<f64>>>, _>(index)?
            .map(|items| Value::Json(serde_json::json!(items))),

        "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(index)?.map(Value::Bytes),

        // text, varchar, name and anything else that decodes as a string
        _ => row.try_get::<Option<String>, _>(index)?.map(Value::String),
    };

    Ok(value.unwrap_or(Value::Null))
}

/// NUMERIC becomes a float when it fits one, else keeps its exact text.
fn numeric_value(value: &BigDecimal) -> Value {
    let text = value.to_string();
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::String(text),
    }
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> GeoQueryError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port.unwrap_or(5432);
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        GeoQueryError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        GeoQueryError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        GeoQueryError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        GeoQueryError::connection("Server requires SSL. Set sslmode = \"require\".")
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        GeoQueryError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        GeoQueryError::connection(error.to_string())
    }
}

/// Formats a query error with Postgres detail and hint when available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }

        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::SqlGate;

    // Tests that talk to a live database are skipped unless DATABASE_URL is set.

    fn get_test_store() -> Option<PostgresStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let config = ConnectionConfig::from_connection_string(&url).ok()?;
        Some(PostgresStore::new(config))
    }

    fn approve(sql: &str) -> ApprovedSql {
        SqlGate::default().validate(sql).unwrap()
    }

    fn complete_config() -> ConnectionConfig {
        ConnectionConfig {
            host: Some("localhost".to_string()),
            port: Some(5432),
            database: Some("osm".to_string()),
            user: Some("reader".to_string()),
            password: Some("secret".to_string()),
            sslmode: None,
        }
    }

    #[test]
    fn test_connect_options_require_all_credentials() {
        let mut config = complete_config();
        config.user = None;
        config.port = None;

        let err = connect_options(&config).unwrap_err();
        assert!(matches!(err, GeoQueryError::Config(_)));
        assert!(err.to_string().contains("port, user"));
    }

    #[test]
    fn test_connect_options_accept_complete_config() {
        let options = connect_options(&complete_config()).unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_database(), Some("osm"));
        assert_eq!(options.get_username(), "reader");
    }

    #[test]
    fn test_connect_options_reject_unknown_sslmode() {
        let mut config = complete_config();
        config.sslmode = Some("sometimes".to_string());
        let err = connect_options(&config).unwrap_err();
        assert!(err.to_string().contains("Invalid sslmode"));
    }

    #[test]
    fn test_numeric_value_prefers_float() {
        let value = BigDecimal::from_str("1.50").unwrap();
        assert_eq!(numeric_value(&value), Value::Float(1.5));

        let value = BigDecimal::from_str("-0.000123").unwrap();
        assert_eq!(numeric_value(&value), Value::Float(-0.000123));
    }

    #[test]
    fn test_numeric_value_out_of_float_range_keeps_text() {
        let text = format!("1{}", "0".repeat(400));
        let value = BigDecimal::from_str(&text).unwrap();
        assert!(matches!(numeric_value(&value), Value::String(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_connecting() {
        let store = PostgresStore::new(ConnectionConfig::default());
        let err = store.execute_query(&approve("SELECT 1")).await.unwrap_err();
        assert!(matches!(err, GeoQueryError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_error() {
        let mut config = complete_config();
        config.host = Some("nonexistent.invalid.host".to_string());

        let store = PostgresStore::new(config);
        let err = store.execute_query(&approve("SELECT 1")).await.unwrap_err();
        assert!(matches!(err, GeoQueryError::Connection(_)));
    }

    #[tokio::test]
    async fn test_execute_select_query() {
        let Some(store) = get_test_store() else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let result = store
            .execute_query(&approve("SELECT 1 AS num, 'hello' AS greeting"))
            .await
            .unwrap();

        assert_eq!(result.headers(), vec!["num", "greeting"]);
        assert_eq!(result.rows, vec![vec![Value::Int(1), Value::from("hello")]]);
        assert_eq!(result.row_count, 1);
        assert!(result.execution_time > std::time::Duration::ZERO);
    }

    #[tokio::test]
    async fn test_empty_result_keeps_headers() {
        let Some(store) = get_test_store() else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let result = store
            .execute_query(&approve("SELECT 1 AS num WHERE false"))
            .await
            .unwrap();

        assert_eq!(result.headers(), vec!["num"]);
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_decodes_numeric_and_time_types() {
        let Some(store) = get_test_store() else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let sql = "SELECT 1.5::numeric AS n, \
                   DATE '2024-03-01' AS d, \
                   TIMESTAMP '2024-03-01 10:30:00' AS ts, \
                   TIMESTAMPTZ '2024-03-01 10:30:00+00' AS tstz, \
                   'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11'::uuid AS id, \
                   ARRAY['a', NULL] AS tags, \
                   NULL::numeric AS missing";
        let result = store.execute_query(&approve(sql)).await.unwrap();

        assert_eq!(
            result.rows[0],
            vec![
                Value::Float(1.5),
                Value::from("2024-03-01"),
                Value::from("2024-03-01T10:30:00"),
                Value::from("2024-03-01T10:30:00+00:00"),
                Value::from("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11"),
                Value::Json(serde_json::json!(["a", null])),
                Value::Null,
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_query_with_error_carries_sql() {
        let Some(store) = get_test_store() else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let sql = approve("SELECT * FROM nonexistent_table_xyz");
        let err = store.execute_query(&sql).await.unwrap_err();

        match err {
            GeoQueryError::Execution { message, sql } => {
                assert!(message.contains("does not exist"));
                assert_eq!(sql, "SELECT * FROM nonexistent_table_xyz");
            }
            other => panic!("expected execution error, got {other:?}"),
        }
    }
}
