//! Error types for geoquery.
//!
//! Defines the main error enum used throughout the pipeline and the mapping
//! from each error class to what callers are allowed to see.

use thiserror::Error;

/// Main error type for geoquery operations.
#[derive(Error, Debug)]
pub enum GeoQueryError {
    /// Configuration errors (missing credentials, uninitialized session, bad config file).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Candidate SQL or user input was rejected before reaching the database.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The language model replied with something that is not usable SQL.
    #[error("Generation error: {0}")]
    Generation(String),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store rejected or failed the statement.
    #[error("Execution error: {message} (SQL: {sql})")]
    Execution { message: String, sql: String },

    /// LLM API errors (rate limits, auth, timeouts, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GeoQueryError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a generation error with the given message.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an execution error carrying the store diagnostic and the failing SQL.
    pub fn execution(msg: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Execution {
            message: msg.into(),
            sql: sql.into(),
        }
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Validation(_) => "Validation Error",
            Self::Generation(_) => "Generation Error",
            Self::Connection(_) => "Connection Error",
            Self::Execution { .. } => "Execution Error",
            Self::Llm(_) => "LLM Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns a stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::Validation(_) => "validation_error",
            Self::Generation(_) => "generation_error",
            Self::Connection(_) => "connection_error",
            Self::Execution { .. } => "execution_error",
            Self::Llm(_) => "llm_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns true if the failure was caused by the request itself.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Generation(_))
    }

    /// HTTP status for this error class.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::Generation(_) => 400,
            Self::Config(_) => 503,
            Self::Connection(_) | Self::Execution { .. } | Self::Llm(_) | Self::Internal(_) => 500,
        }
    }

    /// Message safe to show to untrusted callers.
    ///
    /// Client errors echo their message. Server-side failures are reduced to a
    /// summary so store diagnostics and SQL never leave the process.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("Invalid query or data structure: {msg}"),
            Self::Generation(msg) => format!("Could not generate a usable query: {msg}"),
            Self::Config(_) => "Service is not configured correctly.".to_string(),
            Self::Connection(_) => "Database is unavailable.".to_string(),
            Self::Execution { .. } => "Database query failed.".to_string(),
            Self::Llm(_) => "Language model service failed.".to_string(),
            Self::Internal(_) => "An unexpected error occurred.".to_string(),
        }
    }
}

/// Result type alias using GeoQueryError.
pub type Result<T> = std::result::Result<T, GeoQueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = GeoQueryError::config("missing database fields: host, port");
        assert_eq!(
            err.to_string(),
            "Configuration error: missing database fields: host, port"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_display_validation() {
        let err = GeoQueryError::validation("only SELECT or WITH queries are allowed");
        assert_eq!(
            err.to_string(),
            "Validation error: only SELECT or WITH queries are allowed"
        );
        assert_eq!(err.category(), "Validation Error");
    }

    #[test]
    fn test_error_display_execution_includes_sql() {
        let err = GeoQueryError::execution(
            "relation \"planet_osm_pont\" does not exist",
            "SELECT name FROM planet_osm_pont",
        );
        let text = err.to_string();
        assert!(text.contains("does not exist"));
        assert!(text.contains("SELECT name FROM planet_osm_pont"));
        assert_eq!(err.category(), "Execution Error");
    }

    #[test]
    fn test_error_display_llm() {
        let err = GeoQueryError::llm("Rate limited. Please wait.");
        assert_eq!(err.to_string(), "LLM error: Rate limited. Please wait.");
        assert_eq!(err.category(), "LLM Error");
    }

    #[test]
    fn test_status_codes_by_class() {
        assert_eq!(GeoQueryError::validation("x").status_code(), 400);
        assert_eq!(GeoQueryError::generation("x").status_code(), 400);
        assert_eq!(GeoQueryError::config("x").status_code(), 503);
        assert_eq!(GeoQueryError::connection("x").status_code(), 500);
        assert_eq!(GeoQueryError::execution("x", "SELECT 1").status_code(), 500);
        assert_eq!(GeoQueryError::llm("x").status_code(), 500);
        assert_eq!(GeoQueryError::internal("x").status_code(), 500);
    }

    #[test]
    fn test_client_error_classes() {
        assert!(GeoQueryError::validation("x").is_client_error());
        assert!(GeoQueryError::generation("x").is_client_error());
        assert!(!GeoQueryError::execution("x", "y").is_client_error());
        assert!(!GeoQueryError::connection("x").is_client_error());
    }

    #[test]
    fn test_public_message_hides_server_detail() {
        let err = GeoQueryError::execution("password authentication failed", "SELECT secret");
        let public = err.public_message();
        assert!(!public.contains("password"));
        assert!(!public.contains("SELECT"));

        let internal = GeoQueryError::internal("index out of bounds at pipeline.rs:42");
        assert_eq!(internal.public_message(), "An unexpected error occurred.");
    }

    #[test]
    fn test_public_message_echoes_client_detail() {
        let err = GeoQueryError::validation("Query is required");
        assert!(err.public_message().contains("Query is required"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeoQueryError>();
    }
}
