//! SQL safety gate.
//!
//! The single choke point between generated SQL and the database. Candidate
//! text is accepted only when it starts with a read-only keyword, and it is
//! reduced to one statement before it is handed to the executor.
//!
//! Statements are split with the sqlparser tokenizer. Text that does not
//! tokenize is rejected.

pub mod scanner;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GeoQueryError, Result};

/// Untrusted SQL text produced by the query generation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSql(String);

impl CandidateSql {
    /// Wraps raw generated text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the raw text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SQL that passed the gate: one statement starting with `SELECT` or `WITH`.
///
/// Only [`SqlGate::validate`] constructs this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedSql(String);

impl ApprovedSql {
    /// Returns the approved statement text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the statement text.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ApprovedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the gate does when text continues past the first statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiStatementPolicy {
    /// Keep the first statement and drop everything after its terminator.
    #[default]
    Truncate,
    /// Fail validation when another statement follows the first one.
    Reject,
}

impl MultiStatementPolicy {
    /// Returns the policy as it appears in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Truncate => "truncate",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for MultiStatementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates and normalizes candidate SQL before execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlGate {
    policy: MultiStatementPolicy,
}

impl SqlGate {
    /// Creates a gate with the given multi-statement policy.
    pub fn new(policy: MultiStatementPolicy) -> Self {
        Self { policy }
    }

    /// Returns the configured multi-statement policy.
    pub fn policy(&self) -> MultiStatementPolicy {
        self.policy
    }

    /// Validates raw SQL text and returns the approved single statement.
    ///
    /// Fails with a validation error when the text is blank, when the first
    /// statement does not start with `SELECT` or `WITH`, or, under
    /// [`MultiStatementPolicy::Reject`], when a second statement follows.
    pub fn validate(&self, raw: &str) -> Result<ApprovedSql> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(GeoQueryError::validation("SQL statement is empty"));
        }

        let first = scanner::split_first_statement(trimmed)
            .map_err(|e| GeoQueryError::validation(format!("SQL could not be tokenized: {e}")))?;
        let statement = first.statement.trim();

        if !scanner::starts_with_read_only_keyword(statement) {
            return Err(GeoQueryError::validation(
                "only SELECT or WITH queries are allowed",
            ));
        }

        if let Some(rest) = first.trailing {
            match self.policy {
                MultiStatementPolicy::Truncate => {
                    warn!(
                        dropped_len = rest.len(),
                        "Truncated SQL to its first statement"
                    );
                }
                MultiStatementPolicy::Reject => {
                    return Err(GeoQueryError::validation(
                        "multiple SQL statements are not allowed",
                    ));
                }
            }
        }

        Ok(ApprovedSql(statement.to_string()))
    }
}
