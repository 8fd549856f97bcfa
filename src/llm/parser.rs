//! Response parsing for LLM outputs.
//!
//! Extracts the SQL statement from a model reply that may be wrapped in
//! markdown fences or followed by more text.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{GeoQueryError, Result};
use crate::safety::{scanner, CandidateSql};

/// Characters of the reply echoed in a generation error.
const ERROR_PREVIEW_CHARS: usize = 50;

fn opening_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?mi)^```[a-z]*\s*").expect("valid fence regex"))
}

fn closing_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)\s*```\s*$").expect("valid fence regex"))
}

/// Removes markdown code fences, keeping their content.
pub fn strip_code_fences(reply: &str) -> String {
    let without_open = opening_fence().replace_all(reply.trim(), "");
    closing_fence().replace_all(&without_open, "").into_owned()
}

/// Extracts one SQL statement from a model reply.
///
/// Strips fences, keeps text up to the first statement terminator and trims.
/// Prose after the terminator is ignored even when it does not tokenize.
/// Fails with a generation error unless the result starts with `SELECT` or `WITH`.
pub fn extract_sql(reply: &str) -> Result<CandidateSql> {
    let stripped = strip_code_fences(reply);
    let statement = scanner::leading_statement(&stripped)
        .map_err(|_| {
            GeoQueryError::generation(format!(
                "model returned text that is not valid SQL: {}...",
                preview(&stripped)
            ))
        })?
        .trim();

    if statement.is_empty() {
        return Err(GeoQueryError::generation("model returned no SQL"));
    }

    if !scanner::starts_with_read_only_keyword(statement) {
        return Err(GeoQueryError::generation(format!(
            "model returned an invalid SQL start keyword: {}...",
            preview(statement)
        )));
    }

    Ok(CandidateSql::new(statement))
}

fn preview(text: &str) -> String {
    text.trim().chars().take(ERROR_PREVIEW_CHARS).collect()
}
