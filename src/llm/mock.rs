//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::prompt::format_user_query;
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Feature keywords the mock understands: (keyword, OSM column, OSM value).
const FEATURES: [(&str, &str, &str); 7] = [
    ("hospital", "amenity", "hospital"),
    ("school", "amenity", "school"),
    ("cafe", "amenity", "cafe"),
    ("restaurant", "amenity", "restaurant"),
    ("bank", "amenity", "bank"),
    ("pharmac", "amenity", "pharmacy"),
    ("park", "leisure", "park"),
];

/// Reply for questions the mock cannot map to a feature.
const FALLBACK_REPLY: &str = "I don't understand that question. Could you please rephrase it?";

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Used for tests and offline runs without making real API calls.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the input contains `pattern`, the mock will return `response`.
    pub fn with_response(mut self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.custom_responses.push((pattern.into(), response.into()));
        self
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        let Some((_, column, value)) = FEATURES
            .iter()
            .find(|(keyword, _, _)| input_lower.contains(keyword))
        else {
            return FALLBACK_REPLY.to_string();
        };

        match region_name(input) {
            Some(region) => region_query(column, value, &region),
            None => format!(
                "SELECT name, ST_AsGeoJSON(ST_Transform(way, 4326)) FROM planet_osm_point \
                 WHERE {column} = '{value}' LIMIT 50"
            ),
        }
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        let content = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let prefix = format_user_query("");
        content.strip_prefix(&prefix).unwrap_or(content).to_string()
    }
}

/// Returns the region named after " in ", if any.
fn region_name(input: &str) -> Option<String> {
    let idx = input.to_ascii_lowercase().rfind(" in ")?;
    let region: String = input[idx + 4..]
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .replace('\'', "''");
    (!region.is_empty()).then_some(region)
}

/// Builds the named-region query shape the system instruction asks for.
fn region_query(column: &str, value: &str, region: &str) -> String {
    format!(
        "```sql\n\
         WITH AreaCandidate AS (\n\
         SELECT ST_COLLECT(way) AS geom, 1 AS priority FROM planet_osm_polygon \
         WHERE similarity(name, '{region}') > 0.3 AND (place IS NOT NULL OR admin_level IS NOT NULL) GROUP BY priority\n\
         UNION ALL\n\
         SELECT ST_Transform(ST_Buffer(ST_Transform(way, 4326)::geography, 1000)::geometry, ST_SRID(way)) AS geom, 2 AS priority \
         FROM planet_osm_point WHERE similarity(name, '{region}') > 0.8\n\
         ), SelectedArea AS (SELECT geom FROM AreaCandidate ORDER BY priority LIMIT 1)\n\
         SELECT f.name, ST_AsGeoJSON(ST_Transform(f.way, 4326)) FROM planet_osm_point AS f \
         JOIN SelectedArea ON ST_Intersects(f.way, SelectedArea.geom) \
         WHERE f.{column} = '{value}' LIMIT 50\n\
         ```"
    )
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let input = Self::extract_user_input(messages);
        Ok(self.mock_response(&input))
    }
}
