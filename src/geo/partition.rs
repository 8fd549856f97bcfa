//! Splits a query result into display rows and map features.
//!
//! One column may carry GeoJSON geometry. It is found by name, removed from
//! every display row, and parsed into a feature where possible. A row whose
//! geometry cannot be parsed stays in the table and is left off the map.

use serde_json::Map;
use thiserror::Error;
use tracing::{debug, warn};

use super::feature::{Feature, Geometry};
use crate::db::{QueryResult, Row, Value};

/// Header names that mark the geometry column, compared lower-cased.
const GEOMETRY_HEADERS: [&str; 3] = ["geojson", "st_asgeojson", "coordinates"];

/// Substring that marks an unaliased `ST_AsGeoJSON(...)` column.
const GEOMETRY_CALL_MARKER: &str = "st_asgeojson(";

/// Why a row's geometry value could not become a feature.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("invalid GeoJSON geometry: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("geometry value has unsupported type {0}")]
    UnsupportedValue(&'static str),
}

/// Display output plus features for one result set.
#[derive(Debug, Clone, Default)]
pub struct Partitioned {
    /// Headers without the geometry column.
    pub headers: Vec<String>,

    /// Rows without the geometry column, one per input row.
    pub rows: Vec<Row>,

    /// One feature per row with a parsable geometry.
    pub features: Vec<Feature>,
}

/// Returns the index of the first header that names a geometry column.
pub fn detect_geometry_column(headers: &[String]) -> Option<usize> {
    headers.iter().position(|header| {
        let lowered = header.to_lowercase();
        GEOMETRY_HEADERS.contains(&lowered.as_str()) || lowered.contains(GEOMETRY_CALL_MARKER)
    })
}

/// Partitions a result set into display headers, display rows and features.
pub fn partition(result: &QueryResult) -> Partitioned {
    let headers = result.headers();

    let Some(geom) = detect_geometry_column(&headers) else {
        return Partitioned {
            headers,
            rows: result.rows.clone(),
            features: Vec::new(),
        };
    };

    debug!(column = %headers[geom], "Detected geometry column");

    let mut rows = Vec::with_capacity(result.rows.len());
    let mut features = Vec::new();

    for (index, row) in result.rows.iter().enumerate() {
        match row.get(geom) {
            Some(value) if !value.is_blank() => match parse_geometry(value) {
                Ok(geometry) => features.push(Feature::new(geometry, properties(&headers, row, geom))),
                Err(e) => warn!(row = index, error = %e, "Skipping row with unusable geometry"),
            },
            _ => {}
        }

        rows.push(without_column(row, geom));
    }

    Partitioned {
        headers: headers
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != geom)
            .map(|(_, h)| h)
            .collect(),
        rows,
        features,
    }
}

/// Parses a GeoJSON geometry from a text or JSON value.
fn parse_geometry(value: &Value) -> Result<Geometry, GeometryError> {
    match value {
        Value::String(text) => Ok(serde_json::from_str(text)?),
        Value::Json(json) => Ok(serde_json::from_value(json.clone())?),
        Value::Null => Err(GeometryError::UnsupportedValue("null")),
        Value::Bool(_) => Err(GeometryError::UnsupportedValue("bool")),
        Value::Int(_) => Err(GeometryError::UnsupportedValue("integer")),
        Value::Float(_) => Err(GeometryError::UnsupportedValue("float")),
        Value::Bytes(_) => Err(GeometryError::UnsupportedValue("bytes")),
    }
}

fn properties(headers: &[String], row: &Row, geom: usize) -> Map<String, serde_json::Value> {
    headers
        .iter()
        .zip(row)
        .enumerate()
        .filter(|(i, _)| *i != geom)
        .map(|(_, (header, value))| (header.clone(), value.to_json()))
        .collect()
}

fn without_column(row: &Row, geom: usize) -> Row {
    row.iter()
        .enumerate()
        .filter(|(i, _)| *i != geom)
        .map(|(_, v)| v.clone())
        .collect()
}
