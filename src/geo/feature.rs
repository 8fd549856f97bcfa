//! GeoJSON feature types.
//!
//! Only the subset of GeoJSON the map payload needs: the seven geometry
//! types, features with flat properties, and the feature collection wrapper.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::bounds::Bounds;

/// A GeoJSON position: `[lon, lat]` with an optional altitude.
pub type Position = Vec<f64>;

/// A GeoJSON geometry object.
///
/// Any `type` outside these seven fails to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    /// The first ring is the exterior, the rest are holes.
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    /// Returns the GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
            Geometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }
}

/// A GeoJSON feature: one geometry plus the row's other columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct Feature {
    pub geometry: Geometry,

    /// Column name to value, in header order.
    pub properties: Map<String, JsonValue>,
}

impl Feature {
    /// Creates a feature.
    pub fn new(geometry: Geometry, properties: Map<String, JsonValue>) -> Self {
        Self {
            geometry,
            properties,
        }
    }
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,

    /// `[west, south, east, north]`, present only when some position exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

impl FeatureCollection {
    /// Wraps features into a collection. Never fails.
    pub fn assemble(features: Vec<Feature>) -> Self {
        Self {
            features,
            bbox: None,
        }
    }

    /// Attaches the bounding box of all features, if they have any positions.
    pub fn with_bbox(mut self) -> Self {
        self.bbox = Bounds::of_collection(&self).map(|b| b.to_array());
        self
    }

    /// Returns the number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true when there are no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
