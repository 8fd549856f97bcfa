//! Best-effort bounds and map view for a feature collection.
//!
//! This walks coordinates, nothing more: no projection math and no
//! antimeridian handling.

use serde::Serialize;

use super::feature::{FeatureCollection, Geometry, Position};
use crate::config::MapConfig;

/// Axis-aligned bounding box in longitude/latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    fn from_position(lon: f64, lat: f64) -> Self {
        Self {
            west: lon,
            south: lat,
            east: lon,
            north: lat,
        }
    }

    fn include(&mut self, lon: f64, lat: f64) {
        self.west = self.west.min(lon);
        self.south = self.south.min(lat);
        self.east = self.east.max(lon);
        self.north = self.north.max(lat);
    }

    /// Computes bounds over every geometry in the collection.
    ///
    /// Returns `None` when no usable position exists.
    pub fn of_collection(collection: &FeatureCollection) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for feature in &collection.features {
            visit_positions(&feature.geometry, &mut |lon, lat| match bounds.as_mut() {
                Some(b) => b.include(lon, lat),
                None => bounds = Some(Bounds::from_position(lon, lat)),
            });
        }
        bounds
    }

    /// Returns `[west, south, east, north]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Returns the centre as `[lat, lon]`.
    pub fn center(&self) -> [f64; 2] {
        [
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        ]
    }
}

/// Calls `f(lon, lat)` for every position in the geometry.
///
/// Polygon holes are skipped. Positions with fewer than two coordinates are ignored.
fn visit_positions(geometry: &Geometry, f: &mut impl FnMut(f64, f64)) {
    let mut visit = |positions: &[Position]| {
        for position in positions {
            if let [lon, lat, ..] = position.as_slice() {
                f(*lon, *lat);
            }
        }
    };

    match geometry {
        Geometry::Point { coordinates } => visit(std::slice::from_ref(coordinates)),
        Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
            visit(coordinates.as_slice())
        }
        Geometry::MultiLineString { coordinates } => {
            for line in coordinates {
                visit(line.as_slice());
            }
        }
        Geometry::Polygon { coordinates } => {
            if let Some(exterior) = coordinates.first() {
                visit(exterior.as_slice());
            }
        }
        Geometry::MultiPolygon { coordinates } => {
            for polygon in coordinates {
                if let Some(exterior) = polygon.first() {
                    visit(exterior.as_slice());
                }
            }
        }
        Geometry::GeometryCollection { geometries } => {
            for inner in geometries {
                visit_positions(inner, f);
            }
        }
    }
}

/// Where a map client should open.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    /// `[lat, lon]`.
    pub center: [f64; 2],

    pub zoom: u8,

    /// `[west, south, east, north]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[f64; 4]>,
}

impl MapView {
    /// Derives the view from the features.
    ///
    /// The centre is the first point feature, else the middle of the bounds,
    /// else the configured default.
    pub fn from_collection(collection: &FeatureCollection, config: &MapConfig) -> Self {
        let bounds = Bounds::of_collection(collection);

        let first_point = collection.features.iter().find_map(|feature| {
            match &feature.geometry {
                Geometry::Point { coordinates } => match coordinates.as_slice() {
                    [lon, lat, ..] => Some([*lat, *lon]),
                    _ => None,
                },
                _ => None,
            }
        });

        let center = first_point
            .or_else(|| bounds.map(|b| b.center()))
            .unwrap_or([config.center_lat, config.center_lon]);

        Self {
            center,
            zoom: config.zoom,
            bounds: bounds.map(|b| b.to_array()),
        }
    }
}
