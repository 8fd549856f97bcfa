//! GeoJSON output for query results.
//!
//! Turns a tabular result into display rows and a feature collection, and
//! derives a map view from the features.

mod bounds;
mod feature;
mod partition;

pub use bounds::{Bounds, MapView};
pub use feature::{Feature, FeatureCollection, Geometry, Position};
pub use partition::{detect_geometry_column, partition, GeometryError, Partitioned};
