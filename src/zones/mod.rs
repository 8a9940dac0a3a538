//! Named zone polygons and per-zone entity accounting.
//!
//! Zones are loaded once from a GeoJSON FeatureCollection and never change
//! afterwards; each refresh cycle rebuilds its [`ZoneCount`] from scratch.

pub mod classify;
pub mod index;
pub mod polygon;

pub use classify::{UNZONED, ZoneClassifier, ZoneCount, classify};
pub use index::{Zone, ZoneIndex};
pub use polygon::{Boundary, contains, contains_with};
