use anyhow::{Context, Result, bail};
use geo::{Coord, LineString, MultiPolygon, Polygon, Rect};
use geojson::{Feature, GeoJson, PolygonType};
use tracing::{info, warn};

use crate::config::ZoneSource;
use crate::error::Error;
use crate::zones::polygon::{bounds, contains, in_rect};

/// A named region entities are counted against.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub name: String,
    pub polygon: MultiPolygon<f64>,
    /// Fast-rejection box, computed from the polygon itself.
    pub bbox: Option<Rect<f64>>,
}

impl Zone {
    pub fn new(name: impl Into<String>, polygon: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            bbox: bounds(&polygon),
            polygon,
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if let Some(bbox) = &self.bbox {
            if !in_rect(lon, lat, bbox) {
                return false;
            }
        }
        contains(lon, lat, &self.polygon)
    }
}

/// The zone set, in the order the zones were loaded.
///
/// Zones are not assumed to be disjoint: [`ZoneIndex::locate`] returns the
/// first zone containing a point, so load order is the tie-break.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneIndex {
    zones: Vec<Zone>,
}

impl ZoneIndex {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    /// Reads the GeoJSON FeatureCollection named by `source`.
    pub fn load(source: &ZoneSource) -> Result<Self> {
        let content = std::fs::read_to_string(&source.path)
            .with_context(|| format!("reading zones from {}", source.path.display()))?;
        let index = Self::from_geojson_str(&content, &source.property)
            .with_context(|| format!("parsing zones from {}", source.path.display()))?;

        info!(
            path = %source.path.display(),
            zones = index.len(),
            "Zones loaded"
        );
        Ok(index)
    }

    /// Builds the index from a FeatureCollection of (Multi)Polygon features.
    ///
    /// Features without a usable geometry or zone name are left out with a
    /// warning; the rest keep their document order.
    pub fn from_geojson_str(content: &str, property: &str) -> Result<Self> {
        let geojson: GeoJson = content.parse()?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            bail!("zone document is not a FeatureCollection");
        };

        let zones = collection
            .features
            .iter()
            .enumerate()
            .filter_map(|(idx, feature)| match zone_from_feature(feature, property) {
                Ok(zone) => Some(zone),
                Err(e) => {
                    warn!(feature = idx, error = %e, "Zone excluded");
                    None
                }
            })
            .collect();

        Ok(Self { zones })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// First zone, in load order, that contains the point.
    pub fn locate(&self, lon: f64, lat: f64) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.contains(lon, lat))
    }
}

fn zone_from_feature(feature: &Feature, property: &str) -> Result<Zone, Error> {
    let name = match feature.properties.as_ref().and_then(|p| p.get(property)) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Err(Error::GeometryInvalid(format!("missing `{property}` property"))),
    };

    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| Error::GeometryInvalid(format!("zone {name}: no geometry")))?;

    let polygons = match &geometry.value {
        geojson::Value::Polygon(rings) => vec![polygon(rings)],
        geojson::Value::MultiPolygon(polygons) => polygons.iter().map(polygon).collect(),
        _ => {
            return Err(Error::GeometryInvalid(format!(
                "zone {name}: geometry is not a (Multi)Polygon"
            )));
        }
    };
    let polygons = polygons
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::GeometryInvalid(format!("zone {name}: missing ring data")))?;

    Ok(Zone::new(name, MultiPolygon::new(polygons)))
}

/// `None` if the polygon has no rings or any ring is degenerate.
fn polygon(rings: &PolygonType) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    let exterior = coords_to_linestring(exterior)?;
    let interiors = interiors
        .iter()
        .map(|ring| coords_to_linestring(ring))
        .collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

/// Rejects rings with non-finite positions or fewer than three distinct vertices.
fn coords_to_linestring(positions: &[geojson::Position]) -> Option<LineString<f64>> {
    let coords = positions
        .iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    let distinct = match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if first == last => coords.len() - 1,
        _ => coords.len(),
    };
    (distinct >= 3).then(|| LineString::new(coords))
}
