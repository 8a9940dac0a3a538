//! Point-in-polygon testing with the even-odd rule.
//!
//! Geometry is held as `geo` types with x as longitude and y as latitude.
//! `geo`'s own `Contains` treats boundary points as outside; zones need
//! edges and holes to follow [`Boundary`], so the ring test lives here.

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon, Rect};

/// How points lying exactly on a ring edge are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Boundary {
    /// Edge points are inside the ring: inside an outer ring, and inside a
    /// hole (hence outside the polygon).
    #[default]
    Include,
    /// Edge points are outside every ring.
    Ignore,
}

/// `contains(lon, lat, polygon)` with boundary points counted as inside.
pub fn contains(lon: f64, lat: f64, polygon: &MultiPolygon<f64>) -> bool {
    contains_with(lon, lat, polygon, Boundary::Include)
}

/// A point is inside when it is inside some polygon's exterior and in none
/// of that polygon's interiors.
pub fn contains_with(lon: f64, lat: f64, polygon: &MultiPolygon<f64>, boundary: Boundary) -> bool {
    let pt = Coord { x: lon, y: lat };
    polygon.0.iter().any(|p| polygon_contains(pt, p, boundary))
}

/// Bounding rectangle used to reject far-away points before any ring test.
pub fn bounds(polygon: &MultiPolygon<f64>) -> Option<Rect<f64>> {
    polygon.bounding_rect()
}

/// Inclusive on every side, so a boundary point is never rejected.
pub fn in_rect(lon: f64, lat: f64, rect: &Rect<f64>) -> bool {
    let (min, max) = (rect.min(), rect.max());
    min.x <= lon && lon <= max.x && min.y <= lat && lat <= max.y
}

fn polygon_contains(pt: Coord<f64>, polygon: &Polygon<f64>, boundary: Boundary) -> bool {
    in_ring(pt, polygon.exterior(), boundary)
        && !polygon
            .interiors()
            .iter()
            .any(|hole| in_ring(pt, hole, boundary))
}

/// Even-odd ray casting against a single closed ring.
///
/// Each edge is first checked for the point lying on it (zero cross product
/// and within the edge's extent on both axes); otherwise a horizontal ray to
/// the right toggles `inside` for every edge it crosses.
fn in_ring(pt: Coord<f64>, ring: &LineString<f64>, boundary: Boundary) -> bool {
    let Coord { x, y } = pt;
    let mut inside = false;

    for line in ring.lines() {
        let Coord { x: xi, y: yi } = line.end;
        let Coord { x: xj, y: yj } = line.start;

        let on_boundary = y * (xi - xj) + yi * (xj - x) + yj * (x - xi) == 0.0
            && (xi - x) * (xj - x) <= 0.0
            && (yi - y) * (yj - y) <= 0.0;
        if on_boundary {
            return boundary == Boundary::Include;
        }

        let intersects = (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi;
        if intersects {
            inside = !inside;
        }
    }

    inside
}
