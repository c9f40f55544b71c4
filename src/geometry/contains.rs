//! Point-in-polygon containment.
//!
//! Even-odd ray cast with an inclusive boundary rule: a point exactly on a
//! ring segment or vertex counts as inside that ring. Two polygons tiling a
//! shared border therefore both claim border points, and callers resolve the
//! tie by iterating polygons in registration order, so exactly one zone is
//! reported and repeat queries agree.

use geo_types::{Coord, LineString, Polygon};

/// Whether `p` lies exactly on the segment `a`..`b`.
fn on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross != 0.0 {
        return false;
    }
    let dot = (p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y);
    let len2 = (b.x - a.x) * (b.x - a.x) + (b.y - a.y) * (b.y - a.y);
    dot >= 0.0 && dot <= len2
}

/// Whether `p` lies exactly on the boundary of a closed ring.
pub(crate) fn on_ring(ring: &LineString<f64>, p: Coord<f64>) -> bool {
    ring.0.windows(2).any(|seg| on_segment(p, seg[0], seg[1]))
}

/// Even-odd containment test against a closed ring, boundary inclusive.
///
/// The ring must repeat its first vertex at the end (`geo_types` closed
/// form); the loader guarantees this for every stored ring.
pub fn ring_contains(ring: &LineString<f64>, p: Coord<f64>) -> bool {
    let mut inside = false;
    for seg in ring.0.windows(2) {
        let (a, b) = (seg[0], seg[1]);
        if on_segment(p, a, b) {
            return true;
        }
        // Half-open in y so a crossing at a shared vertex is counted once.
        if (a.y > p.y) != (b.y > p.y) {
            let t = (p.y - a.y) / (b.y - a.y);
            let x = a.x + t * (b.x - a.x);
            if x > p.x {
                inside = !inside;
            }
        }
    }
    inside
}

/// Containment against a ring-with-holes polygon.
///
/// Inside the shell and not strictly inside any hole. A point on a hole's
/// boundary still belongs to this polygon; the enclave polygon filling the
/// hole claims it too, and registration order decides between them.
pub fn polygon_contains(polygon: &Polygon<f64>, p: Coord<f64>) -> bool {
    if !ring_contains(polygon.exterior(), p) {
        return false;
    }
    polygon
        .interiors()
        .iter()
        .all(|hole| !ring_contains(hole, p) || on_ring(hole, p))
}
