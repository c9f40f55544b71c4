//! Distance from a point to a polygon boundary.
//!
//! Only consulted when containment fails everywhere nearby, to rank
//! candidate zones for closest-match queries.

use geo_types::{Coord, Polygon};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (spherical model).
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metric used to rank boundary distances in closest-match queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Plain degree-space distance. Cheap, increasingly distorted toward
    /// the poles.
    Euclidean,
    /// Great-circle distance in meters on a spherical Earth.
    #[default]
    Haversine,
}

impl DistanceMetric {
    fn between(self, p: Coord<f64>, q: Coord<f64>) -> f64 {
        match self {
            DistanceMetric::Euclidean => {
                let dx = p.x - q.x;
                let dy = p.y - q.y;
                (dx * dx + dy * dy).sqrt()
            }
            DistanceMetric::Haversine => haversine_distance(p, q),
        }
    }
}

/// Great-circle distance in meters between two lon/lat points.
pub fn haversine_distance(p: Coord<f64>, q: Coord<f64>) -> f64 {
    let lat1 = p.y.to_radians();
    let lat2 = q.y.to_radians();
    let dlat = (q.y - p.y).to_radians();
    let dlon = (q.x - p.x).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Nearest point on segment `a`..`b` to `p`, with longitude compressed by
/// `lon_scale` while projecting so east-west degrees weigh the same as
/// north-south ones at the query latitude.
fn nearest_on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>, lon_scale: f64) -> Coord<f64> {
    let dx = (b.x - a.x) * lon_scale;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return a;
    }
    let px = (p.x - a.x) * lon_scale;
    let py = p.y - a.y;
    let t = ((px * dx + py * dy) / len2).clamp(0.0, 1.0);
    Coord {
        x: a.x + t * (b.x - a.x),
        y: a.y + t * (b.y - a.y),
    }
}

/// Minimum distance from `point` to the outer ring of `polygon`.
///
/// Holes are not boundaries for this purpose: a point near an enclave is
/// ranked against the enclave polygon itself.
pub fn polygon_boundary_distance(
    polygon: &Polygon<f64>,
    point: Coord<f64>,
    metric: DistanceMetric,
) -> f64 {
    // The projection degenerates as cos(lat) -> 0; clamp keeps it usable
    // for pole-adjacent queries.
    let lon_scale = match metric {
        DistanceMetric::Euclidean => 1.0,
        DistanceMetric::Haversine => point.y.to_radians().cos().max(1e-6),
    };

    polygon
        .exterior()
        .0
        .windows(2)
        .map(|seg| metric.between(point, nearest_on_segment(point, seg[0], seg[1], lon_scale)))
        .fold(f64::INFINITY, f64::min)
}
