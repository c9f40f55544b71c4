//! Timezone identity and per-polygon storage types.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use geo::BoundingRect;
use geo_types::Polygon;

use super::Bbox;

/// IANA timezone name (e.g. `America/Chicago`).
///
/// Interned so the many polygons of a multi-part zone share one allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimezoneId(Arc<str>);

impl TimezoneId {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimezoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TimezoneId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TimezoneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One polygon of a timezone's territory, with its precomputed bounding box.
///
/// A zone covering exclaves owns several of these.
#[derive(Debug, Clone)]
pub struct ZonePolygon {
    pub zone: TimezoneId,
    pub geometry: Polygon<f64>,
    pub bbox: Bbox,
}

impl ZonePolygon {
    /// Build from a closed polygon; `None` if the geometry is degenerate
    /// (no bounding box).
    pub fn new(zone: TimezoneId, geometry: Polygon<f64>) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        Some(Self {
            zone,
            geometry,
            bbox: Bbox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y),
        })
    }
}
