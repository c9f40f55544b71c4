//! Immutable polygon storage keyed by timezone.
//!
//! Built once from a [`BoundaryDataset`] during initialization; read-only
//! afterwards, so any number of query threads may share it without
//! coordination.

mod dataset;

pub use dataset::{BoundaryDataset, PolygonRecord};

use std::path::Path;

use geo_types::{Coord, LineString, Polygon};
use hashbrown::{HashMap, HashSet};
use thiserror::Error;
use tracing::info;

use crate::geometry::ring_contains;
use crate::models::{TimezoneId, ZonePolygon, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Index of a polygon in the store's registration order.
pub type PolygonId = u32;

/// Fatal dataset problems found while loading. None are recoverable by the
/// engine; initialization aborts.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read boundary dataset")]
    Io(#[from] std::io::Error),

    #[error("failed to parse boundary dataset")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate timezone id `{0}` in dataset")]
    DuplicateZone(String),

    #[error("polygon {polygon} references unknown timezone index {zone}")]
    UnknownZone { polygon: usize, zone: u32 },

    #[error("{ring} of polygon {polygon} ({zone}) has fewer than 3 distinct vertices")]
    RingTooShort {
        polygon: usize,
        zone: String,
        ring: String,
    },

    #[error("hole {hole} of polygon {polygon} ({zone}) lies outside its shell")]
    HoleOutsideShell {
        polygon: usize,
        zone: String,
        hole: usize,
    },

    #[error("polygon {polygon} ({zone}) has an out-of-range or non-finite vertex ({lon}, {lat})")]
    InvalidVertex {
        polygon: usize,
        zone: String,
        lon: f64,
        lat: f64,
    },
}

/// All loaded polygons, in dataset order, with per-zone lookup.
#[derive(Debug)]
pub struct PolygonStore {
    polygons: Vec<ZonePolygon>,
    zones: Vec<TimezoneId>,
    by_zone: HashMap<TimezoneId, Vec<PolygonId>>,
}

impl PolygonStore {
    /// Validate a parsed dataset and build the store.
    pub fn from_dataset(dataset: BoundaryDataset) -> Result<Self, LoadError> {
        let mut zones = Vec::with_capacity(dataset.timezones.len());
        let mut seen = HashSet::new();
        for name in &dataset.timezones {
            if !seen.insert(name.as_str()) {
                return Err(LoadError::DuplicateZone(name.clone()));
            }
            zones.push(TimezoneId::new(name.as_str()));
        }

        let mut polygons = Vec::with_capacity(dataset.polygons.len());
        let mut by_zone: HashMap<TimezoneId, Vec<PolygonId>> = HashMap::new();

        for (i, record) in dataset.polygons.iter().enumerate() {
            let zone = zones
                .get(record.zone as usize)
                .ok_or(LoadError::UnknownZone {
                    polygon: i,
                    zone: record.zone,
                })?
                .clone();

            let shell = normalize_ring(&record.shell, i, &zone, "shell")?;
            let holes = record
                .holes
                .iter()
                .enumerate()
                .map(|(h, raw)| normalize_ring(raw, i, &zone, &format!("hole {h}")))
                .collect::<Result<Vec<_>, _>>()?;

            // Polygon::new closes each ring.
            let geometry = Polygon::new(shell, holes);

            for (h, hole) in geometry.interiors().iter().enumerate() {
                let inside = hole
                    .0
                    .iter()
                    .all(|&vertex| ring_contains(geometry.exterior(), vertex));
                if !inside {
                    return Err(LoadError::HoleOutsideShell {
                        polygon: i,
                        zone: zone.as_str().to_owned(),
                        hole: h,
                    });
                }
            }

            let polygon =
                ZonePolygon::new(zone.clone(), geometry).ok_or_else(|| LoadError::RingTooShort {
                    polygon: i,
                    zone: zone.as_str().to_owned(),
                    ring: "shell".to_owned(),
                })?;

            by_zone.entry(zone).or_default().push(i as PolygonId);
            polygons.push(polygon);
        }

        info!(
            "Loaded {} polygons across {} timezones",
            polygons.len(),
            zones.len()
        );

        Ok(Self {
            polygons,
            zones,
            by_zone,
        })
    }

    /// Parse and load in one step.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Self::from_dataset(BoundaryDataset::from_json_str(json)?)
    }

    /// Read, parse, and load a dataset file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::from_dataset(BoundaryDataset::from_path(path)?)
    }

    /// All polygons in registration order.
    pub fn polygons(&self) -> &[ZonePolygon] {
        &self.polygons
    }

    pub fn polygon(&self, id: PolygonId) -> &ZonePolygon {
        &self.polygons[id as usize]
    }

    /// Polygons belonging to one timezone, in registration order.
    pub fn polygons_for<'a>(&'a self, zone: &str) -> impl Iterator<Item = &'a ZonePolygon> {
        self.by_zone
            .get(zone)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&id| &self.polygons[id as usize])
    }

    /// Every timezone in the dataset, in table order.
    pub fn timezone_ids(&self) -> &[TimezoneId] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// Check vertices and closure, producing an open ring (`Polygon::new`
/// re-closes it). At least 3 distinct vertices must remain once a repeated
/// closing vertex is dropped.
fn normalize_ring(
    raw: &[[f64; 2]],
    polygon: usize,
    zone: &TimezoneId,
    ring: &str,
) -> Result<LineString<f64>, LoadError> {
    for &[lon, lat] in raw {
        let in_range = (MIN_LON..=MAX_LON).contains(&lon) && (MIN_LAT..=MAX_LAT).contains(&lat);
        if !lon.is_finite() || !lat.is_finite() || !in_range {
            return Err(LoadError::InvalidVertex {
                polygon,
                zone: zone.as_str().to_owned(),
                lon,
                lat,
            });
        }
    }

    let mut coords: Vec<Coord<f64>> = raw.iter().map(|&[x, y]| Coord { x, y }).collect();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return Err(LoadError::RingTooShort {
            polygon,
            zone: zone.as_str().to_owned(),
            ring: ring.to_owned(),
        });
    }

    Ok(LineString::new(coords))
}
