//! Query engine tying store, index, and geometry together.
//!
//! All three query modes are pure reads over state built once at
//! construction, so an engine can be shared freely across threads.

use std::fs;
use std::path::Path;

use geo_types::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::geometry::{polygon_boundary_distance, polygon_contains, DistanceMetric};
use crate::index::{GridConfig, SpatialIndex};
use crate::models::{Coordinate, CoordinateError, TimezoneId};
use crate::store::{PolygonId, PolygonStore};

/// Engine tuning knobs, loadable from a TOML file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub grid: GridConfig,

    /// Ceiling on the closest-match search window, degrees. Bounding the
    /// search in cells rather than wall-clock time keeps results
    /// deterministic.
    pub max_search_radius_deg: f64,

    pub metric: DistanceMetric,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            max_search_radius_deg: 5.0,
            metric: DistanceMetric::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let step = self.grid.lat_step_deg;
        if !step.is_finite() || step <= 0.0 || step > 45.0 {
            return Err(ConfigError::InvalidGridStep(step));
        }
        if !self.max_search_radius_deg.is_finite() || self.max_search_radius_deg < 0.0 {
            return Err(ConfigError::InvalidSearchRadius(self.max_search_radius_deg));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),

    #[error("grid latitude step {0} must be in (0, 45] degrees")]
    InvalidGridStep(f64),

    #[error("maximum search radius {0} must be a non-negative number of degrees")]
    InvalidSearchRadius(f64),
}

/// Timezone resolver over an immutable polygon store and grid index.
///
/// Three query modes trade speed against certainty; all agree for a point
/// strictly inside exactly one polygon. "No timezone here" is an ordinary
/// `Ok(None)` — most of the Earth's surface is ocean — while an illegal
/// input coordinate is an `Err`.
pub struct TimezoneEngine {
    store: PolygonStore,
    index: SpatialIndex,
    config: EngineConfig,
}

impl TimezoneEngine {
    /// Build with the default configuration.
    pub fn new(store: PolygonStore) -> Self {
        let config = EngineConfig::default();
        let index = SpatialIndex::build(&store, config.grid);
        Self {
            store,
            index,
            config,
        }
    }

    /// Build with an explicit configuration.
    pub fn with_config(store: PolygonStore, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let index = SpatialIndex::build(&store, config.grid);
        Ok(Self {
            store,
            index,
            config,
        })
    }

    /// Best-effort lookup.
    ///
    /// A cell with a single candidate answers without any geometry test, so
    /// results near cell boundaries can be wrong or spuriously empty; with
    /// several candidates this stops at the first containment hit.
    pub fn fast_timezone_at(
        &self,
        lon: f64,
        lat: f64,
    ) -> Result<Option<&TimezoneId>, CoordinateError> {
        let point: Coord<f64> = Coordinate::new(lon, lat)?.into();
        let candidates = self.index.candidates_at(lon, lat);
        if let [only] = candidates {
            return Ok(Some(&self.store.polygon(*only).zone));
        }
        Ok(self.first_containing(candidates, point))
    }

    /// Authoritative lookup within polygon coverage.
    ///
    /// Exact containment against every candidate in the point's cell, in
    /// registration order, so a boundary point shared by two zones resolves
    /// to the same single zone on every call.
    pub fn certain_timezone_at(
        &self,
        lon: f64,
        lat: f64,
    ) -> Result<Option<&TimezoneId>, CoordinateError> {
        let point: Coord<f64> = Coordinate::new(lon, lat)?.into();
        Ok(self.first_containing(self.index.candidates_at(lon, lat), point))
    }

    /// Lookup with nearest-boundary fallback for offshore points.
    ///
    /// Falls back to boundary distance when containment fails: the search
    /// window grows cell-ring by cell-ring until candidates appear or the
    /// configured radius is exhausted, then the nearest polygon's zone wins.
    pub fn closest_timezone_at(
        &self,
        lon: f64,
        lat: f64,
    ) -> Result<Option<&TimezoneId>, CoordinateError> {
        let point: Coord<f64> = Coordinate::new(lon, lat)?.into();
        if let Some(zone) = self.first_containing(self.index.candidates_at(lon, lat), point) {
            return Ok(Some(zone));
        }

        let step = self.index.lat_step_deg();
        let max_radius = self.config.max_search_radius_deg;

        let mut candidates = self.index.candidates_at(lon, lat).to_vec();
        if candidates.is_empty() {
            let rings = (max_radius / step).ceil() as u32;
            for d in 1..=rings {
                let radius = (d as f64 * step).min(max_radius);
                candidates = self.index.candidates_within(lon, lat, radius);
                if !candidates.is_empty() {
                    debug!(
                        "closest lookup at ({lon}, {lat}): {} candidates within {radius} deg",
                        candidates.len()
                    );
                    break;
                }
            }
        }
        if candidates.is_empty() {
            debug!("closest lookup at ({lon}, {lat}): nothing within {max_radius} deg");
            return Ok(None);
        }

        Ok(self.nearest_boundary(&candidates, point))
    }

    pub fn store(&self) -> &PolygonStore {
        &self.store
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// First candidate, in registration order, whose polygon contains the
    /// point. The bbox check prunes candidates dragged in by a large cell.
    fn first_containing(&self, candidates: &[PolygonId], point: Coord<f64>) -> Option<&TimezoneId> {
        candidates
            .iter()
            .map(|&id| self.store.polygon(id))
            .find(|p| p.bbox.contains(point.x, point.y) && polygon_contains(&p.geometry, point))
            .map(|p| &p.zone)
    }

    /// Zone of the candidate with minimum boundary distance; strict-less
    /// comparison keeps the first registered on ties.
    fn nearest_boundary(&self, candidates: &[PolygonId], point: Coord<f64>) -> Option<&TimezoneId> {
        let mut best: Option<(f64, PolygonId)> = None;
        for &id in candidates {
            let polygon = self.store.polygon(id);
            let distance = polygon_boundary_distance(&polygon.geometry, point, self.config.metric);
            match best {
                Some((shortest, _)) if shortest <= distance => {}
                _ => best = Some((distance, id)),
            }
        }
        best.map(|(_, id)| &self.store.polygon(id).zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Rectangular stand-ins for real zone geometry, shaped so the named
    /// test points land where the real boundaries would put them. Lesotho is
    /// modeled as a hole in the South African polygon with its own polygon
    /// filling the hole.
    fn fixture_engine() -> TimezoneEngine {
        init_tracing();
        let store = PolygonStore::from_json_str(
            r#"{
                "timezones": [
                    "America/Chicago",
                    "America/Anchorage",
                    "Africa/Johannesburg",
                    "Africa/Maseru",
                    "Asia/Seoul"
                ],
                "polygons": [
                    { "zone": 0, "shell": [[-95.0, 30.0], [-85.0, 30.0], [-85.0, 40.0], [-95.0, 40.0]] },
                    { "zone": 1, "shell": [[-155.0, 58.0], [-145.0, 58.0], [-145.0, 65.0], [-155.0, 65.0]] },
                    { "zone": 2,
                      "shell": [[16.0, -35.0], [33.0, -35.0], [33.0, -22.0], [16.0, -22.0]],
                      "holes": [[[27.0, -30.7], [29.5, -30.7], [29.5, -28.5], [27.0, -28.5]]] },
                    { "zone": 3, "shell": [[27.0, -30.7], [29.5, -30.7], [29.5, -28.5], [27.0, -28.5]] },
                    { "zone": 4, "shell": [[126.8, 34.5], [129.6, 34.5], [129.6, 38.6], [126.8, 38.6]] }
                ]
            }"#,
        )
        .unwrap();
        TimezoneEngine::new(store)
    }

    fn zone(result: Result<Option<&TimezoneId>, CoordinateError>) -> Option<String> {
        result.unwrap().map(|z| z.as_str().to_owned())
    }

    #[test]
    fn test_interior_point_all_modes_agree() {
        let engine = fixture_engine();
        // Arlington, TN
        let (lon, lat) = (-89.662186, 35.295953);
        for result in [
            engine.fast_timezone_at(lon, lat),
            engine.certain_timezone_at(lon, lat),
            engine.closest_timezone_at(lon, lat),
        ] {
            assert_eq!(zone(result), Some("America/Chicago".to_owned()));
        }
    }

    #[test]
    fn test_anchorage() {
        let engine = fixture_engine();
        assert_eq!(
            zone(engine.certain_timezone_at(-150.02, 61.17)),
            Some("America/Anchorage".to_owned())
        );
    }

    #[test]
    fn test_enclave_beats_surrounding_zone() {
        let engine = fixture_engine();
        // inside the Lesotho-shaped hole
        assert_eq!(
            zone(engine.certain_timezone_at(28.2, -29.6)),
            Some("Africa/Maseru".to_owned())
        );
        // outside the hole, still in South Africa
        assert_eq!(
            zone(engine.certain_timezone_at(20.0, -30.0)),
            Some("Africa/Johannesburg".to_owned())
        );
    }

    #[test]
    fn test_mid_ocean_is_no_match() {
        let engine = fixture_engine();
        assert_eq!(zone(engine.certain_timezone_at(-30.0, 25.0)), None);
        assert_eq!(zone(engine.closest_timezone_at(-30.0, 25.0)), None);
    }

    #[test]
    fn test_seaport_resolves_via_closest() {
        let engine = fixture_engine();
        // Inchon anchorage, just west of the fixture coastline
        let (lon, lat) = (126.6166667, 37.466666);
        assert_eq!(zone(engine.certain_timezone_at(lon, lat)), None);
        assert_eq!(
            zone(engine.closest_timezone_at(lon, lat)),
            Some("Asia/Seoul".to_owned())
        );
    }

    #[test]
    fn test_certain_is_deterministic() {
        let engine = fixture_engine();
        let first = zone(engine.certain_timezone_at(28.2, -29.6));
        for _ in 0..10 {
            assert_eq!(zone(engine.certain_timezone_at(28.2, -29.6)), first);
        }
    }

    #[test]
    fn test_shared_edge_claimed_by_exactly_one_zone() {
        init_tracing();
        let store = PolygonStore::from_json_str(
            r#"{
                "timezones": ["Zone/West", "Zone/East"],
                "polygons": [
                    { "zone": 0, "shell": [[-10.0, 0.0], [0.0, 0.0], [0.0, 10.0], [-10.0, 10.0]] },
                    { "zone": 1, "shell": [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]] }
                ]
            }"#,
        )
        .unwrap();
        let engine = TimezoneEngine::new(store);
        // both polygons claim the shared edge; registration order decides
        let first = zone(engine.certain_timezone_at(0.0, 5.0));
        assert_eq!(first, Some("Zone/West".to_owned()));
        for _ in 0..10 {
            assert_eq!(zone(engine.certain_timezone_at(0.0, 5.0)), first);
        }
    }

    #[test]
    fn test_invalid_coordinate_is_an_error_not_no_match() {
        let engine = fixture_engine();
        assert!(engine.certain_timezone_at(200.0, 10.0).is_err());
        assert!(engine.fast_timezone_at(0.0, f64::NAN).is_err());
        assert!(engine.closest_timezone_at(-190.0, 0.0).is_err());
        // a legal ocean point is Ok(None), not an error
        assert!(matches!(engine.certain_timezone_at(-30.0, 25.0), Ok(None)));
    }

    #[test]
    fn test_search_radius_ceiling() {
        let store = PolygonStore::from_json_str(
            r#"{
                "timezones": ["Atlantic/Azores"],
                "polygons": [
                    { "zone": 0, "shell": [[-31.0, 36.9], [-25.0, 36.9], [-25.0, 39.8], [-31.0, 39.8]] }
                ]
            }"#,
        )
        .unwrap();
        let config = EngineConfig {
            max_search_radius_deg: 2.0,
            ..EngineConfig::default()
        };
        let engine = TimezoneEngine::with_config(store, config).unwrap();
        // ~1.5 degrees off the fixture coast: within radius
        assert_eq!(
            zone(engine.closest_timezone_at(-23.5, 38.0)),
            Some("Atlantic/Azores".to_owned())
        );
        // ~10 degrees out: beyond the ceiling
        assert_eq!(zone(engine.closest_timezone_at(-15.0, 38.0)), None);
    }

    #[test]
    fn test_closest_prefers_nearer_zone() {
        let store = PolygonStore::from_json_str(
            r#"{
                "timezones": ["Zone/Near", "Zone/Far"],
                "polygons": [
                    { "zone": 0, "shell": [[2.0, 0.0], [4.0, 0.0], [4.0, 2.0], [2.0, 2.0]] },
                    { "zone": 1, "shell": [[6.0, 0.0], [8.0, 0.0], [8.0, 2.0], [6.0, 2.0]] }
                ]
            }"#,
        )
        .unwrap();
        let engine = TimezoneEngine::new(store);
        assert_eq!(
            zone(engine.closest_timezone_at(0.5, 1.0)),
            Some("Zone/Near".to_owned())
        );
        assert_eq!(
            zone(engine.closest_timezone_at(9.5, 1.0)),
            Some("Zone/Far".to_owned())
        );
    }

    #[test]
    fn test_fast_mode_trusts_lone_candidate() {
        let engine = fixture_engine();
        // just east of the Chicago polygon but still in its grid cell: fast
        // mode trusts the lone candidate, certain mode proves the miss
        let (lon, lat) = (-84.9, 35.0);
        assert_eq!(engine.index().candidates_at(lon, lat).len(), 1);
        assert_eq!(
            zone(engine.fast_timezone_at(lon, lat)),
            Some("America/Chicago".to_owned())
        );
        assert_eq!(zone(engine.certain_timezone_at(lon, lat)), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.grid.lat_step_deg, 1.0);
        assert_eq!(config.max_search_radius_deg, 5.0);
        assert_eq!(config.metric, DistanceMetric::Haversine);
    }

    #[test]
    fn test_config_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"max_search_radius_deg = 2.5\nmetric = \"euclidean\"\n\n[grid]\nlat_step_deg = 0.5\n",
        )
        .unwrap();
        let config = EngineConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.max_search_radius_deg, 2.5);
        assert_eq!(config.metric, DistanceMetric::Euclidean);
        assert_eq!(config.grid.lat_step_deg, 0.5);
    }

    #[test]
    fn test_config_validation() {
        let store = PolygonStore::from_json_str(r#"{ "timezones": [], "polygons": [] }"#).unwrap();
        let config = EngineConfig {
            grid: GridConfig { lat_step_deg: 0.0 },
            ..EngineConfig::default()
        };
        assert!(matches!(
            TimezoneEngine::with_config(store, config),
            Err(ConfigError::InvalidGridStep(_))
        ));
    }

    #[test]
    fn test_empty_store() {
        let store = PolygonStore::from_json_str(r#"{ "timezones": [], "polygons": [] }"#).unwrap();
        let engine = TimezoneEngine::new(store);
        assert!(engine.index().is_empty());
        assert_eq!(zone(engine.certain_timezone_at(8.5, 47.4)), None);
        assert_eq!(zone(engine.closest_timezone_at(8.5, 47.4)), None);
    }
}
