//! Zonegrid - point-in-polygon timezone resolution.
//!
//! Loads a timezone boundary dataset once, builds a latitude-banded grid
//! index over it, and answers longitude/latitude queries with IANA zone
//! names through three modes of differing speed and certainty:
//!
//! - [`TimezoneEngine::fast_timezone_at`] - best effort, may be wrong near
//!   grid cell boundaries;
//! - [`TimezoneEngine::certain_timezone_at`] - exact within polygon
//!   coverage;
//! - [`TimezoneEngine::closest_timezone_at`] - nearest-boundary fallback
//!   for offshore points, bounded by a configurable search radius.
//!
//! Store and index are immutable after construction, so one engine serves
//! any number of query threads without coordination.

pub mod engine;
pub mod geometry;
pub mod index;
pub mod models;
pub mod store;

pub use engine::{ConfigError, EngineConfig, TimezoneEngine};
pub use geometry::DistanceMetric;
pub use index::{GridConfig, SpatialIndex};
pub use models::{Coordinate, CoordinateError, TimezoneId, ZonePolygon};
pub use store::{BoundaryDataset, LoadError, PolygonStore};
