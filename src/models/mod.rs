//! Core data types for the resolver.

pub mod coordinate;
pub mod zone;

pub use coordinate::{Bbox, Coordinate, CoordinateError, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
pub use zone::{TimezoneId, ZonePolygon};
