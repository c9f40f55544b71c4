//! Serialized boundary dataset.
//!
//! The on-disk form keeps a deduplicated timezone name table and a flat list
//! of polygon records referencing it by index:
//!
//! ```json
//! {
//!   "timezones": ["Africa/Johannesburg", "Africa/Maseru"],
//!   "polygons": [
//!     { "zone": 0, "shell": [[28.0, -25.0], ...], "holes": [[[27.0, -28.5], ...]] }
//!   ]
//! }
//! ```
//!
//! Producing this document from raw survey data is an external ingestion
//! concern; the loader here only parses and hands the records to
//! [`PolygonStore`](super::PolygonStore) for validation.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::LoadError;

/// Top-level dataset document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryDataset {
    /// Unique IANA zone names; polygons refer to these by index.
    pub timezones: Vec<String>,
    pub polygons: Vec<PolygonRecord>,
}

/// One polygon: a shell ring, optional hole rings, and its zone.
///
/// Rings are `[lon, lat]` vertex lists; the closing vertex may be repeated
/// or omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonRecord {
    /// Index into the dataset's `timezones` table.
    pub zone: u32,
    pub shell: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl BoundaryDataset {
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}
