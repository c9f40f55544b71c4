//! Latitude-banded uniform grid over polygon bounding boxes.
//!
//! The world is cut into rows of fixed latitude extent; each row is cut into
//! equal longitude columns, widened toward the poles so cell ground area
//! stays comparable. Every polygon is registered in each cell its bounding
//! box overlaps, so a query reduces "all polygons on Earth" to the few ids
//! in one cell before any exact geometry runs.
//!
//! The index is a pure function of the store: rebuilding from the same store
//! yields identical per-cell lists.

use hashbrown::HashSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{MAX_LAT, MIN_LAT, MIN_LON};
use crate::store::{PolygonId, PolygonStore};

const LON_EXTENT: f64 = 360.0;

/// Grid sizing knobs.
///
/// Smaller steps shrink candidate lists but grow the index; 1 degree is a
/// workable default for worldwide timezone boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Latitude extent of one grid row, degrees.
    pub lat_step_deg: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { lat_step_deg: 1.0 }
    }
}

/// One latitude band: its own column width and per-cell candidate lists.
struct GridRow {
    lon_step: f64,
    cells: Vec<Vec<PolygonId>>,
}

impl GridRow {
    fn col(&self, lon: f64) -> usize {
        let col = ((lon - MIN_LON) / self.lon_step).floor() as isize;
        col.clamp(0, self.cells.len() as isize - 1) as usize
    }
}

/// Candidate-pruning grid built once from a [`PolygonStore`].
pub struct SpatialIndex {
    lat_step: f64,
    rows: Vec<GridRow>,
    indexed: usize,
}

impl SpatialIndex {
    /// Build the grid by registering every polygon's bounding box.
    ///
    /// Rows are independent, so they are filled in parallel. `config` must
    /// hold a positive latitude step (the engine validates before calling).
    pub fn build(store: &PolygonStore, config: GridConfig) -> Self {
        let lat_step = config.lat_step_deg;
        debug_assert!(lat_step > 0.0 && lat_step.is_finite());
        let row_count = ((MAX_LAT - MIN_LAT) / lat_step).ceil().max(1.0) as usize;

        let rows: Vec<GridRow> = (0..row_count)
            .into_par_iter()
            .map(|r| {
                let lat0 = MIN_LAT + r as f64 * lat_step;
                let lat1 = (lat0 + lat_step).min(MAX_LAT);
                let mid = (lat0 + lat1) / 2.0;

                // Widen columns by 1/cos so cell area stays comparable; a
                // polar row collapses to a single cell.
                let widened = (lat_step / mid.to_radians().cos().max(1e-3)).min(LON_EXTENT);
                let cols = ((LON_EXTENT / widened).floor() as usize).max(1);
                let lon_step = LON_EXTENT / cols as f64;

                let mut row = GridRow {
                    lon_step,
                    cells: vec![Vec::new(); cols],
                };

                for (id, polygon) in store.polygons().iter().enumerate() {
                    let bbox = &polygon.bbox;
                    if bbox.min_lat > lat1 || bbox.max_lat < lat0 {
                        continue;
                    }
                    let c0 = row.col(bbox.min_lon);
                    let c1 = row.col(bbox.max_lon);
                    for cell in &mut row.cells[c0..=c1] {
                        cell.push(id as PolygonId);
                    }
                }

                row
            })
            .collect();

        let occupied: usize = rows
            .iter()
            .flat_map(|r| &r.cells)
            .filter(|c| !c.is_empty())
            .count();
        let cell_count: usize = rows.iter().map(|r| r.cells.len()).sum();
        info!(
            "Spatial index built: {} polygons over {} rows, {}/{} cells occupied",
            store.len(),
            rows.len(),
            occupied,
            cell_count
        );

        Self {
            lat_step,
            rows,
            indexed: store.len(),
        }
    }

    fn row(&self, lat: f64) -> &GridRow {
        let r = ((lat - MIN_LAT) / self.lat_step).floor() as isize;
        let r = r.clamp(0, self.rows.len() as isize - 1) as usize;
        &self.rows[r]
    }

    /// Candidate polygon ids for the cell containing the point, ascending.
    ///
    /// An empty slice proves no polygon's bounding box covers the point;
    /// closest-match queries must widen with
    /// [`candidates_within`](Self::candidates_within) instead of giving up.
    pub fn candidates_at(&self, lon: f64, lat: f64) -> &[PolygonId] {
        let row = self.row(lat);
        &row.cells[row.col(lon)]
    }

    /// Union of candidates over every cell intersecting the ±`radius_deg`
    /// window around the point, sorted ascending. The longitude window wraps
    /// across the antimeridian; the latitude window clamps at the poles.
    pub fn candidates_within(&self, lon: f64, lat: f64, radius_deg: f64) -> Vec<PolygonId> {
        let mut out: HashSet<PolygonId> = HashSet::new();

        let r0 = (((lat - radius_deg - MIN_LAT) / self.lat_step).floor() as isize)
            .clamp(0, self.rows.len() as isize - 1) as usize;
        let r1 = (((lat + radius_deg - MIN_LAT) / self.lat_step).floor() as isize)
            .clamp(0, self.rows.len() as isize - 1) as usize;

        for row in &self.rows[r0..=r1] {
            let cols = row.cells.len() as i64;
            let c0 = ((lon - radius_deg - MIN_LON) / row.lon_step).floor() as i64;
            let c1 = ((lon + radius_deg - MIN_LON) / row.lon_step).floor() as i64;
            if c1 - c0 + 1 >= cols {
                for cell in &row.cells {
                    out.extend(cell.iter().copied());
                }
            } else {
                for c in c0..=c1 {
                    let cell = &row.cells[c.rem_euclid(cols) as usize];
                    out.extend(cell.iter().copied());
                }
            }
        }

        let mut ids: Vec<PolygonId> = out.into_iter().collect();
        ids.sort_unstable();
        ids
    }

    /// Latitude extent of one row, degrees.
    pub fn lat_step_deg(&self) -> f64 {
        self.lat_step
    }

    /// Number of polygons registered at build time.
    pub fn len(&self) -> usize {
        self.indexed
    }

    pub fn is_empty(&self) -> bool {
        self.indexed == 0
    }
}
