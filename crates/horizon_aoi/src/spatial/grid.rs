//! Uniform grid spatial index
//!
//! A spatial hash over a bounded 3D volume. The index is rebuilt wholesale
//! from a snapshot every interval: there is no incremental insert or
//! remove, so rebuild cost stays linear in the live-object count.
//!
//! Queries take `&self` and never mutate the buckets, which is what allows
//! the interest manager to fan them out across worker threads once
//! [`GridIndex::rebuild`] has returned.

use super::query::SpatialQuery;
use super::SpatialIndexStats;
use crate::error::AoiError;
use crate::types::{Bounds, SpatialObject, Vec3};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Integer coordinate of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellCoord {
    x: u32,
    y: u32,
    z: u32,
}

/// Geometry of a built grid
#[derive(Debug, Clone, Copy)]
struct GridLayout {
    bounds: Bounds,
    cell_size: f64,
    inv_cell_size: f64,
    dims: [u32; 3],
}

impl GridLayout {
    /// Lays out cells over `bounds`, or `None` when an axis would need more
    /// than `u32::MAX` cells.
    fn new(bounds: Bounds, cell_size: f64) -> Option<Self> {
        let size = bounds.size();
        let cells_along = |extent: f64| -> Option<u32> {
            let cells = (extent / cell_size).ceil().max(1.0);
            (cells <= u32::MAX as f64).then_some(cells as u32)
        };
        Some(Self {
            bounds,
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            dims: [cells_along(size.x)?, cells_along(size.y)?, cells_along(size.z)?],
        })
    }

    /// Containing cell of `position`, clamped into the grid.
    ///
    /// Positions outside the bounds land in the nearest edge cell. The
    /// mapping is monotone per axis, so a clamped object is still found by
    /// any query whose volume contains it.
    fn cell_of(&self, position: Vec3) -> CellCoord {
        let axis = |value: f64, min: f64, dim: u32| -> u32 {
            let cell = ((value - min) * self.inv_cell_size).floor();
            cell.clamp(0.0, (dim - 1) as f64) as u32
        };
        CellCoord {
            x: axis(position.x, self.bounds.min.x, self.dims[0]),
            y: axis(position.y, self.bounds.min.y, self.dims[1]),
            z: axis(position.z, self.bounds.min.z, self.dims[2]),
        }
    }
}

/// Uniform grid over the playable volume of one zone.
///
/// # Examples
///
/// ```rust
/// use horizon_aoi::{Bounds, GridIndex, SpatialObject, Vec3};
///
/// let bounds = Bounds::new(Vec3::splat(-100.0), Vec3::splat(100.0));
/// let mut grid = GridIndex::new(bounds, 10.0, 1_000)?;
/// grid.rebuild(&[
///     SpatialObject::new(1, Vec3::new(0.0, 0.0, 0.0)),
///     SpatialObject::new(2, Vec3::new(50.0, 0.0, 0.0)),
/// ]);
///
/// let hits = grid.query_sphere(Vec3::zero(), 10.0);
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].id, 1);
/// # Ok::<(), horizon_aoi::AoiError>(())
/// ```
#[derive(Debug)]
pub struct GridIndex {
    /// `None` while no bounds are known; every query returns empty
    layout: Option<GridLayout>,
    /// Hard cap on indexed objects per rebuild
    max_objects: usize,
    /// Objects of the current snapshot
    objects: Vec<SpatialObject>,
    /// Occupied cells to indexes into `objects`
    cells: HashMap<CellCoord, Vec<u32>>,
    stats: SpatialIndexStats,
    total_queries: AtomicU64,
}

impl GridIndex {
    /// Creates an empty grid covering `bounds`.
    pub fn new(bounds: Bounds, cell_size: f64, max_objects: usize) -> Result<Self, AoiError> {
        if !bounds.is_valid() {
            return Err(AoiError::InvalidBounds(format!(
                "min {:?} / max {:?}",
                bounds.min, bounds.max
            )));
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(AoiError::InvalidCellSize(cell_size));
        }
        if max_objects == 0 {
            return Err(AoiError::ZeroCapacity);
        }

        let layout = GridLayout::new(bounds, cell_size).ok_or_else(|| {
            AoiError::InvalidBounds(format!(
                "{:?} needs more than {} cells per axis at cell size {}",
                bounds.size(),
                u32::MAX,
                cell_size
            ))
        })?;
        debug!(
            "🧱 Grid index created: {}x{}x{} cells of {} units",
            layout.dims[0], layout.dims[1], layout.dims[2], cell_size
        );

        Ok(Self {
            layout: Some(layout),
            max_objects,
            objects: Vec::with_capacity(max_objects.min(65_536)),
            cells: HashMap::new(),
            stats: SpatialIndexStats::default(),
            total_queries: AtomicU64::new(0),
        })
    }

    /// A grid that was never built because no bounds are available.
    pub fn disabled() -> Self {
        Self {
            layout: None,
            max_objects: 0,
            objects: Vec::new(),
            cells: HashMap::new(),
            stats: SpatialIndexStats::default(),
            total_queries: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.layout.is_some()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.layout.map(|layout| layout.bounds)
    }

    pub fn cell_size(&self) -> Option<f64> {
        self.layout.map(|layout| layout.cell_size)
    }

    /// Number of cells along each axis
    pub fn dimensions(&self) -> Option<[u32; 3]> {
        self.layout.map(|layout| layout.dims)
    }

    pub fn max_objects(&self) -> usize {
        self.max_objects
    }

    /// Number of objects indexed by the last rebuild
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Objects indexed by the last rebuild
    pub fn objects(&self) -> &[SpatialObject] {
        &self.objects
    }

    /// Clears all buckets and re-inserts every object of `snapshot`.
    ///
    /// Objects with id 0 are skipped silently and objects with non-finite
    /// positions with a warning. Objects past the capacity are dropped from
    /// this interval's queries with a single warning.
    pub fn rebuild(&mut self, snapshot: &[SpatialObject]) {
        let started = Instant::now();

        self.objects.clear();
        self.cells.clear();

        let Some(layout) = self.layout else {
            trace!("Skipping rebuild of a disabled grid");
            return;
        };

        let mut dropped = 0usize;
        let mut unregistered = 0usize;
        let mut non_finite = 0usize;

        for object in snapshot {
            if object.id == 0 {
                unregistered += 1;
                continue;
            }
            if !object.position.is_finite() {
                non_finite += 1;
                continue;
            }
            if self.objects.len() >= self.max_objects {
                dropped += 1;
                continue;
            }

            let index = self.objects.len() as u32;
            self.objects.push(*object);
            self.cells
                .entry(layout.cell_of(object.position))
                .or_default()
                .push(index);
        }

        if dropped > 0 {
            warn!(
                "⚠️ Grid capacity of {} objects exceeded: {} objects dropped from spatial queries",
                self.max_objects, dropped
            );
        }
        if non_finite > 0 {
            warn!(
                "⚠️ Skipped {} objects with non-finite positions during rebuild",
                non_finite
            );
        }
        if unregistered > 0 {
            debug!("Skipped {} unregistered objects during rebuild", unregistered);
        }

        self.stats.total_rebuilds += 1;
        self.stats.objects_indexed = self.objects.len();
        self.stats.objects_dropped = dropped;
        self.stats.objects_non_finite = non_finite;
        self.stats.occupied_cells = self.cells.len();
        self.stats.last_rebuild_us = started.elapsed().as_micros() as u64;
    }

    /// Objects whose Euclidean distance to `center` is at most `radius`.
    pub fn query_sphere(&self, center: Vec3, radius: f64) -> Vec<SpatialObject> {
        self.query(&SpatialQuery::sphere(center, radius))
    }

    /// Objects inside the axis-aligned box around `center`, faces included.
    pub fn query_box(&self, center: Vec3, half_extents: Vec3) -> Vec<SpatialObject> {
        self.query(&SpatialQuery::cuboid(center, half_extents))
    }

    /// Runs `query` into a fresh vector.
    pub fn query(&self, query: &SpatialQuery) -> Vec<SpatialObject> {
        let mut results = Vec::new();
        self.query_into(query, &mut results);
        results
    }

    /// Runs `query`, replacing the contents of `results`.
    ///
    /// Broad phase enumerates every cell overlapping the bounding box of the
    /// query volume; narrow phase filters candidates by exact distance or
    /// containment.
    pub fn query_into(&self, query: &SpatialQuery, results: &mut Vec<SpatialObject>) {
        results.clear();

        let Some(layout) = &self.layout else {
            return;
        };
        if self.objects.is_empty() || !query.center.is_finite() {
            return;
        }
        let Some(reach) = query.reach() else {
            return;
        };

        self.total_queries.fetch_add(1, Ordering::Relaxed);

        let lo = layout.cell_of(query.center - reach);
        let hi = layout.cell_of(query.center + reach);
        let limit = query.filters.max_results.unwrap_or(usize::MAX);

        let collect = |bucket: &[u32], results: &mut Vec<SpatialObject>| -> bool {
            for &index in bucket {
                let object = self.objects[index as usize];
                if query.filters.admits(object.id) && query.matches(object.position) {
                    results.push(object);
                    if results.len() >= limit {
                        return false;
                    }
                }
            }
            true
        };

        // Cells in the query box; `None` once it no longer fits in a u64
        let span = [hi.x - lo.x, hi.y - lo.y, hi.z - lo.z]
            .into_iter()
            .try_fold(1u64, |cells, extent| cells.checked_mul(extent as u64 + 1));

        if span.is_some_and(|span| span <= self.cells.len() as u64) {
            for x in lo.x..=hi.x {
                for y in lo.y..=hi.y {
                    for z in lo.z..=hi.z {
                        if let Some(bucket) = self.cells.get(&CellCoord { x, y, z }) {
                            if !collect(bucket, results) {
                                return;
                            }
                        }
                    }
                }
            }
        } else {
            // Query volume covers more cells than are occupied: walk occupied cells instead
            for (cell, bucket) in &self.cells {
                let inside = (lo.x..=hi.x).contains(&cell.x)
                    && (lo.y..=hi.y).contains(&cell.y)
                    && (lo.z..=hi.z).contains(&cell.z);
                if inside && !collect(bucket, results) {
                    return;
                }
            }
        }
    }

    /// Gets performance statistics
    pub fn stats(&self) -> SpatialIndexStats {
        let mut stats = self.stats.clone();
        stats.total_queries = self.total_queries.load(Ordering::Relaxed);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::QueryFilters;
    use std::collections::HashSet;

    fn grid() -> GridIndex {
        GridIndex::new(
            Bounds::new(Vec3::splat(-100.0), Vec3::splat(100.0)),
            10.0,
            1_000,
        )
        .expect("valid grid parameters")
    }

    fn ids(objects: &[SpatialObject]) -> HashSet<u32> {
        objects.iter().map(|o| o.id).collect()
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let bounds = Bounds::new(Vec3::zero(), Vec3::splat(10.0));
        assert_eq!(
            GridIndex::new(bounds, 0.0, 10).unwrap_err(),
            AoiError::InvalidCellSize(0.0)
        );
        assert_eq!(GridIndex::new(bounds, 1.0, 0).unwrap_err(), AoiError::ZeroCapacity);

        let broken = Bounds {
            min: Vec3::splat(5.0),
            max: Vec3::splat(-5.0),
        };
        assert!(matches!(
            GridIndex::new(broken, 1.0, 10),
            Err(AoiError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_sphere_query_filters_corner_cells() {
        let mut grid = grid();
        grid.rebuild(&[
            SpatialObject::new(1, Vec3::new(0.0, 0.0, 0.0)),
            // Inside the sphere's bounding box but outside the sphere
            SpatialObject::new(2, Vec3::new(9.0, 9.0, 0.0)),
            SpatialObject::new(3, Vec3::new(6.0, 0.0, 0.0)),
        ]);

        let hits = grid.query_sphere(Vec3::zero(), 10.0);
        assert_eq!(ids(&hits), HashSet::from([1, 3]));
    }

    #[test]
    fn test_boundary_is_closed() {
        let mut grid = grid();
        grid.rebuild(&[
            SpatialObject::new(1, Vec3::new(10.0, 0.0, 0.0)),
            SpatialObject::new(2, Vec3::new(10.0 + 1e-9, 0.0, 0.0)),
            SpatialObject::new(3, Vec3::new(0.0, 5.0, -5.0)),
        ]);

        assert_eq!(ids(&grid.query_sphere(Vec3::zero(), 10.0)), HashSet::from([1, 3]));
        assert_eq!(
            ids(&grid.query_box(Vec3::zero(), Vec3::new(10.0, 5.0, 5.0))),
            HashSet::from([1, 3])
        );
    }

    #[test]
    fn test_out_of_bounds_positions_are_clamped() {
        let mut grid = grid();
        grid.rebuild(&[
            SpatialObject::new(1, Vec3::new(250.0, 0.0, 0.0)),
            SpatialObject::new(2, Vec3::new(-400.0, -400.0, -400.0)),
        ]);
        assert_eq!(grid.object_count(), 2);

        assert_eq!(ids(&grid.query_sphere(Vec3::new(245.0, 0.0, 0.0), 6.0)), HashSet::from([1]));
        assert!(grid.query_sphere(Vec3::new(99.0, 0.0, 0.0), 5.0).is_empty());
        assert_eq!(
            ids(&grid.query_box(Vec3::splat(-400.0), Vec3::splat(1.0))),
            HashSet::from([2])
        );
    }

    #[test]
    fn test_disabled_grid_returns_empty() {
        let mut grid = GridIndex::disabled();
        grid.rebuild(&[SpatialObject::new(1, Vec3::zero())]);

        assert!(!grid.is_enabled());
        assert!(grid.query_sphere(Vec3::zero(), 1_000.0).is_empty());
        assert!(grid.query_box(Vec3::zero(), Vec3::splat(1_000.0)).is_empty());
        assert_eq!(grid.object_count(), 0);
    }

    #[test]
    fn test_capacity_overflow_drops_objects() {
        let mut grid = GridIndex::new(Bounds::new(Vec3::zero(), Vec3::splat(10.0)), 1.0, 2)
            .expect("valid grid parameters");
        grid.rebuild(&[
            SpatialObject::new(1, Vec3::splat(1.0)),
            SpatialObject::new(2, Vec3::splat(2.0)),
            SpatialObject::new(3, Vec3::splat(3.0)),
        ]);

        assert_eq!(grid.object_count(), 2);
        assert_eq!(grid.stats().objects_dropped, 1);
        assert_eq!(ids(&grid.query_sphere(Vec3::splat(2.0), 100.0)), HashSet::from([1, 2]));
    }

    #[test]
    fn test_skips_unregistered_and_non_finite_objects() {
        let mut grid = grid();
        grid.rebuild(&[
            SpatialObject::new(0, Vec3::zero()),
            SpatialObject::new(1, Vec3::new(f64::NAN, 0.0, 0.0)),
            SpatialObject::new(2, Vec3::new(1.0, 0.0, 0.0)),
        ]);
        assert_eq!(ids(grid.objects()), HashSet::from([2]));

        let stats = grid.stats();
        assert_eq!(stats.objects_indexed, 1);
        assert_eq!(stats.objects_non_finite, 1);
        assert_eq!(stats.objects_dropped, 0);

        grid.rebuild(&[
            SpatialObject::new(3, Vec3::new(0.0, f64::INFINITY, 0.0)),
            SpatialObject::new(4, Vec3::new(0.0, 0.0, f64::NEG_INFINITY)),
            SpatialObject::new(0, Vec3::new(f64::NAN, 0.0, 0.0)),
        ]);
        assert_eq!(grid.object_count(), 0);
        assert_eq!(grid.stats().objects_non_finite, 2);
    }

    #[test]
    fn test_world_sized_query_on_fine_grid() {
        // 1e7 cells per axis: the query box spans ~1e21 cells
        let mut grid = GridIndex::new(Bounds::new(Vec3::splat(-5e6), Vec3::splat(5e6)), 1.0, 16)
            .expect("valid grid parameters");
        assert_eq!(grid.dimensions(), Some([10_000_000; 3]));
        grid.rebuild(&[
            SpatialObject::new(1, Vec3::zero()),
            SpatialObject::new(2, Vec3::splat(4e6)),
        ]);

        assert_eq!(ids(&grid.query_sphere(Vec3::zero(), 5e6)), HashSet::from([1]));
        assert_eq!(ids(&grid.query_sphere(Vec3::zero(), 1e7)), HashSet::from([1, 2]));
        assert_eq!(
            ids(&grid.query_box(Vec3::zero(), Vec3::splat(5e6))),
            HashSet::from([1, 2])
        );
    }

    #[test]
    fn test_rejects_layout_past_u32_cells_per_axis() {
        let bounds = Bounds::new(Vec3::splat(-5e6), Vec3::splat(5e6));
        assert!(matches!(
            GridIndex::new(bounds, 1e-6, 16),
            Err(AoiError::InvalidBounds(_))
        ));
        assert!(GridIndex::new(bounds, 1e-2, 16).is_ok());
    }

    #[test]
    fn test_rebuild_replaces_previous_snapshot() {
        let mut grid = grid();
        grid.rebuild(&[SpatialObject::new(1, Vec3::zero())]);
        grid.rebuild(&[SpatialObject::new(2, Vec3::new(50.0, 0.0, 0.0))]);

        assert!(grid.query_sphere(Vec3::zero(), 5.0).is_empty());
        assert_eq!(ids(&grid.query_sphere(Vec3::new(50.0, 0.0, 0.0), 5.0)), HashSet::from([2]));
        assert_eq!(grid.stats().total_rebuilds, 2);
    }

    #[test]
    fn test_invalid_query_extents_match_nothing() {
        let mut grid = grid();
        grid.rebuild(&[SpatialObject::new(1, Vec3::zero())]);

        assert!(grid.query_sphere(Vec3::zero(), -1.0).is_empty());
        assert!(grid.query_sphere(Vec3::zero(), f64::NAN).is_empty());
        assert!(grid.query_box(Vec3::zero(), Vec3::new(1.0, -1.0, 1.0)).is_empty());
        assert!(grid.query_sphere(Vec3::new(f64::INFINITY, 0.0, 0.0), 1.0).is_empty());
        assert_eq!(ids(&grid.query_sphere(Vec3::zero(), 0.0)), HashSet::from([1]));
    }

    #[test]
    fn test_huge_radius_walks_occupied_cells() {
        let mut grid = GridIndex::new(
            Bounds::new(Vec3::splat(-10_000.0), Vec3::splat(10_000.0)),
            1.0,
            100,
        )
        .expect("valid grid parameters");
        grid.rebuild(&[
            SpatialObject::new(1, Vec3::new(-9_000.0, 0.0, 0.0)),
            SpatialObject::new(2, Vec3::new(9_000.0, 0.0, 0.0)),
        ]);

        let hits = grid.query_sphere(Vec3::zero(), 20_000.0);
        assert_eq!(ids(&hits), HashSet::from([1, 2]));
    }

    #[test]
    fn test_filters_exclude_and_limit() {
        let mut grid = grid();
        grid.rebuild(&[
            SpatialObject::new(1, Vec3::new(0.0, 0.0, 0.0)),
            SpatialObject::new(2, Vec3::new(1.0, 0.0, 0.0)),
            SpatialObject::new(3, Vec3::new(2.0, 0.0, 0.0)),
        ]);

        let excluded = SpatialQuery::sphere(Vec3::zero(), 10.0).with_filters(QueryFilters {
            exclude_ids: Some(HashSet::from([2])),
            max_results: None,
        });
        assert_eq!(ids(&grid.query(&excluded)), HashSet::from([1, 3]));

        let limited = SpatialQuery::sphere(Vec3::zero(), 10.0).with_filters(QueryFilters {
            exclude_ids: None,
            max_results: Some(2),
        });
        assert_eq!(grid.query(&limited).len(), 2);
    }

    #[test]
    fn test_query_into_reuses_buffer() {
        let mut grid = grid();
        grid.rebuild(&[SpatialObject::new(1, Vec3::zero())]);

        let mut buffer = vec![SpatialObject::new(99, Vec3::splat(1.0))];
        grid.query_into(&SpatialQuery::sphere(Vec3::zero(), 1.0), &mut buffer);
        assert_eq!(ids(&buffer), HashSet::from([1]));
        assert_eq!(grid.stats().total_queries, 1);
    }
}
