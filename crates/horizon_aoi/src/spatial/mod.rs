//! Spatial partitioning and querying
//!
//! This module provides the uniform grid used to answer "which positions lie
//! within this sphere/box" in time sublinear to the total population.

mod grid;
mod query;

// Re-export public types and functions
pub use grid::GridIndex;
pub use query::{QueryFilters, SpatialQuery};

use serde::{Deserialize, Serialize};

/// Statistics for the grid index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialIndexStats {
    /// Rebuilds performed since the grid was created
    pub total_rebuilds: u64,
    /// Range queries answered since the grid was created
    pub total_queries: u64,
    /// Objects indexed by the last rebuild
    pub objects_indexed: usize,
    /// Objects dropped by the last rebuild because capacity was exceeded
    pub objects_dropped: usize,
    /// Objects skipped by the last rebuild because their position was not finite
    pub objects_non_finite: usize,
    /// Non-empty cells after the last rebuild
    pub occupied_cells: usize,
    /// Duration of the last rebuild in microseconds
    pub last_rebuild_us: u64,
}
