/// Spatial query types
use crate::types::{Shape, Vec3};
use std::collections::HashSet;

/// Spatial query parameters
#[derive(Debug, Clone)]
pub struct SpatialQuery {
    /// Center position of the query
    pub center: Vec3,
    /// Sphere radius or box half-extents around `center`
    pub shape: Shape,
    /// Optional filters for the query
    pub filters: QueryFilters,
}

impl SpatialQuery {
    pub fn sphere(center: Vec3, radius: f64) -> Self {
        Self {
            center,
            shape: Shape::Sphere { radius },
            filters: QueryFilters::default(),
        }
    }

    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            shape: Shape::Box { half_extents },
            filters: QueryFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: QueryFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Half-extents of the axis-aligned box enclosing the query volume.
    ///
    /// `None` for negative or non-finite extents, which match nothing.
    pub(crate) fn reach(&self) -> Option<Vec3> {
        let reach = match self.shape {
            Shape::Sphere { radius } => Vec3::splat(radius),
            Shape::Box { half_extents } => half_extents,
        };
        let usable = reach.is_finite() && reach.x >= 0.0 && reach.y >= 0.0 && reach.z >= 0.0;
        usable.then_some(reach)
    }

    /// Narrow-phase test; boundaries are closed.
    pub(crate) fn matches(&self, position: Vec3) -> bool {
        match self.shape {
            Shape::Sphere { radius } => self.center.distance_squared(position) <= radius * radius,
            Shape::Box { half_extents } => {
                (position.x - self.center.x).abs() <= half_extents.x
                    && (position.y - self.center.y).abs() <= half_extents.y
                    && (position.z - self.center.z).abs() <= half_extents.z
            }
        }
    }
}

/// Filters that can be applied to spatial queries
#[derive(Debug, Clone, Default)]
pub struct QueryFilters {
    /// Object ids never returned by the query
    pub exclude_ids: Option<HashSet<u32>>,
    /// Maximum number of results to return
    pub max_results: Option<usize>,
}

impl QueryFilters {
    pub(crate) fn admits(&self, id: u32) -> bool {
        self.exclude_ids
            .as_ref()
            .map_or(true, |excluded| !excluded.contains(&id))
    }
}
