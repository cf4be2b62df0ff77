//! # Core Type Definitions
//!
//! This module contains the fundamental types shared by every part of the
//! area-of-interest subsystem: identities, positions, world volumes and
//! query shapes.
//!
//! ## Key Types
//!
//! - [`EntityId`] - Opaque network identity of a replicated entity
//! - [`ZoneId`] - Identifies one world/zone load
//! - [`Vec3`] - 3D vector with double precision
//! - [`Bounds`] - Axis-aligned playable volume of a zone
//! - [`Shape`] - Sphere or box extent used by spatial participants
//! - [`SpatialObject`] - Ephemeral `(id, position)` pair fed to the grid

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};
use uuid::Uuid;

// ============================================================================
// Identities
// ============================================================================

/// Unique identifier for a networked entity.
///
/// This is a wrapper around UUID so entity identities cannot be confused
/// with the small dense ids handed out by the
/// [`ObjectRegistry`](crate::registry::ObjectRegistry).
///
/// # Examples
///
/// ```rust
/// use horizon_aoi::EntityId;
///
/// let entity = EntityId::new();
/// let parsed: EntityId = entity.to_string().parse()?;
/// assert_eq!(entity, parsed);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Creates a new random entity ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::str::FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a world or zone load.
///
/// Bounds, the grid and the participant registry all live for exactly one
/// zone load; a new `ZoneId` means a fresh build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub String);

impl ZoneId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Represents a 3D vector with double-precision components.
///
/// Double precision keeps distance checks stable far away from the origin,
/// which matters for the closed-boundary rule of range queries.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate (typically east-west axis)
    pub x: f64,
    /// Y coordinate (typically vertical axis)
    pub y: f64,
    /// Z coordinate (typically north-south axis)
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (0, 0, 0).
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Creates a vector with all three components set to `v`.
    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    /// Calculates the Euclidean distance to another vector.
    pub fn distance(&self, other: Vec3) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Squared Euclidean distance; avoids the square root in hot loops.
    pub fn distance_squared(&self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Component-wise minimum.
    pub fn min(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    pub fn max(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Returns true when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Axis-aligned box describing the playable volume of a zone.
///
/// Bounds are derived once per zone load, either from explicit bounds
/// markers or from the union of static collider volumes (see
/// [`Bounds::enclosing`]), and then padded by whole grid cells.
///
/// # Examples
///
/// ```rust
/// use horizon_aoi::{Bounds, Vec3};
///
/// let level = Bounds::new(Vec3::new(-500.0, 0.0, -500.0), Vec3::new(500.0, 128.0, 500.0));
/// let padded = level.padded(1, 32.0);
/// assert_eq!(padded.min, Vec3::new(-532.0, -32.0, -532.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Bounds {
    /// Creates bounds from two opposite corners in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates bounds centered on `center` extending `half_extents` on each axis.
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Closed containment test: points on a face are inside.
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Bounds are usable for a grid when both corners are finite and ordered.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }

    /// Grows the bounds by `buffer_cells` whole cells on every side.
    pub fn padded(&self, buffer_cells: u32, cell_size: f64) -> Self {
        let pad = Vec3::splat(buffer_cells as f64 * cell_size);
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    /// Smallest bounds containing both `self` and `other`.
    pub fn union(&self, other: &Bounds) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Derives world bounds from static level geometry.
    ///
    /// Returns `None` when no volume is given, which callers treat as
    /// "this zone has no spatial data".
    pub fn enclosing<I>(volumes: I) -> Option<Bounds>
    where
        I: IntoIterator<Item = Bounds>,
    {
        volumes
            .into_iter()
            .filter(Bounds::is_valid)
            .reduce(|acc, volume| acc.union(&volume))
    }
}

/// Extent of a spatial participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Observers within `radius` of the participant's position see it.
    Sphere { radius: f64 },
    /// Observers inside the axis-aligned box see it.
    Box { half_extents: Vec3 },
}

impl Shape {
    pub fn sphere(radius: f64) -> Self {
        Shape::Sphere { radius }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Shape::Box { half_extents }
    }
}

/// Object stored in the grid for one rebuild cycle.
///
/// `id` is non-zero while registered. Objects are rebuilt from scratch
/// every interval and never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialObject {
    pub id: u32,
    pub position: Vec3,
}

impl SpatialObject {
    pub fn new(id: u32, position: Vec3) -> Self {
        Self { id, position }
    }
}
