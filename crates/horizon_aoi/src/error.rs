//! Error types for the area-of-interest subsystem.
//!
//! Only configuration problems surface as errors. They are raised while a
//! zone is being loaded and put that zone into the disabled state; the
//! per-interval cycle itself never fails.

use crate::types::ZoneId;

/// Enumeration of configuration failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AoiError {
    /// Bounds are non-finite or have min > max on some axis
    #[error("Invalid world bounds: {0}")]
    InvalidBounds(String),

    /// Cell size must be a positive finite number
    #[error("Invalid cell size: {0}")]
    InvalidCellSize(f64),

    /// A grid that can hold zero objects cannot answer any query
    #[error("Maximum object capacity must be greater than 0")]
    ZeroCapacity,

    /// The zone has neither collidable geometry nor an explicit bounds marker
    #[error("No world bounds available for zone {0}")]
    NoBounds(ZoneId),

    /// The replication layer has not finished loading the zone
    #[error("World is not ready for zone {0}")]
    WorldNotReady(ZoneId),

    /// The configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    #[error("Conflicting configuration: {0}")]
    Conflict(String),
}
