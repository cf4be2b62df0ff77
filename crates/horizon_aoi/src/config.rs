//! Area-of-interest configuration management
//!
//! Configuration is supplied at zone-load time and is not hot-reloadable:
//! the interest manager copies it in [`load_zone`](crate::InterestManager::load_zone)
//! and a new load is required to pick up changes.

use crate::error::ConfigValidationError;
use serde::{Deserialize, Serialize};

/// Complete interest-management configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AoiConfig {
    /// Edge length of one grid cell in world units
    pub cell_size: f64,
    /// Whole cells of padding added around the derived world bounds
    pub buffer_cells: u32,
    /// Hard cap on objects indexed per rebuild; extra objects are dropped
    pub max_objects: usize,
    /// Interval between rebuild cycles (in milliseconds)
    pub update_interval_ms: u64,
    /// Visibility radius for players that do not report their own
    pub default_visibility_radius: f64,
    /// Dispatch queries across the worker pool
    pub parallel_queries: bool,
    /// Minimum number of queries in a cycle before going parallel
    pub parallel_threshold: usize,
    /// Dedicated worker threads for the query phase (0 = shared rayon pool)
    pub worker_threads: usize,
}

impl Default for AoiConfig {
    fn default() -> Self {
        Self {
            cell_size: 32.0,
            buffer_cells: 1,
            max_objects: 10_000,
            update_interval_ms: 1000, // once per second
            default_visibility_radius: 100.0,
            parallel_queries: true,
            parallel_threshold: 64,
            worker_threads: 0,
        }
    }
}

impl AoiConfig {
    /// Validates the configuration and returns the first problem found
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "cell_size must be a positive finite number".to_string(),
            ));
        }

        if self.max_objects == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_objects must be > 0".to_string(),
            ));
        }

        if self.update_interval_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "update_interval_ms must be > 0".to_string(),
            ));
        }

        if !self.default_visibility_radius.is_finite() || self.default_visibility_radius < 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "default_visibility_radius must be a non-negative finite number".to_string(),
            ));
        }

        if !self.parallel_queries && self.worker_threads > 0 {
            return Err(ConfigValidationError::Conflict(
                "worker_threads is set but parallel_queries is disabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Interval between cycles as a [`Duration`](std::time::Duration)
    pub fn update_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.update_interval_ms)
    }
}

/// Configuration builder for easier setup
#[derive(Debug, Default)]
pub struct AoiConfigBuilder {
    config: AoiConfig,
}

impl AoiConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the grid cell size and the number of padding cells
    pub fn with_grid(mut self, cell_size: f64, buffer_cells: u32) -> Self {
        self.config.cell_size = cell_size;
        self.config.buffer_cells = buffer_cells;
        self
    }

    pub fn with_capacity(mut self, max_objects: usize) -> Self {
        self.config.max_objects = max_objects;
        self
    }

    pub fn with_update_interval_ms(mut self, update_interval_ms: u64) -> Self {
        self.config.update_interval_ms = update_interval_ms;
        self
    }

    pub fn with_default_visibility_radius(mut self, radius: f64) -> Self {
        self.config.default_visibility_radius = radius;
        self
    }

    /// Configures the parallel query phase
    pub fn with_parallelism(mut self, enabled: bool, threshold: usize, worker_threads: usize) -> Self {
        self.config.parallel_queries = enabled;
        self.config.parallel_threshold = threshold;
        self.config.worker_threads = worker_threads;
        self
    }

    pub fn build(self) -> AoiConfig {
        self.config
    }
}

/// Preset configurations for common use cases
pub mod presets {
    use super::*;

    /// Small, crowded arenas: fine cells and a fast cadence
    pub fn dense_arena() -> AoiConfig {
        AoiConfigBuilder::new()
            .with_grid(8.0, 1)
            .with_capacity(2_000)
            .with_update_interval_ms(250)
            .with_default_visibility_radius(40.0)
            .build()
    }

    /// Large open worlds: coarse cells, a dedicated query pool per core
    pub fn open_world() -> AoiConfig {
        AoiConfigBuilder::new()
            .with_grid(64.0, 2)
            .with_capacity(50_000)
            .with_update_interval_ms(1000)
            .with_default_visibility_radius(250.0)
            .with_parallelism(true, 64, num_cpus::get())
            .build()
    }

    /// Deterministic single-threaded configuration for tests
    pub fn testing() -> AoiConfig {
        AoiConfigBuilder::new()
            .with_grid(4.0, 1)
            .with_capacity(1_000)
            .with_update_interval_ms(10)
            .with_default_visibility_radius(10.0)
            .with_parallelism(false, usize::MAX, 0)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        assert!(AoiConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = AoiConfigBuilder::new()
            .with_grid(16.0, 3)
            .with_capacity(500)
            .with_default_visibility_radius(12.5)
            .build();

        assert_eq!(config.cell_size, 16.0);
        assert_eq!(config.buffer_cells, 3);
        assert_eq!(config.max_objects, 500);
        assert_eq!(config.default_visibility_radius, 12.5);
    }

    #[test]
    fn test_preset_configurations() {
        assert!(presets::dense_arena().validate().is_ok());
        assert!(presets::testing().validate().is_ok());

        let open_world = presets::open_world();
        assert!(open_world.validate().is_ok());
        assert!(open_world.worker_threads >= 1);
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = AoiConfig::default();

        config.cell_size = 0.0;
        assert!(config.validate().is_err());

        config.cell_size = f64::NAN;
        assert!(config.validate().is_err());

        config.cell_size = 32.0;
        config.max_objects = 0;
        assert!(config.validate().is_err());

        config.max_objects = 10;
        config.default_visibility_radius = -1.0;
        assert!(config.validate().is_err());

        config.default_visibility_radius = 10.0;
        config.parallel_queries = false;
        config.worker_threads = 4;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::Conflict(_))
        ));
    }
}
