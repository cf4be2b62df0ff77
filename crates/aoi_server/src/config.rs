//! Configuration management for the AOI simulation server.
//!
//! Loads [`AppConfig`] from TOML. Missing sections and keys fall back to
//! defaults, and a default file is written when none exists.

use horizon_aoi::{AoiConfig, Bounds, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

fn default_zone() -> String { "arena".to_string() }
fn default_world_bounds() -> (f64, f64, f64, f64, f64, f64) {
    (-1000.0, -50.0, -1000.0, 1000.0, 50.0, 1000.0)
}
fn default_bots() -> usize { 200 }
fn default_bot_speed() -> f64 { 8.0 }
fn default_scout_ratio() -> f64 { 0.1 }
fn default_scout_radius() -> f64 { 250.0 }
fn default_triggers() -> usize { 8 }
fn default_trigger_radius() -> f64 { 60.0 }
fn default_stats_interval_secs() -> u64 { 10 }

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interest management settings passed to the zone on load
    #[serde(default)]
    pub aoi: AoiConfig,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Simulated world driving the interest manager
    #[serde(default)]
    pub simulation: SimulationSettings,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Simulated world configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Name of the zone to load
    #[serde(default = "default_zone")]
    pub zone: String,
    /// Playable volume (min_x, min_y, min_z, max_x, max_y, max_z); `None` leaves AOI disabled
    #[serde(default = "default_world_bounds_opt")]
    pub world_bounds: Option<(f64, f64, f64, f64, f64, f64)>,
    /// Number of simulated players
    #[serde(default = "default_bots")]
    pub bots: usize,
    /// Maximum distance a bot moves per cycle
    #[serde(default = "default_bot_speed")]
    pub bot_speed: f64,
    /// Fraction of bots reporting their own, larger visibility radius
    #[serde(default = "default_scout_ratio")]
    pub scout_ratio: f64,
    #[serde(default = "default_scout_radius")]
    pub scout_radius: f64,
    /// Number of stationary area triggers registered as spatial participants
    #[serde(default = "default_triggers")]
    pub triggers: usize,
    #[serde(default = "default_trigger_radius")]
    pub trigger_radius: f64,
    /// Stop after this many completed cycles (unset = run until a signal)
    #[serde(default)]
    pub max_cycles: Option<u64>,
    /// RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
    /// Interval between health reports in seconds (0 to disable)
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

fn default_world_bounds_opt() -> Option<(f64, f64, f64, f64, f64, f64)> {
    Some(default_world_bounds())
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            zone: default_zone(),
            world_bounds: default_world_bounds_opt(),
            bots: default_bots(),
            bot_speed: default_bot_speed(),
            scout_ratio: default_scout_ratio(),
            scout_radius: default_scout_radius(),
            triggers: default_triggers(),
            trigger_radius: default_trigger_radius(),
            max_cycles: None,
            seed: None,
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

impl SimulationSettings {
    /// World bounds as a [`Bounds`] volume
    pub fn bounds(&self) -> Option<Bounds> {
        self.world_bounds.map(|(min_x, min_y, min_z, max_x, max_y, max_z)| {
            Bounds::new(Vec3::new(min_x, min_y, min_z), Vec3::new(max_x, max_y, max_z))
        })
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the merged configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.aoi
            .validate()
            .map_err(|e| format!("Invalid aoi settings: {e}"))?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        let sim = &self.simulation;
        if sim.zone.is_empty() {
            return Err("simulation.zone cannot be empty".to_string());
        }

        // Missing bounds are allowed: the zone then runs with AOI disabled
        if let Some((min_x, min_y, min_z, max_x, max_y, max_z)) = sim.world_bounds {
            if ![min_x, min_y, min_z, max_x, max_y, max_z].iter().all(|v| v.is_finite()) {
                return Err("simulation.world_bounds must be finite numbers".to_string());
            }
            if min_x >= max_x || min_y >= max_y || min_z >= max_z {
                return Err("simulation.world_bounds min must be less than max on every axis".to_string());
            }
        }

        if !sim.bot_speed.is_finite() || sim.bot_speed < 0.0 {
            return Err("simulation.bot_speed must be a non-negative number".to_string());
        }
        if !(0.0..=1.0).contains(&sim.scout_ratio) {
            return Err("simulation.scout_ratio must be between 0.0 and 1.0".to_string());
        }
        if !sim.scout_radius.is_finite() || sim.scout_radius < 0.0 {
            return Err("simulation.scout_radius must be a non-negative number".to_string());
        }
        if !sim.trigger_radius.is_finite() || sim.trigger_radius <= 0.0 {
            return Err("simulation.trigger_radius must be greater than 0".to_string());
        }

        Ok(())
    }
}
