//! # Horizon AOI Server
//!
//! Headless host for the `horizon_aoi` interest manager. It simulates a
//! zone full of random-walking players, runs the rebuild/query/publish
//! cycle on a fixed interval and reports what the replication layer would
//! have sent.
//!
//! ## Usage
//!
//! ```text
//! aoi_server --config aoi_server.toml --bots 500 --cycles 100
//! ```

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;
pub mod world;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the AOI server.
///
/// Parses arguments, sets up logging from the configuration file, then
/// builds and runs the [`Application`]. Exits with code 1 on startup or
/// runtime failure.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{LoggingSettings, SimulationSettings};
