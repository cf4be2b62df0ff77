//! Main application logic and lifecycle management.
//!
//! The [`Application`] wires a [`SimulatedWorld`] to an [`InterestManager`],
//! drives it with an [`InterestScheduler`] and shuts everything down in
//! order on a signal or once the cycle limit is reached.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{wait_for_shutdown_signal, wait_for_signal},
    world::{ReplicationLog, SimulatedWorld},
};
use horizon_aoi::{
    AreaTrigger, InterestManager, InterestScheduler, ObserveAll, Shape, ShutdownState, SpatialParticipant,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Main application struct.
///
/// Owns the simulated world, the replication sink and the interest manager
/// for a single zone.
pub struct Application {
    config: AppConfig,
    world: Arc<SimulatedWorld>,
    sink: Arc<ReplicationLog>,
    manager: Arc<Mutex<InterestManager>>,
    triggers: Vec<Arc<AreaTrigger>>,
}

impl Application {
    /// Loads configuration, applies CLI overrides and builds the application.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if let Some(bots) = args.bots {
            config.simulation.bots = bots;
        }
        if args.cycles.is_some() {
            config.simulation.max_cycles = args.cycles;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();
        Self::from_config(config)
    }

    /// Builds the world, loads the zone and registers the area triggers.
    ///
    /// A zone that cannot be loaded is logged and left disabled; the
    /// application still runs.
    pub fn from_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let world = Arc::new(SimulatedWorld::new(&config.simulation));
        let sink = Arc::new(ReplicationLog::new());

        let mut manager = InterestManager::new(config.aoi.clone(), Arc::new(ObserveAll))?;
        if let Err(e) = manager.load_zone(world.zone().clone(), world.as_ref()) {
            warn!("⚠️ Zone {} running without interest management: {}", world.zone(), e);
        }

        let registry = manager.registry();
        let triggers: Vec<Arc<AreaTrigger>> = (0..config.simulation.triggers)
            .map(|_| {
                Arc::new(AreaTrigger::new(
                    world.random_position(),
                    Shape::sphere(config.simulation.trigger_radius),
                ))
            })
            .collect();
        for trigger in &triggers {
            let participant: Arc<dyn SpatialParticipant> = trigger.clone();
            if !registry.register(&participant) {
                warn!("⚠️ Failed to register area trigger");
            }
        }

        Ok(Self {
            config,
            world,
            sink,
            manager: Arc::new(Mutex::new(manager)),
            triggers,
        })
    }

    /// Runs until a shutdown signal arrives or the cycle limit is reached.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Horizon AOI Server");
        self.log_configuration_summary();

        let shutdown_state = ShutdownState::new();
        let interval = self.config.aoi.update_interval();

        // World simulation runs at the same cadence as interest cycles
        let movement_handle = {
            let world = Arc::clone(&self.world);
            let shutdown_state = shutdown_state.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                while !shutdown_state.is_shutdown_initiated() {
                    ticker.tick().await;
                    world.step();
                }
            })
        };

        let mut scheduler_handle = InterestScheduler::new(
            Arc::clone(&self.manager),
            Arc::clone(&self.world),
            Arc::clone(&self.sink),
            interval,
        )
        .with_max_cycles(self.config.simulation.max_cycles)
        .spawn(shutdown_state.clone());

        let monitoring_handle = self.spawn_monitoring();

        info!("✅ Horizon AOI Server is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let cycles = tokio::select! {
            signal = wait_for_shutdown_signal(&shutdown_state) => {
                signal?;

                // merciless shutdown
                tokio::spawn(async {
                    if let Err(e) = wait_for_signal().await {
                        error!("Failed to set up merciless shutdown signal handler: {e}");
                        return;
                    }
                    warn!("Shutdown handler received again! I'll make this quick.");
                    std::process::exit(1);
                });

                info!("⏳ Waiting for the in-flight interest cycle to finish...");
                (&mut scheduler_handle).await
            }
            cycles = &mut scheduler_handle => {
                shutdown_state.initiate_shutdown();
                cycles
            }
        };

        let cycles = match cycles {
            Ok(cycles) => cycles,
            Err(e) => {
                error!("❌ Interest scheduler failed: {}", e);
                0
            }
        };

        monitoring_handle.abort();
        if let Err(e) = movement_handle.await {
            warn!("World simulation task ended abnormally: {}", e);
        }

        info!("🧹 Unloading zone {}", self.world.zone());
        let mut manager = self.manager.lock().await;
        let stats = manager.stats();
        manager.unload_zone();
        drop(manager);

        info!("📊 Final Statistics:");
        info!("  - Interest cycles completed: {}", cycles);
        info!("  - Cycles skipped: {}", stats.cycles_skipped);
        let totals = self.sink.totals();
        info!(
            "  - Replication: {} updates, {} joins, {} leaves",
            totals.updates, totals.joins, totals.leaves
        );
        match serde_json::to_string_pretty(&stats) {
            Ok(json) => info!("  - Interest stats: {}", json),
            Err(e) => warn!("Failed to serialize interest stats: {}", e),
        }

        info!("✅ Horizon AOI Server shutdown complete");
        Ok(())
    }

    fn spawn_monitoring(&self) -> tokio::task::JoinHandle<()> {
        let secs = self.config.simulation.stats_interval_secs;
        let manager = Arc::clone(&self.manager);
        let sink = Arc::clone(&self.sink);
        let triggers = self.triggers.clone();

        tokio::spawn(async move {
            if secs == 0 {
                return;
            }
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            // First tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;

                let stats = manager.lock().await.stats();
                let totals = sink.totals();
                let watched = triggers.iter().filter(|t| !t.subscribers().is_empty()).count();

                match &stats.last_report {
                    Some(report) => info!(
                        "📊 AOI Health - cycle {} | {} observers | {} subscriptions | {}us | {} triggers watched | {} joins / {} leaves",
                        report.cycle,
                        report.observers,
                        report.subscriptions,
                        report.total_us,
                        watched,
                        totals.joins,
                        totals.leaves
                    ),
                    None => info!("📊 AOI Health - no completed cycles ({} skipped)", stats.cycles_skipped),
                }
            }
        })
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        let aoi = &self.config.aoi;
        let sim = &self.config.simulation;
        info!("📋 Configuration Summary:");
        info!("  🗺️ Zone: {}", sim.zone);
        match sim.bounds() {
            Some(bounds) => {
                let size = bounds.size();
                info!("  🌍 World: {:.0}x{:.0}x{:.0} units", size.x, size.y, size.z);
            }
            None => info!("  🌍 World: no bounds (interest management disabled)"),
        }
        info!("  🧱 Grid: {} unit cells, {} buffer cells, {} max objects", aoi.cell_size, aoi.buffer_cells, aoi.max_objects);
        info!("  ⏱️ Update interval: {}ms", aoi.update_interval_ms);
        info!("  👥 Bots: {} | Triggers: {}", self.world.player_count(), self.triggers.len());
        if let Some(max) = sim.max_cycles {
            info!("  🏁 Cycle limit: {}", max);
        }
    }

    pub fn manager(&self) -> Arc<Mutex<InterestManager>> {
        Arc::clone(&self.manager)
    }

    pub fn sink(&self) -> Arc<ReplicationLog> {
        Arc::clone(&self.sink)
    }
}
