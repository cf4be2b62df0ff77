//! Periodic interest cycle driver.
//!
//! Runs [`InterestManager::run_cycle`] on a fixed interval. Each cycle runs
//! on the blocking pool while holding the manager lock, so a cycle never
//! overlaps the next one, and a late cycle makes the next tick skip rather
//! than pile up.

use crate::interest::{CycleOutcome, InterestManager, SubscriptionSink, WorldSource};
use crate::shutdown::ShutdownState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace};

/// Drives an [`InterestManager`] from a tokio task.
pub struct InterestScheduler<W, S> {
    manager: Arc<Mutex<InterestManager>>,
    world: Arc<W>,
    sink: Arc<S>,
    interval: Duration,
    max_cycles: Option<u64>,
}

impl<W, S> InterestScheduler<W, S>
where
    W: WorldSource + 'static,
    S: SubscriptionSink + 'static,
{
    pub fn new(manager: Arc<Mutex<InterestManager>>, world: Arc<W>, sink: Arc<S>, interval: Duration) -> Self {
        Self {
            manager,
            world,
            sink,
            interval,
            max_cycles: None,
        }
    }

    /// Stops the loop after `cycles` completed cycles.
    pub fn with_max_cycles(mut self, cycles: Option<u64>) -> Self {
        self.max_cycles = cycles;
        self
    }

    /// Starts the loop; the handle resolves to the number of completed cycles.
    ///
    /// The loop checks `shutdown` before and after every tick wait, and
    /// marks it complete once it exits.
    pub fn spawn(self, shutdown: ShutdownState) -> JoinHandle<u64> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut completed: u64 = 0;

            info!("🕒 Interest scheduler started with interval: {:?}", self.interval);

            loop {
                if shutdown.is_shutdown_initiated() {
                    info!("🕒 Interest scheduler stopping - shutdown initiated");
                    break;
                }

                ticker.tick().await;

                if shutdown.is_shutdown_initiated() {
                    info!("🕒 Interest scheduler stopping - shutdown initiated during tick wait");
                    break;
                }

                let mut manager = Arc::clone(&self.manager).lock_owned().await;
                let world = Arc::clone(&self.world);
                let sink = Arc::clone(&self.sink);
                let outcome =
                    tokio::task::spawn_blocking(move || manager.run_cycle(world.as_ref(), sink.as_ref())).await;

                match outcome {
                    Ok(CycleOutcome::Completed(report)) => {
                        completed += 1;
                        trace!("Interest cycle {} finished in {}us", report.cycle, report.total_us);
                    }
                    Ok(CycleOutcome::Skipped(reason)) => debug!("Interest cycle skipped: {:?}", reason),
                    Ok(CycleOutcome::Discarded) => debug!("Interest cycle discarded after unload"),
                    Err(e) => error!("❌ Interest cycle task failed: {}", e),
                }

                if self.max_cycles.is_some_and(|max| completed >= max) {
                    info!("🏁 Interest scheduler reached its cycle limit ({})", completed);
                    break;
                }
            }

            shutdown.complete_shutdown();
            completed
        })
    }
}
