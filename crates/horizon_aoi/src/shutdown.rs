//! Shutdown coordination for the interest scheduler.
//!
//! Shared state lets the signal handler stop the periodic cycle, and lets the
//! application wait until the in-flight cycle has finished before tearing the
//! zone down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared shutdown state for coordinating graceful shutdown across tasks.
#[derive(Debug, Clone)]
pub struct ShutdownState {
    /// Set once shutdown begins; no new cycles start after this
    shutdown_initiated: Arc<AtomicBool>,
    /// Set once the last cycle has drained
    shutdown_complete: Arc<AtomicBool>,
}

impl ShutdownState {
    /// Creates a new shutdown state with both flags cleared.
    pub fn new() -> Self {
        Self {
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_complete: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true once shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Returns true once the scheduler has drained.
    pub fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete.load(Ordering::Acquire)
    }

    /// Stops new interest cycles from starting.
    pub fn initiate_shutdown(&self) {
        if !self.shutdown_initiated.swap(true, Ordering::AcqRel) {
            info!("🛑 Shutdown initiated - no new interest cycles will start");
        }
    }

    /// Marks the scheduler as drained.
    pub fn complete_shutdown(&self) {
        if !self.shutdown_complete.swap(true, Ordering::AcqRel) {
            info!("✅ Interest scheduler drained - ready for final cleanup");
        }
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}
