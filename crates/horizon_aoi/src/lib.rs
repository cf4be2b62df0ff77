//! # Horizon AOI
//!
//! Grid-based spatial partitioning and area-of-interest (AOI) management for
//! authoritative multiplayer game servers.
//!
//! Every update interval the server asks one question: *which connected
//! players should receive replication updates about which networked
//! entities?* Answering it by checking every pair is quadratic; this crate
//! answers it with a uniform grid rebuilt once per interval and queried once
//! per observer.
//!
//! ## Core Features
//!
//! - **Grid Spatial Index**: uniform cell grid over the zone bounds, rebuilt from a
//!   snapshot and queried with spheres or axis-aligned boxes
//! - **Spatial Participants**: non-entity objects (trigger volumes, zone markers) that
//!   also collect observer sets, tracked in a thread-safe registry with id reuse
//! - **Interest Management**: per-entity subscriber sets computed in parallel and
//!   published as complete sets to the replication layer
//! - **Graceful Degradation**: zones without bounds disable AOI work instead of
//!   failing, and overflow objects are dropped with a warning
//! - **Scheduling**: a tokio task drives the cycle with skip-on-overrun backpressure
//!
//! ## Architecture Overview
//!
//! - [`spatial`]: [`GridIndex`], [`SpatialQuery`] and grid statistics
//! - [`registry`]: [`ObjectRegistry`] of [`SpatialParticipant`]s
//! - [`interest`]: [`InterestManager`], collaborator traits and the publisher
//! - [`scheduler`]: [`InterestScheduler`] plus [`ShutdownState`]
//!
//! ## Quick Start Example
//!
//! ```rust
//! use horizon_aoi::{Bounds, GridIndex, SpatialObject, Vec3};
//!
//! let bounds = Bounds::new(Vec3::splat(-64.0), Vec3::splat(64.0));
//! let mut grid = GridIndex::new(bounds, 16.0, 1024)?;
//!
//! grid.rebuild(&[
//!     SpatialObject::new(1, Vec3::new(0.0, 0.0, 0.0)),
//!     SpatialObject::new(2, Vec3::new(8.0, 0.0, 0.0)),
//!     SpatialObject::new(3, Vec3::new(60.0, 0.0, 0.0)),
//! ]);
//!
//! let mut near: Vec<u32> = grid.query_sphere(Vec3::zero(), 10.0).iter().map(|o| o.id).collect();
//! near.sort_unstable();
//! assert_eq!(near, vec![1, 2]);
//! # Ok::<(), horizon_aoi::AoiError>(())
//! ```
//!
//! ## Spatial Participants
//!
//! ```rust
//! use horizon_aoi::{AreaTrigger, ObjectRegistry, Shape, SpatialParticipant, Vec3};
//! use std::sync::Arc;
//!
//! let registry: ObjectRegistry = ObjectRegistry::new();
//! let trigger: Arc<dyn SpatialParticipant> =
//!     Arc::new(AreaTrigger::new(Vec3::zero(), Shape::sphere(20.0)));
//!
//! assert!(registry.register(&trigger));
//! assert!(!registry.register(&trigger));
//! assert_eq!(trigger.registry_id(), 1);
//! assert!(registry.unregister(&trigger));
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod interest;
pub mod participant;
pub mod registry;
pub mod scheduler;
pub mod shutdown;
pub mod spatial;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used items for convenience
pub use config::{presets, AoiConfig, AoiConfigBuilder};
pub use error::{AoiError, ConfigValidationError};
pub use interest::{
    CycleOutcome, CycleReport, FnPredicate, InterestManager, InterestStats, ObserveAll,
    ObservePredicate, Observed, PublishReport, ReadyPlayer, SkipReason, SubscriberSets,
    SubscriptionPublisher, SubscriptionSink, UnloadHandle, WorldSource, ZoneState,
};
pub use participant::{AreaTrigger, SpatialParticipant};
pub use registry::ObjectRegistry;
pub use scheduler::InterestScheduler;
pub use shutdown::ShutdownState;
pub use spatial::{GridIndex, QueryFilters, SpatialIndexStats, SpatialQuery};
pub use types::{Bounds, EntityId, Shape, SpatialObject, Vec3, ZoneId};
