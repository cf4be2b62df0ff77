//! # Spatial Participants
//!
//! A spatial participant is any gameplay object that wants to know which
//! observers can currently see it: area triggers, traps, AOE zones. It is
//! broader than "player" and is decoupled from network identity through the
//! small integer id handed out by the [`ObjectRegistry`](crate::ObjectRegistry).
//!
//! The host entity exclusively owns the participant state. The interest
//! manager only polls the read properties once per cycle and calls the two
//! write hooks while running its query phase, which may happen on worker
//! threads; every method therefore takes `&self`.

use crate::types::{EntityId, Shape, Vec3};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

/// Capability implemented by anything that can appear in AOI queries.
pub trait SpatialParticipant: Send + Sync {
    /// Registry id, `0` while not registered
    fn registry_id(&self) -> u32;

    /// Called by the registry on register (non-zero) and unregister (zero)
    fn set_registry_id(&self, id: u32);

    /// Inactive participants are skipped and keep an empty subscriber set
    fn is_active(&self) -> bool;

    fn position(&self) -> Vec3;

    fn shape(&self) -> Shape;

    /// Drops every observer recorded during the previous cycle
    fn clear_subscribers(&self);

    /// Records one observer that can currently see this participant
    fn add_subscriber(&self, observer: EntityId);
}

/// Ready-made participant for trigger volumes.
///
/// # Examples
///
/// ```rust
/// use horizon_aoi::{AreaTrigger, Shape, SpatialParticipant, Vec3};
///
/// let trigger = AreaTrigger::new(Vec3::new(10.0, 0.0, 0.0), Shape::sphere(5.0));
/// assert_eq!(trigger.registry_id(), 0);
/// assert!(trigger.is_active());
/// assert!(trigger.subscribers().is_empty());
/// ```
#[derive(Debug)]
pub struct AreaTrigger {
    id: AtomicU32,
    active: AtomicBool,
    position: RwLock<Vec3>,
    shape: RwLock<Shape>,
    subscribers: Mutex<HashSet<EntityId>>,
}

impl AreaTrigger {
    /// Creates an active, unregistered trigger.
    pub fn new(position: Vec3, shape: Shape) -> Self {
        Self {
            id: AtomicU32::new(0),
            active: AtomicBool::new(true),
            position: RwLock::new(position),
            shape: RwLock::new(shape),
            subscribers: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub fn set_position(&self, position: Vec3) {
        *self.position.write().unwrap_or_else(PoisonError::into_inner) = position;
    }

    pub fn set_shape(&self, shape: Shape) {
        *self.shape.write().unwrap_or_else(PoisonError::into_inner) = shape;
    }

    /// Snapshot of the observers recorded by the last cycle
    pub fn subscribers(&self) -> HashSet<EntityId> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SpatialParticipant for AreaTrigger {
    fn registry_id(&self) -> u32 {
        self.id.load(Ordering::Acquire)
    }

    fn set_registry_id(&self, id: u32) {
        self.id.store(id, Ordering::Release);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn position(&self) -> Vec3 {
        *self.position.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn shape(&self) -> Shape {
        *self.shape.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn clear_subscribers(&self) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn add_subscriber(&self, observer: EntityId) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(observer);
    }
}
