//! # Object Registry
//!
//! Thread-safe pool that hands out and recycles small dense integer ids for
//! [`SpatialParticipant`]s. Spawn and despawn may happen off the simulation
//! thread, so every operation is serialized by one mutex around the whole
//! registry. Registration is rare compared to per-tick queries, and the
//! query phase never touches this lock: it works on the snapshot returned by
//! [`ObjectRegistry::values`].
//!
//! Misuse (double registration, unregistering an unknown participant) is
//! reported through a `false` return so lifecycle hooks can log it without
//! unwinding.

use crate::participant::SpatialParticipant;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug)]
struct RegistryInner<P: ?Sized> {
    entries: HashMap<u32, Arc<P>>,
    /// Released ids, most recently released on top
    free_ids: Vec<u32>,
    /// Next id to mint once the free list is empty
    next_id: u32,
}

/// Registry of live spatial participants keyed by their dense id.
///
/// # Examples
///
/// ```rust
/// use horizon_aoi::{AreaTrigger, ObjectRegistry, Shape, SpatialParticipant, Vec3};
/// use std::sync::Arc;
///
/// let registry: ObjectRegistry<AreaTrigger> = ObjectRegistry::new();
/// let trigger = Arc::new(AreaTrigger::new(Vec3::zero(), Shape::sphere(5.0)));
///
/// assert!(registry.register(&trigger));
/// assert!(!registry.register(&trigger));
/// assert_eq!(trigger.registry_id(), 1);
///
/// assert!(registry.unregister(&trigger));
/// assert_eq!(trigger.registry_id(), 0);
/// ```
#[derive(Debug)]
pub struct ObjectRegistry<P: ?Sized + SpatialParticipant = dyn SpatialParticipant> {
    inner: Mutex<RegistryInner<P>>,
}

impl<P: ?Sized + SpatialParticipant> ObjectRegistry<P> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                entries: HashMap::new(),
                free_ids: Vec::new(),
                next_id: 1,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner<P>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Assigns an id to `participant`.
    ///
    /// Fails without side effects when the participant already holds an id
    /// that is currently live. Released ids are reused before new ones are
    /// minted.
    pub fn register(&self, participant: &Arc<P>) -> bool {
        let mut inner = self.lock();

        let current = participant.registry_id();
        if current != 0 && inner.entries.contains_key(&current) {
            debug!("Participant {} is already registered", current);
            return false;
        }

        let id = match inner.free_ids.pop() {
            Some(id) => id,
            None => {
                if inner.next_id == u32::MAX {
                    warn!("⚠️ Object registry exhausted its id space");
                    return false;
                }
                let id = inner.next_id;
                inner.next_id += 1;
                id
            }
        };

        participant.set_registry_id(id);
        inner.entries.insert(id, Arc::clone(participant));
        true
    }

    /// Removes `participant`, resets its id to 0 and recycles the id.
    ///
    /// Fails when the participant's id is not registered, or when that id
    /// belongs to a different participant instance.
    pub fn unregister(&self, participant: &Arc<P>) -> bool {
        let mut inner = self.lock();

        let id = participant.registry_id();
        if id == 0 {
            return false;
        }

        match inner.entries.get(&id) {
            Some(existing) if Arc::ptr_eq(existing, participant) => {}
            Some(_) => {
                debug!("Participant id {} is owned by another instance", id);
                return false;
            }
            None => return false,
        }

        inner.entries.remove(&id);
        inner.free_ids.push(id);
        participant.set_registry_id(0);
        true
    }

    pub fn try_get(&self, id: u32) -> Option<Arc<P>> {
        self.lock().entries.get(&id).cloned()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.lock().entries.contains_key(&id)
    }

    /// Snapshot of every live participant; the lock is released on return.
    pub fn values(&self) -> Vec<Arc<P>> {
        self.lock().entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all state on world teardown.
    ///
    /// Participants still held are reset to id 0 so they can register with
    /// the next zone's registry.
    pub fn clear(&self) {
        let mut inner = self.lock();
        for participant in inner.entries.values() {
            participant.set_registry_id(0);
        }
        inner.entries.clear();
        inner.free_ids.clear();
        inner.next_id = 1;
    }
}

impl<P: ?Sized + SpatialParticipant> Default for ObjectRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
