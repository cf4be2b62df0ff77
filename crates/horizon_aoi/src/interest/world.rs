//! Contracts with the replication layer.
//!
//! The interest manager never owns entity state. It pulls positions from a
//! [`WorldSource`], asks an [`ObservePredicate`] whether a candidate pair may
//! see each other, and pushes finished subscriber sets into a
//! [`SubscriptionSink`].

use crate::types::{Bounds, EntityId, Vec3, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A fully joined player entity, as snapshotted at the start of a cycle.
///
/// Players still mid-handshake must not be reported: they are neither
/// observers nor observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyPlayer {
    pub entity_id: EntityId,
    pub position: Vec3,
    /// `None` falls back to the configured default radius
    pub visibility_radius: Option<f64>,
}

impl ReadyPlayer {
    pub fn new(entity_id: EntityId, position: Vec3) -> Self {
        Self {
            entity_id,
            position,
            visibility_radius: None,
        }
    }

    pub fn with_visibility_radius(mut self, radius: f64) -> Self {
        self.visibility_radius = Some(radius);
        self
    }

    /// Radius to query with, ignoring negative or non-finite overrides
    pub(crate) fn effective_radius(&self, default_radius: f64) -> f64 {
        self.visibility_radius
            .filter(|radius| radius.is_finite() && *radius >= 0.0)
            .unwrap_or(default_radius)
    }
}

/// Read side of the replication layer, polled once per cycle.
pub trait WorldSource: Send + Sync {
    /// Every spawned player-controlled entity that has finished joining
    fn ready_players(&self) -> Vec<ReadyPlayer>;

    /// Every live network entity; each one receives exactly one update per cycle
    fn spawned_entities(&self) -> Vec<EntityId>;

    fn is_world_ready(&self, zone: &ZoneId) -> bool;

    /// Playable volume of `zone`, from static geometry or explicit markers
    fn world_bounds(&self, zone: &ZoneId) -> Option<Bounds>;
}

/// Write side of the replication layer.
///
/// The sink owns diffing: it compares `subscribers` against what it sent
/// last time and emits join/leave replication events.
pub trait SubscriptionSink: Send + Sync {
    fn update_subscriptions(&self, entity: EntityId, subscribers: HashSet<EntityId>);
}

/// What an observer is being tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observed {
    /// Another player entity
    Entity(EntityId),
    /// A registered spatial participant, by registry id
    Participant(u32),
}

/// Game-specific visibility rule applied to every geometric match.
///
/// Faction, stealth and line-of-sight rules live behind this trait. The
/// manager has no built-in rule besides never subscribing an entity to
/// itself, so a predicate must always be chosen explicitly.
pub trait ObservePredicate: Send + Sync {
    fn should_observe(&self, observer: EntityId, observed: Observed) -> bool;
}

/// Predicate accepting every geometric match.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObserveAll;

impl ObservePredicate for ObserveAll {
    fn should_observe(&self, _observer: EntityId, _observed: Observed) -> bool {
        true
    }
}

/// Adapts a closure into an [`ObservePredicate`].
///
/// # Examples
///
/// ```rust
/// use horizon_aoi::{EntityId, FnPredicate, Observed, ObservePredicate};
/// use std::collections::HashSet;
///
/// let stealthed: HashSet<EntityId> = HashSet::from([EntityId::new()]);
/// let hidden = stealthed.clone();
/// let predicate = FnPredicate(move |_observer: EntityId, observed: Observed| match observed {
///     Observed::Entity(id) => !hidden.contains(&id),
///     Observed::Participant(_) => true,
/// });
///
/// let ghost = *stealthed.iter().next().unwrap();
/// assert!(!predicate.should_observe(EntityId::new(), Observed::Entity(ghost)));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnPredicate<F>(pub F);

impl<F> ObservePredicate for FnPredicate<F>
where
    F: Fn(EntityId, Observed) -> bool + Send + Sync,
{
    fn should_observe(&self, observer: EntityId, observed: Observed) -> bool {
        (self.0)(observer, observed)
    }
}
