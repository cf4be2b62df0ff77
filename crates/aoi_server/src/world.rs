//! Simulated world and replication sink.
//!
//! [`SimulatedWorld`] stands in for a real replication layer: random-walking
//! bots are reported as ready players. [`ReplicationLog`] receives the
//! published subscriber sets and diffs them into join/leave events the way a
//! network layer would.

use horizon_aoi::{Bounds, EntityId, ReadyPlayer, SubscriptionSink, Vec3, WorldSource, ZoneId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::trace;

use crate::config::SimulationSettings;

/// Random-walking players inside a fixed zone.
#[derive(Debug)]
pub struct SimulatedWorld {
    zone: ZoneId,
    bounds: Option<Bounds>,
    speed: f64,
    players: RwLock<Vec<ReadyPlayer>>,
    rng: Mutex<StdRng>,
}

impl SimulatedWorld {
    /// Spawns `settings.bots` players at random positions.
    pub fn new(settings: &SimulationSettings) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let bounds = settings.bounds();
        // Without bounds the bots still exist, they just cluster near the origin
        let area = bounds.unwrap_or_else(|| Bounds::from_center(Vec3::zero(), Vec3::splat(100.0)));

        let players = (0..settings.bots)
            .map(|_| {
                let player = ReadyPlayer::new(EntityId::new(), random_point(&mut rng, &area));
                if rng.random_bool(settings.scout_ratio) {
                    player.with_visibility_radius(settings.scout_radius)
                } else {
                    player
                }
            })
            .collect();

        trace!("Simulated world seeded with {}", seed);

        Self {
            zone: ZoneId::new(settings.zone.clone()),
            bounds,
            speed: settings.bot_speed,
            players: RwLock::new(players),
            rng: Mutex::new(rng),
        }
    }

    pub fn zone(&self) -> &ZoneId {
        &self.zone
    }

    pub fn player_count(&self) -> usize {
        self.players.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Moves every bot by up to `speed` per axis, staying inside the bounds.
    pub fn step(&self) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);

        for player in players.iter_mut() {
            let delta = Vec3::new(
                jitter(&mut rng, self.speed),
                jitter(&mut rng, self.speed),
                jitter(&mut rng, self.speed),
            );
            let moved = player.position + delta;
            player.position = match &self.bounds {
                Some(bounds) => moved.max(bounds.min).min(bounds.max),
                None => moved,
            };
        }
    }

    /// Random point inside the playable area, used for trigger placement
    pub fn random_position(&self) -> Vec3 {
        let area = self
            .bounds
            .unwrap_or_else(|| Bounds::from_center(Vec3::zero(), Vec3::splat(100.0)));
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        random_point(&mut rng, &area)
    }
}

fn jitter(rng: &mut StdRng, speed: f64) -> f64 {
    if speed > 0.0 {
        rng.random_range(-speed..=speed)
    } else {
        0.0
    }
}

fn random_point(rng: &mut StdRng, area: &Bounds) -> Vec3 {
    Vec3::new(
        rng.random_range(area.min.x..=area.max.x),
        rng.random_range(area.min.y..=area.max.y),
        rng.random_range(area.min.z..=area.max.z),
    )
}

impl WorldSource for SimulatedWorld {
    fn ready_players(&self) -> Vec<ReadyPlayer> {
        self.players.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn spawned_entities(&self) -> Vec<EntityId> {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|player| player.entity_id)
            .collect()
    }

    fn is_world_ready(&self, zone: &ZoneId) -> bool {
        *zone == self.zone
    }

    fn world_bounds(&self, zone: &ZoneId) -> Option<Bounds> {
        if *zone == self.zone {
            self.bounds
        } else {
            None
        }
    }
}

/// Totals reported by [`ReplicationLog`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationTotals {
    pub updates: u64,
    pub joins: u64,
    pub leaves: u64,
}

/// Sink that diffs each published set against the previous one.
#[derive(Debug, Default)]
pub struct ReplicationLog {
    last_sent: Mutex<HashMap<EntityId, HashSet<EntityId>>>,
    updates: AtomicU64,
    joins: AtomicU64,
    leaves: AtomicU64,
}

impl ReplicationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn totals(&self) -> ReplicationTotals {
        ReplicationTotals {
            updates: self.updates.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            leaves: self.leaves.load(Ordering::Relaxed),
        }
    }

    /// Observers currently subscribed to `entity`
    pub fn observers_of(&self, entity: &EntityId) -> HashSet<EntityId> {
        self.last_sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }
}

impl SubscriptionSink for ReplicationLog {
    fn update_subscriptions(&self, entity: EntityId, subscribers: HashSet<EntityId>) {
        let mut last_sent = self.last_sent.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = last_sent.entry(entity).or_default();

        let joins = subscribers.difference(previous).count() as u64;
        let leaves = previous.difference(&subscribers).count() as u64;
        if joins > 0 || leaves > 0 {
            trace!("Entity {}: {} observers joined, {} left", entity, joins, leaves);
        }

        self.updates.fetch_add(1, Ordering::Relaxed);
        self.joins.fetch_add(joins, Ordering::Relaxed);
        self.leaves.fetch_add(leaves, Ordering::Relaxed);
        *previous = subscribers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SimulationSettings {
        SimulationSettings {
            bots: 50,
            bot_speed: 30.0,
            seed: Some(7),
            world_bounds: Some((-20.0, -5.0, -20.0, 20.0, 5.0, 20.0)),
            ..SimulationSettings::default()
        }
    }

    #[test]
    fn test_bots_stay_inside_bounds() {
        let settings = settings();
        let world = SimulatedWorld::new(&settings);
        let bounds = settings.bounds().unwrap();

        for _ in 0..20 {
            world.step();
        }

        let players = world.ready_players();
        assert_eq!(players.len(), 50);
        assert!(players.iter().all(|p| bounds.contains(p.position)));
    }

    #[test]
    fn test_same_seed_same_world() {
        let first = SimulatedWorld::new(&settings());
        let second = SimulatedWorld::new(&settings());

        let positions = |world: &SimulatedWorld| -> Vec<Vec3> {
            world.ready_players().iter().map(|p| p.position).collect()
        };
        assert_eq!(positions(&first), positions(&second));
    }

    #[test]
    fn test_only_its_own_zone_is_ready() {
        let world = SimulatedWorld::new(&settings());
        let other = ZoneId::new("elsewhere");

        assert!(world.is_world_ready(world.zone()));
        assert!(world.world_bounds(world.zone()).is_some());
        assert!(!world.is_world_ready(&other));
        assert!(world.world_bounds(&other).is_none());
    }

    #[test]
    fn test_replication_log_diffs_sets() {
        let log = ReplicationLog::new();
        let (entity, a, b) = (EntityId::new(), EntityId::new(), EntityId::new());

        log.update_subscriptions(entity, HashSet::from([a, b]));
        log.update_subscriptions(entity, HashSet::from([b]));
        log.update_subscriptions(entity, HashSet::from([b]));

        assert_eq!(
            log.totals(),
            ReplicationTotals {
                updates: 3,
                joins: 2,
                leaves: 1
            }
        );
        assert_eq!(log.observers_of(&entity), HashSet::from([b]));
    }
}
