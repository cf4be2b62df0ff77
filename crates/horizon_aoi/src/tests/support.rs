//! Mock collaborators shared by the scenario tests

use crate::{Bounds, EntityId, ReadyPlayer, SubscriptionSink, Vec3, WorldSource, ZoneId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// World whose players, bounds and readiness can be changed between cycles
#[derive(Debug)]
pub struct MockWorld {
    players: Mutex<Vec<ReadyPlayer>>,
    /// Spawned network entities that are not players
    extra_entities: Mutex<Vec<EntityId>>,
    /// Players still in the snapshot but gone by publish time
    despawned: Mutex<HashSet<EntityId>>,
    bounds: Mutex<Option<Bounds>>,
    ready: AtomicBool,
}

impl MockWorld {
    pub fn new(bounds: Option<Bounds>) -> Self {
        Self {
            players: Mutex::new(Vec::new()),
            extra_entities: Mutex::new(Vec::new()),
            despawned: Mutex::new(HashSet::new()),
            bounds: Mutex::new(bounds),
            ready: AtomicBool::new(true),
        }
    }

    /// World spanning -100..100 on every axis
    pub fn arena() -> Self {
        Self::new(Some(Bounds::new(Vec3::splat(-100.0), Vec3::splat(100.0))))
    }

    pub fn spawn_player(&self, position: Vec3, radius: Option<f64>) -> EntityId {
        let id = EntityId::new();
        let mut player = ReadyPlayer::new(id, position);
        player.visibility_radius = radius;
        self.players.lock().unwrap().push(player);
        id
    }

    pub fn spawn_entity(&self) -> EntityId {
        let id = EntityId::new();
        self.extra_entities.lock().unwrap().push(id);
        id
    }

    pub fn move_player(&self, id: EntityId, position: Vec3) {
        let mut players = self.players.lock().unwrap();
        if let Some(player) = players.iter_mut().find(|p| p.entity_id == id) {
            player.position = position;
        }
    }

    pub fn despawn_after_snapshot(&self, id: EntityId) {
        self.despawned.lock().unwrap().insert(id);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_bounds(&self, bounds: Option<Bounds>) {
        *self.bounds.lock().unwrap() = bounds;
    }
}

impl WorldSource for MockWorld {
    fn ready_players(&self) -> Vec<ReadyPlayer> {
        self.players.lock().unwrap().clone()
    }

    fn spawned_entities(&self) -> Vec<EntityId> {
        let despawned = self.despawned.lock().unwrap();
        self.players
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.entity_id)
            .chain(self.extra_entities.lock().unwrap().iter().copied())
            .filter(|id| !despawned.contains(id))
            .collect()
    }

    fn is_world_ready(&self, _zone: &ZoneId) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn world_bounds(&self, _zone: &ZoneId) -> Option<Bounds> {
        *self.bounds.lock().unwrap()
    }
}

/// Sink that keeps the latest set per entity and counts every call
#[derive(Debug, Default)]
pub struct RecordingSink {
    latest: Mutex<HashMap<EntityId, HashSet<EntityId>>>,
    calls: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, entity: &EntityId) -> Option<HashSet<EntityId>> {
        self.latest.lock().unwrap().get(entity).cloned()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn updated_entities(&self) -> usize {
        self.latest.lock().unwrap().len()
    }
}

impl SubscriptionSink for RecordingSink {
    fn update_subscriptions(&self, entity: EntityId, subscribers: HashSet<EntityId>) {
        self.latest.lock().unwrap().insert(entity, subscribers);
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn zone() -> ZoneId {
    ZoneId::new("test_zone")
}
