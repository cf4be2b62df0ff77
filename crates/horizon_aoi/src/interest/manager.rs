//! # Interest Manager
//!
//! Orchestrates the periodic rebuild-and-query cycle for one world/zone:
//!
//! 1. snapshot every ready player,
//! 2. rebuild the grid from that snapshot,
//! 3. query once per observer and fold hits into per-entity subscriber sets,
//! 4. query once per active spatial participant,
//! 5. hand the finished sets to the [`SubscriptionPublisher`].
//!
//! Rebuild takes `&mut GridIndex`; steps 3 and 4 only borrow it shared, so
//! the borrow checker guarantees that no query observes a partially rebuilt
//! grid. The query phase is fanned out with rayon once a cycle has enough
//! work, and joined before anything is published.
//!
//! ## Zone lifecycle
//!
//! ```text
//! Uninitialized --load_zone--> Ready --(run_cycle)*--> unload_zone --> Uninitialized
//!       \                                                 ^
//!        \--load_zone (no bounds / bad config)--> Disabled
//! ```

use super::publisher::{PublishReport, SubscriptionPublisher};
use super::subscribers::SubscriberSets;
use super::world::{Observed, ObservePredicate, ReadyPlayer, SubscriptionSink, WorldSource};
use crate::config::AoiConfig;
use crate::error::{AoiError, ConfigValidationError};
use crate::participant::SpatialParticipant;
use crate::registry::ObjectRegistry;
use crate::spatial::{GridIndex, SpatialIndexStats, SpatialQuery};
use crate::types::{Bounds, EntityId, Shape, SpatialObject, ZoneId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Lifecycle state of the manager for the current zone
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneState {
    /// No zone loaded
    Uninitialized,
    /// Grid built; cycles run
    Ready { zone: ZoneId, bounds: Bounds },
    /// Bounds or configuration unusable; cycles are no-ops until the next load
    Disabled { zone: ZoneId, reason: AoiError },
}

/// Why a cycle did no work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    Uninitialized,
    Disabled,
    WorldNotReady,
}

/// Result of one [`InterestManager::run_cycle`] call
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    Skipped(SkipReason),
    /// The zone was unloaded mid-cycle; results were thrown away
    Discarded,
}

/// Timings and counts for a completed cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub observers: usize,
    pub participants_queried: usize,
    pub participants_inactive: usize,
    pub subscriptions: usize,
    pub parallel: bool,
    pub publish: PublishReport,
    pub rebuild_us: u64,
    pub query_us: u64,
    pub total_us: u64,
}

/// Running totals for monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterestStats {
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub cycles_discarded: u64,
    pub last_report: Option<CycleReport>,
    pub grid: SpatialIndexStats,
}

/// Requests a zone unload from any thread.
///
/// A cycle already in flight finishes its queries against its snapshot,
/// then sees the request and discards its results instead of publishing.
#[derive(Debug, Clone)]
pub struct UnloadHandle {
    epoch: Arc<AtomicU64>,
}

impl UnloadHandle {
    pub fn request_unload(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }
}

/// Observer ids seen by one participant, `None` when it was inactive
type ParticipantHits = Vec<Option<Vec<EntityId>>>;

/// Read-only view used by the query phase
struct QueryPhase<'a> {
    grid: &'a GridIndex,
    players: &'a [ReadyPlayer],
    predicate: &'a dyn ObservePredicate,
    default_radius: f64,
}

impl QueryPhase<'_> {
    fn player_for(&self, hit: &SpatialObject) -> Option<&ReadyPlayer> {
        self.players.get((hit.id as usize).checked_sub(1)?)
    }

    /// Step 3 for a single observer
    fn observe(&self, observer: &ReadyPlayer, buffer: &mut Vec<SpatialObject>, sets: &mut SubscriberSets) {
        let radius = observer.effective_radius(self.default_radius);
        self.grid
            .query_into(&SpatialQuery::sphere(observer.position, radius), buffer);

        for hit in buffer.iter() {
            let Some(observed) = self.player_for(hit) else {
                continue;
            };
            if observed.entity_id == observer.entity_id {
                continue;
            }
            if self
                .predicate
                .should_observe(observer.entity_id, Observed::Entity(observed.entity_id))
            {
                sets.insert(observed.entity_id, observer.entity_id);
            }
        }
    }

    /// Step 4 for a single participant
    fn participant_observers<P>(&self, participant: &P, buffer: &mut Vec<SpatialObject>) -> Option<Vec<EntityId>>
    where
        P: SpatialParticipant + ?Sized,
    {
        let id = participant.registry_id();
        if id == 0 || !participant.is_active() {
            return None;
        }

        let center = participant.position();
        let query = match participant.shape() {
            Shape::Sphere { radius } => SpatialQuery::sphere(center, radius),
            Shape::Box { half_extents } => SpatialQuery::cuboid(center, half_extents),
        };
        self.grid.query_into(&query, buffer);

        let observers = buffer
            .iter()
            .filter_map(|hit| self.player_for(hit))
            .filter(|player| {
                self.predicate
                    .should_observe(player.entity_id, Observed::Participant(id))
            })
            .map(|player| player.entity_id)
            .collect();
        Some(observers)
    }

    fn run(&self, participants: &[Arc<dyn SpatialParticipant>], parallel: bool) -> (SubscriberSets, ParticipantHits) {
        if parallel {
            let sets = self
                .players
                .par_iter()
                .fold(
                    || (Vec::new(), SubscriberSets::new()),
                    |(mut buffer, mut sets), observer| {
                        self.observe(observer, &mut buffer, &mut sets);
                        (buffer, sets)
                    },
                )
                .map(|(_, sets)| sets)
                .reduce(SubscriberSets::new, SubscriberSets::merged);

            let hits = participants
                .par_iter()
                .map_init(Vec::new, |buffer, participant| {
                    self.participant_observers(participant.as_ref(), buffer)
                })
                .collect();

            (sets, hits)
        } else {
            let mut buffer = Vec::new();
            let mut sets = SubscriberSets::new();
            for observer in self.players {
                self.observe(observer, &mut buffer, &mut sets);
            }

            let hits = participants
                .iter()
                .map(|participant| self.participant_observers(participant.as_ref(), &mut buffer))
                .collect();

            (sets, hits)
        }
    }
}

/// Interest manager for one world/zone.
///
/// # Examples
///
/// ```rust
/// use horizon_aoi::{
///     AoiConfig, Bounds, CycleOutcome, EntityId, InterestManager, ObserveAll, ReadyPlayer,
///     SubscriptionSink, Vec3, WorldSource, ZoneId,
/// };
/// use std::collections::HashSet;
/// use std::sync::Arc;
///
/// struct Arena(Vec<ReadyPlayer>);
///
/// impl WorldSource for Arena {
///     fn ready_players(&self) -> Vec<ReadyPlayer> { self.0.clone() }
///     fn spawned_entities(&self) -> Vec<EntityId> { self.0.iter().map(|p| p.entity_id).collect() }
///     fn is_world_ready(&self, _zone: &ZoneId) -> bool { true }
///     fn world_bounds(&self, _zone: &ZoneId) -> Option<Bounds> {
///         Some(Bounds::new(Vec3::splat(-100.0), Vec3::splat(100.0)))
///     }
/// }
///
/// struct Discard;
/// impl SubscriptionSink for Discard {
///     fn update_subscriptions(&self, _entity: EntityId, _subscribers: HashSet<EntityId>) {}
/// }
///
/// let (a, b) = (EntityId::new(), EntityId::new());
/// let world = Arena(vec![
///     ReadyPlayer::new(a, Vec3::zero()).with_visibility_radius(10.0),
///     ReadyPlayer::new(b, Vec3::new(5.0, 0.0, 0.0)).with_visibility_radius(10.0),
/// ]);
///
/// let mut manager = InterestManager::new(AoiConfig::default(), Arc::new(ObserveAll))?;
/// manager.load_zone(ZoneId::new("arena"), &world)?;
///
/// assert!(matches!(manager.run_cycle(&world, &Discard), CycleOutcome::Completed(_)));
/// assert!(manager.subscribers().contains(&a, &b));
/// # Ok::<(), horizon_aoi::AoiError>(())
/// ```
pub struct InterestManager {
    config: AoiConfig,
    predicate: Arc<dyn ObservePredicate>,
    registry: Arc<ObjectRegistry>,
    grid: GridIndex,
    state: ZoneState,
    /// Bumped by every unload request
    epoch: Arc<AtomicU64>,
    /// Epoch observed when the current zone was loaded
    loaded_epoch: u64,
    pool: Option<rayon::ThreadPool>,
    publisher: SubscriptionPublisher,
    published: Arc<SubscriberSets>,
    stats: InterestStats,
    cycle: u64,
}

impl std::fmt::Debug for InterestManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterestManager")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("grid", &self.grid)
            .field("participants", &self.registry.len())
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

impl InterestManager {
    /// Creates a manager in the `Uninitialized` state.
    ///
    /// The visibility predicate is mandatory; pass [`ObserveAll`](super::ObserveAll)
    /// for pure distance-based interest.
    pub fn new(config: AoiConfig, predicate: Arc<dyn ObservePredicate>) -> Result<Self, AoiError> {
        config.validate()?;
        let pool = Self::build_pool(&config)?;

        Ok(Self {
            config,
            predicate,
            registry: Arc::new(ObjectRegistry::new()),
            grid: GridIndex::disabled(),
            state: ZoneState::Uninitialized,
            epoch: Arc::new(AtomicU64::new(0)),
            loaded_epoch: 0,
            pool,
            publisher: SubscriptionPublisher::new(),
            published: Arc::new(SubscriberSets::new()),
            stats: InterestStats::default(),
            cycle: 0,
        })
    }

    fn build_pool(config: &AoiConfig) -> Result<Option<rayon::ThreadPool>, AoiError> {
        if !config.parallel_queries || config.worker_threads == 0 {
            return Ok(None);
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|index| format!("aoi-query-{index}"))
            .build()
            .map(Some)
            .map_err(|e| AoiError::InvalidConfig(ConfigValidationError::InvalidValue(e.to_string())))
    }

    pub fn config(&self) -> &AoiConfig {
        &self.config
    }

    pub fn state(&self) -> &ZoneState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ZoneState::Ready { .. })
    }

    pub fn zone(&self) -> Option<&ZoneId> {
        match &self.state {
            ZoneState::Uninitialized => None,
            ZoneState::Ready { zone, .. } | ZoneState::Disabled { zone, .. } => Some(zone),
        }
    }

    /// Registry of spatial participants for the current zone
    pub fn registry(&self) -> Arc<ObjectRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn unload_handle(&self) -> UnloadHandle {
        UnloadHandle {
            epoch: Arc::clone(&self.epoch),
        }
    }

    /// Subscriber sets published by the last completed cycle
    pub fn subscribers(&self) -> Arc<SubscriberSets> {
        Arc::clone(&self.published)
    }

    pub fn stats(&self) -> InterestStats {
        let mut stats = self.stats.clone();
        stats.grid = self.grid.stats();
        stats
    }

    /// Derives bounds for `zone` and builds a fresh grid.
    ///
    /// Any previously loaded zone is unloaded first. On missing bounds or an
    /// unusable grid configuration the manager enters `Disabled` and the
    /// error is returned for logging; the server keeps running either way.
    pub fn load_zone<W>(&mut self, zone: ZoneId, world: &W) -> Result<(), AoiError>
    where
        W: WorldSource + ?Sized,
    {
        if self.state != ZoneState::Uninitialized {
            self.unload_zone();
        }

        if !world.is_world_ready(&zone) {
            debug!("Zone {} is not ready yet; interest management stays idle", zone);
            return Err(AoiError::WorldNotReady(zone));
        }

        let grid = world
            .world_bounds(&zone)
            .ok_or_else(|| AoiError::NoBounds(zone.clone()))
            .and_then(|bounds| {
                let padded = bounds.padded(self.config.buffer_cells, self.config.cell_size);
                GridIndex::new(padded, self.config.cell_size, self.config.max_objects)
                    .map(|grid| (grid, padded))
            });

        self.loaded_epoch = self.epoch.load(Ordering::Acquire);

        match grid {
            Ok((grid, bounds)) => {
                info!(
                    "🗺️ Interest management ready for zone {} ({:?} cells of {} units)",
                    zone,
                    grid.dimensions().unwrap_or([0; 3]),
                    self.config.cell_size
                );
                self.grid = grid;
                self.state = ZoneState::Ready { zone, bounds };
                Ok(())
            }
            Err(reason) => {
                warn!("⚠️ Interest management disabled for zone {}: {}", zone, reason);
                self.grid = GridIndex::disabled();
                self.state = ZoneState::Disabled {
                    zone,
                    reason: reason.clone(),
                };
                Err(reason)
            }
        }
    }

    /// Same as [`load_zone`](Self::load_zone) with a new configuration.
    ///
    /// An invalid configuration disables the zone and keeps the previous
    /// configuration for later loads.
    pub fn load_zone_with_config<W>(&mut self, zone: ZoneId, world: &W, config: AoiConfig) -> Result<(), AoiError>
    where
        W: WorldSource + ?Sized,
    {
        let pool = config
            .validate()
            .map_err(AoiError::from)
            .and_then(|_| Self::build_pool(&config));

        match pool {
            Ok(pool) => {
                self.pool = pool;
                self.config = config;
                self.load_zone(zone, world)
            }
            Err(reason) => {
                if self.state != ZoneState::Uninitialized {
                    self.unload_zone();
                }
                warn!("⚠️ Interest management disabled for zone {}: {}", zone, reason);
                self.state = ZoneState::Disabled {
                    zone,
                    reason: reason.clone(),
                };
                Err(reason)
            }
        }
    }

    /// Tears down the current zone.
    ///
    /// Drops the grid, clears the participant registry and the published
    /// sets, and invalidates any cycle still in flight.
    pub fn unload_zone(&mut self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(zone) = self.zone() {
            info!("🧹 Interest management unloaded for zone {}", zone);
        }
        self.grid = GridIndex::disabled();
        self.state = ZoneState::Uninitialized;
        self.registry.clear();
        self.published = Arc::new(SubscriberSets::new());
        self.loaded_epoch = self.epoch.load(Ordering::Acquire);
    }

    fn skip(&mut self, reason: SkipReason) -> CycleOutcome {
        self.stats.cycles_skipped += 1;
        CycleOutcome::Skipped(reason)
    }

    /// Runs one full snapshot, rebuild, query and publish pass.
    ///
    /// Never fails. When the zone is not ready or disabled this is a no-op
    /// that leaves existing subscriptions untouched.
    pub fn run_cycle<W, S>(&mut self, world: &W, sink: &S) -> CycleOutcome
    where
        W: WorldSource + ?Sized,
        S: SubscriptionSink + ?Sized,
    {
        let cycle_epoch = self.epoch.load(Ordering::Acquire);
        if cycle_epoch != self.loaded_epoch {
            // Unload requested through a handle while idle
            self.teardown();
        }

        let zone = match &self.state {
            ZoneState::Ready { zone, .. } => Ok(zone.clone()),
            ZoneState::Disabled { .. } => Err(SkipReason::Disabled),
            ZoneState::Uninitialized => Err(SkipReason::Uninitialized),
        };
        let zone = match zone {
            Ok(zone) => zone,
            Err(reason) => return self.skip(reason),
        };

        if !world.is_world_ready(&zone) {
            return self.skip(SkipReason::WorldNotReady);
        }

        let started = Instant::now();

        // 1. Snapshot
        let players = world.ready_players();
        let snapshot: Vec<SpatialObject> = players
            .iter()
            .enumerate()
            .filter_map(|(index, player)| {
                let id = u32::try_from(index + 1).ok()?;
                Some(SpatialObject::new(id, player.position))
            })
            .collect();

        // 2. Rebuild
        self.grid.rebuild(&snapshot);
        let rebuild_us = started.elapsed().as_micros() as u64;

        // 3 + 4. Query phase, read-only over the grid
        let participants = self.registry.values();
        let queried_ids: Vec<u32> = participants.iter().map(|p| p.registry_id()).collect();
        let parallel = self.config.parallel_queries
            && players.len() + participants.len() >= self.config.parallel_threshold;

        let query_started = Instant::now();
        let phase = QueryPhase {
            grid: &self.grid,
            players: &players,
            predicate: self.predicate.as_ref(),
            default_radius: self.config.default_visibility_radius,
        };
        let (sets, participant_hits) = match (&self.pool, parallel) {
            (Some(pool), true) => pool.install(|| phase.run(&participants, true)),
            _ => phase.run(&participants, parallel),
        };
        let query_us = query_started.elapsed().as_micros() as u64;

        if self.epoch.load(Ordering::Acquire) != cycle_epoch {
            warn!("⚠️ Zone {} unloaded mid-cycle; discarding results", zone);
            self.stats.cycles_discarded += 1;
            self.teardown();
            return CycleOutcome::Discarded;
        }

        let mut participants_queried = 0;
        let mut participants_inactive = 0;
        for ((participant, id), hits) in participants.iter().zip(queried_ids).zip(participant_hits) {
            // Unregistered while the queries ran
            if id == 0 || participant.registry_id() != id {
                trace!("Participant {} left the registry mid-cycle", id);
                continue;
            }
            participant.clear_subscribers();
            match hits {
                Some(observers) => {
                    participants_queried += 1;
                    for observer in observers {
                        participant.add_subscriber(observer);
                    }
                }
                None => participants_inactive += 1,
            }
        }

        // 5. Publish
        let spawned = world.spawned_entities();
        let (published, publish) = self.publisher.publish(&sets, &spawned, sink);
        let subscriptions = published.total_subscriptions();
        self.published = Arc::new(published);

        self.cycle += 1;
        let report = CycleReport {
            cycle: self.cycle,
            observers: players.len(),
            participants_queried,
            participants_inactive,
            subscriptions,
            parallel,
            publish,
            rebuild_us,
            query_us,
            total_us: started.elapsed().as_micros() as u64,
        };

        debug!(
            "🔭 AOI cycle {} for zone {}: {} observers, {} participants, {} subscriptions in {}us",
            report.cycle, zone, report.observers, participants_queried, subscriptions, report.total_us
        );

        self.stats.cycles_completed += 1;
        self.stats.last_report = Some(report.clone());
        CycleOutcome::Completed(report)
    }
}
