//! Subscription publisher
//!
//! Thin, stateless adapter between finished subscriber sets and the
//! replication layer. It does not diff; the sink compares against what it
//! sent before.

use super::subscribers::SubscriberSets;
use super::world::SubscriptionSink;
use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::trace;

/// Outcome of one publish pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    /// Entities told about at least one observer
    pub entities_updated: usize,
    /// Entities told to clear all subscriptions
    pub entities_cleared: usize,
    /// Observer ids dropped because they despawned after the snapshot
    pub stale_observers_dropped: usize,
    /// Computed sets for entities that are no longer spawned
    pub stale_sets_dropped: usize,
}

/// Delivers one complete subscriber set to every live network entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionPublisher;

impl SubscriptionPublisher {
    pub fn new() -> Self {
        Self
    }

    /// Publishes `sets` to `sink` for every entity in `spawned`.
    ///
    /// Entities without a computed set receive an empty set, so a missing
    /// result fails safe to "visible to no one". Observer ids that are no
    /// longer spawned are removed before publishing. Returns exactly what
    /// was published.
    pub fn publish<S>(
        &self,
        sets: &SubscriberSets,
        spawned: &[EntityId],
        sink: &S,
    ) -> (SubscriberSets, PublishReport)
    where
        S: SubscriptionSink + ?Sized,
    {
        let live: HashSet<EntityId> = spawned.iter().copied().collect();
        let mut published = SubscriberSets::new();
        let mut report = PublishReport::default();

        report.stale_sets_dropped = sets
            .iter()
            .filter(|(observed, _)| !live.contains(observed))
            .count();

        for &entity in &live {
            let observers: HashSet<EntityId> = match sets.get(&entity) {
                Some(observers) => {
                    let filtered: HashSet<EntityId> =
                        observers.iter().copied().filter(|id| live.contains(id)).collect();
                    report.stale_observers_dropped += observers.len() - filtered.len();
                    filtered
                }
                None => HashSet::new(),
            };

            if observers.is_empty() {
                report.entities_cleared += 1;
            } else {
                report.entities_updated += 1;
                published.insert_set(entity, observers.clone());
            }

            trace!("Publishing {} subscribers for {}", observers.len(), entity);
            sink.update_subscriptions(entity, observers);
        }

        (published, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<HashMap<EntityId, HashSet<EntityId>>>,
        calls: Mutex<usize>,
    }

    impl SubscriptionSink for RecordingSink {
        fn update_subscriptions(&self, entity: EntityId, subscribers: HashSet<EntityId>) {
            self.updates.lock().unwrap().insert(entity, subscribers);
            *self.calls.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_every_spawned_entity_is_updated_once() {
        let (a, b, c) = (EntityId::new(), EntityId::new(), EntityId::new());
        let mut sets = SubscriberSets::new();
        sets.insert(a, b);

        let sink = RecordingSink::default();
        let (published, report) = SubscriptionPublisher::new().publish(&sets, &[a, b, c], &sink);

        assert_eq!(*sink.calls.lock().unwrap(), 3);
        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates[&a], HashSet::from([b]));
        assert!(updates[&b].is_empty());
        assert!(updates[&c].is_empty());

        assert_eq!(report.entities_updated, 1);
        assert_eq!(report.entities_cleared, 2);
        assert_eq!(published.subscribers_of(&a), HashSet::from([b]));
    }

    #[test]
    fn test_despawned_ids_are_never_published() {
        let (a, gone_observer, gone_entity) = (EntityId::new(), EntityId::new(), EntityId::new());
        let mut sets = SubscriberSets::new();
        sets.insert(a, gone_observer);
        sets.insert(gone_entity, a);

        let sink = RecordingSink::default();
        let (published, report) = SubscriptionPublisher::new().publish(&sets, &[a], &sink);

        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert!(updates[&a].is_empty());
        assert!(published.is_empty());
        assert_eq!(report.stale_observers_dropped, 1);
        assert_eq!(report.stale_sets_dropped, 1);
    }
}
