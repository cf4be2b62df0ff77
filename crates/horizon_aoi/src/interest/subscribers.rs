//! Per-cycle subscriber sets.

use crate::types::EntityId;
use std::collections::hash_map::{self, HashMap};
use std::collections::HashSet;

/// Observed entity to the set of observers that currently see it.
///
/// Many observers seeing one entity is the normal case: inserts merge into
/// the existing set and never overwrite it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriberSets {
    sets: HashMap<EntityId, HashSet<EntityId>>,
}

impl SubscriberSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `observer` sees `observed`; returns false if already known.
    pub fn insert(&mut self, observed: EntityId, observer: EntityId) -> bool {
        self.sets.entry(observed).or_default().insert(observer)
    }

    /// Folds `other` into `self`, unioning sets that share an observed entity.
    pub fn merge(&mut self, other: SubscriberSets) {
        if self.sets.is_empty() {
            self.sets = other.sets;
            return;
        }
        for (observed, observers) in other.sets {
            match self.sets.entry(observed) {
                hash_map::Entry::Occupied(mut entry) => entry.get_mut().extend(observers),
                hash_map::Entry::Vacant(entry) => {
                    entry.insert(observers);
                }
            }
        }
    }

    /// [`merge`](Self::merge) in reducer form
    pub fn merged(mut self, other: SubscriberSets) -> SubscriberSets {
        self.merge(other);
        self
    }

    pub fn get(&self, observed: &EntityId) -> Option<&HashSet<EntityId>> {
        self.sets.get(observed)
    }

    /// Observers of `observed`, empty when nobody sees it.
    pub fn subscribers_of(&self, observed: &EntityId) -> HashSet<EntityId> {
        self.sets.get(observed).cloned().unwrap_or_default()
    }

    pub fn contains(&self, observed: &EntityId, observer: &EntityId) -> bool {
        self.sets
            .get(observed)
            .map_or(false, |observers| observers.contains(observer))
    }

    /// Number of observed entities with a set
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Total observer/observed pairs across all sets
    pub fn total_subscriptions(&self) -> usize {
        self.sets.values().map(HashSet::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &HashSet<EntityId>)> {
        self.sets.iter()
    }

    pub(crate) fn insert_set(&mut self, observed: EntityId, observers: HashSet<EntityId>) {
        self.sets.insert(observed, observers);
    }
}
