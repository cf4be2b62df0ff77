//! Interest management
//!
//! Decides, once per cycle, which connected players receive replication
//! updates about which networked entities. The [`InterestManager`] owns the
//! grid and the participant registry; the replication layer is reached only
//! through the [`WorldSource`] and [`SubscriptionSink`] traits.

mod manager;
mod publisher;
mod subscribers;
mod world;

pub use manager::{
    CycleOutcome, CycleReport, InterestManager, InterestStats, SkipReason, UnloadHandle, ZoneState,
};
pub use publisher::{PublishReport, SubscriptionPublisher};
pub use subscribers::SubscriberSets;
pub use world::{
    FnPredicate, ObserveAll, ObservePredicate, Observed, ReadyPlayer, SubscriptionSink, WorldSource,
};
