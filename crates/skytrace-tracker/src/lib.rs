//! Skytrace tracker - the stateful core behind every map renderer.
//!
//! A single [`Tracker`] owns the poll loop, the trail history and the last
//! published snapshot. Renderer adapters only ever see read-only
//! `Arc<Snapshot>` / `Arc<PathCollection>` values through their
//! subscription callback.

pub mod config;
pub mod registry;
pub mod tracker;

pub use config::TrackerConfig;
pub use registry::{Subscriber, SubscriberId, SubscriptionRegistry};
pub use tracker::{Subscription, TickOutcome, Tracker, TrackerStatus};
