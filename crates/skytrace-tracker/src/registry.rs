//! Subscriber bookkeeping and the debounced disable timer.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use skytrace_core::{PathCollection, Snapshot};
use tokio::task::JoinHandle;

/// Callback invoked with every published snapshot.
///
/// Runs synchronously inside the tick; it must not block. An `Err` is
/// logged and does not affect other subscribers.
pub type SubscriberFn =
    dyn Fn(Arc<Snapshot>, Arc<PathCollection>) -> anyhow::Result<()> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Outcome of handing one snapshot to one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The subscriber already saw this or a newer snapshot.
    Stale,
    Failed,
}

pub struct Subscriber {
    id: SubscriberId,
    callback: Box<SubscriberFn>,
    /// Sequence number of the newest snapshot handed to this subscriber.
    delivered: Mutex<u64>,
}

impl Subscriber {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Invoke the callback unless a snapshot at least as new as `seq` was
    /// already delivered. Errors and panics are caught and logged.
    pub fn deliver(
        &self,
        seq: u64,
        snapshot: &Arc<Snapshot>,
        paths: &Arc<PathCollection>,
    ) -> Delivery {
        let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        if seq <= *delivered {
            return Delivery::Stale;
        }
        *delivered = seq;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            (self.callback)(snapshot.clone(), paths.clone())
        }));
        match result {
            Ok(Ok(())) => Delivery::Delivered,
            Ok(Err(err)) => {
                tracing::error!("Subscriber {:?} failed: {:#}", self.id, err);
                Delivery::Failed
            }
            Err(_) => {
                tracing::error!("Subscriber {:?} panicked", self.id);
                Delivery::Failed
            }
        }
    }
}

/// Registered subscribers in registration order.
#[derive(Default)]
pub struct SubscriptionRegistry {
    next_id: u64,
    subscribers: Vec<Arc<Subscriber>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, callback: Box<SubscriberFn>) -> Arc<Subscriber> {
        self.next_id += 1;
        let subscriber = Arc::new(Subscriber {
            id: SubscriberId(self.next_id),
            callback,
            delivered: Mutex::new(0),
        });
        self.subscribers.push(subscriber.clone());
        subscriber
    }

    pub fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Current subscribers, cloned so delivery can run without the registry.
    pub fn subscribers(&self) -> Vec<Arc<Subscriber>> {
        self.subscribers.clone()
    }
}

/// Deliver one snapshot to every subscriber in order. Returns the number of
/// failed callbacks.
pub fn notify_all(
    subscribers: &[Arc<Subscriber>],
    seq: u64,
    snapshot: &Arc<Snapshot>,
    paths: &Arc<PathCollection>,
) -> usize {
    subscribers
        .iter()
        .map(|s| s.deliver(seq, snapshot, paths))
        .filter(|d| *d == Delivery::Failed)
        .count()
}

/// At most one pending disable; arming replaces, subscribing cancels.
///
/// The generation lets a timer that already woke up detect that it was
/// cancelled or replaced while it waited for the tracker lock.
#[derive(Debug, Default)]
pub struct DisableTimer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl DisableTimer {
    /// Cancel any pending timer and start a new one. `spawn` receives the
    /// generation the new timer must present to [`DisableTimer::fire`].
    pub fn arm(&mut self, spawn: impl FnOnce(u64) -> JoinHandle<()>) {
        self.cancel();
        self.handle = Some(spawn(self.generation));
    }

    /// Returns true when a pending timer was cancelled.
    pub fn cancel(&mut self) -> bool {
        self.generation += 1;
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Called by the timer task itself; true if it is still the current one.
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.handle.is_none() || generation != self.generation {
            return false;
        }
        self.handle = None;
        self.generation += 1;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.handle.is_some()
    }
}
