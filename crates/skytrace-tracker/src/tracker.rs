//! The tracker: decides each tick how to obtain aircraft positions and
//! fans the result out to subscribers.
//!
//! Lifecycle follows the subscriber count. The first subscriber enables the
//! tracker (timer started, immediate tick); when the last one leaves a
//! disable is scheduled after [`TrackerConfig::disable_grace`], and any new
//! subscriber within that window cancels it. Disabling stops the timer and
//! drops all trail history.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use skytrace_core::{extrapolate, GeoPoint, PathCollection, Snapshot, TrajectoryStore};
use skytrace_feed::{FeedError, PositionSource};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::config::TrackerConfig;
use crate::registry::{notify_all, DisableTimer, SubscriberFn, SubscriberId, SubscriptionRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStatus {
    Disabled,
    Enabled,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Disabled, no center yet, or superseded by a disable mid-fetch.
    Idle,
    /// Live fetch failed; previous snapshot kept, nobody notified.
    Skipped,
    Published { aircraft: usize },
}

/// Handle to the flight tracker. Cheap to clone; all clones share state.
///
/// Build one at the composition root and hand clones to each consumer.
/// Enabling spawns onto the current Tokio runtime, so `subscribe`,
/// `enable` and `set_center` must be called from within one.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<Inner>,
}

struct Inner {
    config: TrackerConfig,
    source: Arc<dyn PositionSource>,
    state: Mutex<TrackerState>,
    /// Serializes tick bodies; a live fetch suspends while holding it.
    tick_lock: tokio::sync::Mutex<()>,
}

struct TrackerState {
    status: TrackerStatus,
    /// Bumped on every enable/disable so in-flight ticks can tell they are stale.
    session: u64,
    center: Option<GeoPoint>,
    /// Set by the first 429; never cleared for the life of the process.
    rate_limited: bool,
    seq: u64,
    snapshot: Arc<Snapshot>,
    paths: Arc<PathCollection>,
    last_published_at: Option<Instant>,
    last_live_fetch: Option<Instant>,
    trajectories: TrajectoryStore,
    registry: SubscriptionRegistry,
    timer: Option<JoinHandle<()>>,
    pending_disable: DisableTimer,
}

struct TickPlan {
    session: u64,
    center: GeoPoint,
    use_local: bool,
    last: Arc<Snapshot>,
    last_published_at: Option<Instant>,
    last_live_fetch: Option<Instant>,
}

impl Tracker {
    pub fn new(config: TrackerConfig, source: Arc<dyn PositionSource>) -> Self {
        let trajectories = TrajectoryStore::new(config.max_track_points);
        Self {
            inner: Arc::new(Inner {
                config,
                source,
                state: Mutex::new(TrackerState {
                    status: TrackerStatus::Disabled,
                    session: 0,
                    center: None,
                    rate_limited: false,
                    seq: 1,
                    snapshot: Arc::new(Snapshot::empty(Utc::now())),
                    paths: Arc::new(PathCollection::default()),
                    last_published_at: None,
                    last_live_fetch: None,
                    trajectories,
                    registry: SubscriptionRegistry::new(),
                    timer: None,
                    pending_disable: DisableTimer::default(),
                }),
                tick_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Register a callback. It is invoked with the current snapshot before
    /// this returns, then once per published tick.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Arc<Snapshot>, Arc<PathCollection>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback: Box<SubscriberFn> = Box::new(callback);
        let mut state = self.lock_state();
        if state.pending_disable.cancel() {
            tracing::debug!("Pending tracker disable cancelled by new subscriber");
        }
        let subscriber = state.registry.add(callback);
        if state.status == TrackerStatus::Disabled {
            self.enable_locked(&mut state);
        }
        let (seq, snapshot, paths) = (state.seq, state.snapshot.clone(), state.paths.clone());
        let subscribers = state.registry.len();
        drop(state);

        tracing::debug!("Subscriber {:?} added ({} total)", subscriber.id(), subscribers);
        subscriber.deliver(seq, &snapshot, &paths);

        Subscription {
            id: subscriber.id(),
            tracker: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    /// Start the tick timer. No-op when already enabled.
    pub fn enable(&self) {
        let mut state = self.lock_state();
        self.enable_locked(&mut state);
    }

    /// Stop the tick timer and discard trail history and the last snapshot.
    ///
    /// Idempotent. No tick publishes after this returns.
    pub fn disable(&self) {
        let mut state = self.lock_state();
        state.pending_disable.cancel();
        Self::disable_locked(&mut state);
    }

    /// Move the query center. A move beyond the recenter threshold while
    /// enabled ticks immediately instead of waiting for the timer.
    pub fn set_center(&self, lon: f64, lat: f64) {
        let next = GeoPoint::new(lon, lat);
        let mut state = self.lock_state();
        let moved = state
            .center
            .map_or(true, |prev| prev.moved_beyond(&next, self.inner.config.recenter_threshold_deg));
        state.center = Some(next);
        let enabled = state.status == TrackerStatus::Enabled;
        drop(state);

        if moved && enabled {
            tracing::debug!("Center moved to ({:.4}, {:.4}); ticking now", lon, lat);
            let tracker = self.clone();
            tokio::spawn(async move {
                tracker.tick().await;
            });
        }
    }

    pub fn get_data(&self) -> Arc<Snapshot> {
        self.lock_state().snapshot.clone()
    }

    pub fn get_paths(&self) -> Arc<PathCollection> {
        self.lock_state().paths.clone()
    }

    pub fn status(&self) -> TrackerStatus {
        self.lock_state().status
    }

    pub fn center(&self) -> Option<GeoPoint> {
        self.lock_state().center
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_state().registry.len()
    }

    /// True once the live feed rate-limited this process.
    pub fn is_rate_limited(&self) -> bool {
        self.lock_state().rate_limited
    }

    /// Run one tick. Normally driven by the timer; ticks never overlap.
    #[doc(hidden)]
    pub async fn tick(&self) -> TickOutcome {
        let _serial = self.inner.tick_lock.lock().await;

        let plan = {
            let state = self.lock_state();
            if state.status != TrackerStatus::Enabled {
                return TickOutcome::Idle;
            }
            let Some(center) = state.center else {
                return TickOutcome::Idle;
            };
            TickPlan {
                session: state.session,
                center,
                use_local: self.inner.config.use_local_data || state.rate_limited,
                last: state.snapshot.clone(),
                last_published_at: state.last_published_at,
                last_live_fetch: state.last_live_fetch,
            }
        };

        let now = Instant::now();
        if plan.use_local {
            let next = self.local_snapshot(&plan, now).await;
            return self.publish(plan.session, next, now, false);
        }

        if !self.live_fetch_due(&plan, now) {
            if let Some(next) = extrapolated(&plan, now) {
                return self.publish(plan.session, next, now, false);
            }
        }

        match self.inner.source.fetch_live(plan.center).await {
            Ok(next) => self.publish(plan.session, next, now, true),
            Err(FeedError::RateLimited) => {
                tracing::warn!("Feed rate limited; using local data for the rest of the session");
                self.lock_state().rate_limited = true;
                let next = self.inner.source.load_fallback().await;
                self.publish(plan.session, next, now, false)
            }
            Err(err) => {
                tracing::warn!("Live fetch failed, skipping tick: {}", err);
                TickOutcome::Skipped
            }
        }
    }

    async fn local_snapshot(&self, plan: &TickPlan, now: Instant) -> Snapshot {
        match extrapolated(plan, now) {
            Some(next) => next,
            None => self.inner.source.load_fallback().await,
        }
    }

    fn live_fetch_due(&self, plan: &TickPlan, now: Instant) -> bool {
        let refresh = self.inner.config.live_refresh;
        if refresh.is_zero() {
            return true;
        }
        plan.last_live_fetch
            .map_or(true, |at| now.saturating_duration_since(at) >= refresh)
    }

    fn publish(&self, session: u64, next: Snapshot, now: Instant, live: bool) -> TickOutcome {
        let mut state = self.lock_state();
        if state.session != session || state.status != TrackerStatus::Enabled {
            return TickOutcome::Idle;
        }

        // Subscribers must never see time go backwards.
        let timestamp = next.timestamp.max(state.snapshot.timestamp);
        let next = next.with_timestamp(timestamp);
        for aircraft in &next.aircraft {
            state.trajectories.record(&aircraft.id, aircraft.position, timestamp);
        }

        let aircraft = next.len();
        let snapshot = Arc::new(next);
        let paths = Arc::new(state.trajectories.as_path_collection());
        state.seq += 1;
        state.snapshot = snapshot.clone();
        state.paths = paths.clone();
        state.last_published_at = Some(now);
        if live {
            state.last_live_fetch = Some(now);
        }
        let seq = state.seq;
        let subscribers = state.registry.subscribers();
        drop(state);

        tracing::debug!(
            "Published {} aircraft, {} trails to {} subscriber(s)",
            aircraft,
            paths.len(),
            subscribers.len()
        );
        notify_all(&subscribers, seq, &snapshot, &paths);
        TickOutcome::Published { aircraft }
    }

    fn unsubscribe(&self, id: SubscriberId) {
        let mut state = self.lock_state();
        if !state.registry.remove(id) {
            return;
        }
        tracing::debug!("Subscriber {:?} removed ({} left)", id, state.registry.len());
        if !state.registry.is_empty() || state.status != TrackerStatus::Enabled {
            return;
        }

        let grace = self.inner.config.disable_grace;
        if tokio::runtime::Handle::try_current().is_err() {
            Self::disable_locked(&mut state);
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        state.pending_disable.arm(|generation| {
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                if let Some(inner) = weak.upgrade() {
                    Tracker { inner }.disable_if_idle(generation);
                }
            })
        });
        tracing::debug!("Last subscriber left; disabling in {:?}", grace);
    }

    fn disable_if_idle(&self, generation: u64) {
        let mut state = self.lock_state();
        if !state.pending_disable.fire(generation) || !state.registry.is_empty() {
            return;
        }
        Self::disable_locked(&mut state);
    }

    fn enable_locked(&self, state: &mut TrackerState) {
        if state.status == TrackerStatus::Enabled {
            return;
        }
        state.status = TrackerStatus::Enabled;
        state.session += 1;
        let weak = Arc::downgrade(&self.inner);
        state.timer = Some(tokio::spawn(run_tick_loop(weak, self.inner.config.tick_interval)));
        tracing::info!("Flight tracking enabled");
    }

    fn disable_locked(state: &mut TrackerState) {
        if state.status == TrackerStatus::Disabled {
            return;
        }
        state.status = TrackerStatus::Disabled;
        state.session += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.trajectories.clear();
        let timestamp = Utc::now().max(state.snapshot.timestamp);
        state.snapshot = Arc::new(Snapshot::empty(timestamp));
        state.paths = Arc::new(PathCollection::default());
        state.seq += 1;
        state.last_published_at = None;
        state.last_live_fetch = None;
        tracing::info!("Flight tracking disabled");
    }

    fn lock_state(&self) -> MutexGuard<'_, TrackerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Dead-reckon the last snapshot to `now`, if there is one with aircraft.
fn extrapolated(plan: &TickPlan, now: Instant) -> Option<Snapshot> {
    let published_at = plan.last_published_at?;
    if plan.last.is_empty() {
        return None;
    }
    let dt = now.saturating_duration_since(published_at).as_secs_f64();
    Some(extrapolate(&plan.last, dt))
}

async fn run_tick_loop(inner: Weak<Inner>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        Tracker { inner }.tick().await;
    }
}

/// Live registration returned by [`Tracker::subscribe`].
///
/// Dropping it unsubscribes, as does calling [`Subscription::unsubscribe`].
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriberId,
    tracker: Weak<Inner>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        if let Some(inner) = self.tracker.upgrade() {
            Tracker { inner }.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
