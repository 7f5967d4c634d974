//! Tracker lifecycle and tick-strategy tests.
//!
//! All tests run on a paused clock; `settle()` lets spawned ticks run
//! without moving time forward meaningfully.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use skytrace_core::{project, AircraftState, GeoPoint, PathCollection, Position, Snapshot};
use skytrace_feed::{FeedError, PositionSource};
use skytrace_tracker::{TickOutcome, Tracker, TrackerConfig, TrackerStatus};

enum LiveMode {
    Ok(Snapshot),
    RateLimited,
    Unavailable,
}

struct FakeSource {
    fallback: Snapshot,
    live: Mutex<LiveMode>,
    live_calls: AtomicUsize,
    fallback_calls: AtomicUsize,
}

impl FakeSource {
    fn new(fallback: Snapshot, live: LiveMode) -> Arc<Self> {
        Arc::new(Self {
            fallback,
            live: Mutex::new(live),
            live_calls: AtomicUsize::new(0),
            fallback_calls: AtomicUsize::new(0),
        })
    }

    fn set_live(&self, mode: LiveMode) {
        *self.live.lock().unwrap() = mode;
    }

    fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    fn fallback_calls(&self) -> usize {
        self.fallback_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositionSource for FakeSource {
    async fn fetch_live(&self, _center: GeoPoint) -> Result<Snapshot, FeedError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        let live = self.live.lock().unwrap();
        match &*live {
            LiveMode::Ok(snapshot) => Ok(snapshot.clone()),
            LiveMode::RateLimited => Err(FeedError::RateLimited),
            LiveMode::Unavailable => Err(FeedError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)),
        }
    }

    async fn load_fallback(&self) -> Snapshot {
        self.fallback_calls.fetch_add(1, Ordering::SeqCst);
        self.fallback.clone().with_timestamp(Utc::now())
    }
}

fn tel_aviv_fleet() -> Snapshot {
    Snapshot::new(
        Utc::now(),
        vec![
            AircraftState::new("738065", Position::new(34.78, 32.08, 3000.0), 0.0, 150.0, 0.0)
                .with_callsign(Some("ELY001".to_string())),
            AircraftState::new("738066", Position::new(34.90, 32.20, 9000.0), 90.0, 230.0, 0.0)
                .with_callsign(Some("ELY002".to_string())),
            AircraftState::new("4b1805", Position::new(34.60, 31.90, 11000.0), 225.0, 240.0, -3.0),
        ],
    )
}

type Received = Arc<Mutex<Vec<Arc<Snapshot>>>>;

fn recorder() -> (
    Received,
    impl Fn(Arc<Snapshot>, Arc<PathCollection>) -> anyhow::Result<()> + Send + Sync + 'static,
) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    (received, move |snapshot, _paths| {
        sink.lock().unwrap().push(snapshot);
        Ok(())
    })
}

fn noop(_: Arc<Snapshot>, _: Arc<PathCollection>) -> anyhow::Result<()> {
    Ok(())
}

fn count(received: &Received) -> usize {
    received.lock().unwrap().len()
}

fn latest(received: &Received) -> Arc<Snapshot> {
    received.lock().unwrap().last().cloned().expect("at least one delivery")
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn live_config() -> TrackerConfig {
    TrackerConfig {
        use_local_data: false,
        ..TrackerConfig::default()
    }
}

/// Timer far enough out that only the immediate tick on enable fires.
fn manual_config(use_local_data: bool) -> TrackerConfig {
    TrackerConfig {
        tick_interval: Duration::from_secs(3600),
        use_local_data,
        ..TrackerConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn fallback_then_dead_reckoning_over_tel_aviv() {
    let source = FakeSource::new(tel_aviv_fleet(), LiveMode::Unavailable);
    let tracker = Tracker::new(TrackerConfig::default(), source.clone());
    tracker.set_center(34.78, 32.08);

    let (received, callback) = recorder();
    let _sub = tracker.subscribe(callback);
    assert_eq!(count(&received), 1);
    assert!(latest(&received).is_empty());
    assert_eq!(tracker.status(), TrackerStatus::Enabled);

    settle().await;
    let first = latest(&received);
    assert_eq!(first.len(), 3);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(count(&received), 3);
    let second = latest(&received);
    assert_eq!(second.len(), 3);
    assert_eq!((second.timestamp - first.timestamp).num_milliseconds(), 1000);

    for before in &first.aircraft {
        let after = second.get(&before.id).expect("aircraft still present");
        let expected = project(before.position, before.heading_deg, before.velocity_mps, 1.0);
        assert!((after.position.lat - expected.lat).abs() < 1e-9);
        assert!((after.position.lon - expected.lon).abs() < 1e-9);
        assert_eq!(after.position.altitude_m, before.position.altitude_m);
    }

    assert_eq!(source.fallback_calls(), 1);
    assert_eq!(source.live_calls(), 0);
    assert_eq!(tracker.get_paths().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn subscribe_replays_current_snapshot_synchronously() {
    let source = FakeSource::new(tel_aviv_fleet(), LiveMode::Unavailable);
    let tracker = Tracker::new(manual_config(true), source);
    tracker.set_center(34.78, 32.08);
    let _first = tracker.subscribe(noop);
    settle().await;
    assert_eq!(tracker.get_data().len(), 3);

    let (received, callback) = recorder();
    let _second = tracker.subscribe(callback);
    assert_eq!(count(&received), 1);
    assert_eq!(latest(&received).len(), 3);
    assert!(Arc::ptr_eq(&latest(&received), &tracker.get_data()));
}

#[tokio::test(start_paused = true)]
async fn resubscribe_within_grace_keeps_history() {
    let source = FakeSource::new(tel_aviv_fleet(), LiveMode::Unavailable);
    let tracker = Tracker::new(TrackerConfig::default(), source);
    tracker.set_center(34.78, 32.08);

    let sub = tracker.subscribe(noop);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(tracker.get_paths().len(), 3);

    sub.unsubscribe();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(tracker.status(), TrackerStatus::Enabled);

    let (received, callback) = recorder();
    let sub = tracker.subscribe(callback);
    assert_eq!(latest(&received).len(), 3);
    assert_eq!(tracker.get_paths().len(), 3);

    // The cancelled timer must not fire later.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(tracker.status(), TrackerStatus::Enabled);
    assert!(tracker.get_paths().paths[0].points.len() > 2);
    drop(sub);
}

#[tokio::test(start_paused = true)]
async fn resubscribe_after_grace_starts_empty() {
    let source = FakeSource::new(tel_aviv_fleet(), LiveMode::Unavailable);
    let tracker = Tracker::new(TrackerConfig::default(), source);
    tracker.set_center(34.78, 32.08);

    let sub = tracker.subscribe(noop);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!tracker.get_paths().is_empty());

    sub.unsubscribe();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(tracker.status(), TrackerStatus::Disabled);
    assert!(tracker.get_data().is_empty());
    assert!(tracker.get_paths().is_empty());

    let (received, callback) = recorder();
    let _sub = tracker.subscribe(callback);
    assert!(latest(&received).is_empty());
    assert_eq!(tracker.status(), TrackerStatus::Enabled);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_switches_to_local_data_for_good() {
    let source = FakeSource::new(tel_aviv_fleet(), LiveMode::RateLimited);
    let tracker = Tracker::new(live_config(), source.clone());
    tracker.set_center(34.78, 32.08);

    let (received, callback) = recorder();
    let _sub = tracker.subscribe(callback);
    settle().await;
    assert_eq!(source.live_calls(), 1);
    assert_eq!(source.fallback_calls(), 1);
    assert_eq!(latest(&received).len(), 3);
    assert!(tracker.is_rate_limited());

    source.set_live(LiveMode::Ok(tel_aviv_fleet()));
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(source.live_calls(), 1);
    assert_eq!(count(&received), 5);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_skips_tick_without_notifying() {
    let source = FakeSource::new(tel_aviv_fleet(), LiveMode::Unavailable);
    let tracker = Tracker::new(manual_config(false), source.clone());
    tracker.set_center(34.78, 32.08);

    let (received, callback) = recorder();
    let _sub = tracker.subscribe(callback);
    settle().await;
    assert_eq!(source.live_calls(), 1);
    assert_eq!(count(&received), 1);

    assert_eq!(tracker.tick().await, TickOutcome::Skipped);
    assert_eq!(count(&received), 1);
    assert!(tracker.get_data().is_empty());
    assert!(tracker.get_paths().is_empty());
    assert!(!tracker.is_rate_limited());
    assert_eq!(source.fallback_calls(), 0);

    source.set_live(LiveMode::Ok(tel_aviv_fleet()));
    assert_eq!(tracker.tick().await, TickOutcome::Published { aircraft: 3 });
    assert_eq!(count(&received), 2);
}

#[tokio::test(start_paused = true)]
async fn large_center_moves_tick_immediately() {
    let source = FakeSource::new(tel_aviv_fleet(), LiveMode::Ok(tel_aviv_fleet()));
    let tracker = Tracker::new(manual_config(false), source.clone());

    let _sub = tracker.subscribe(noop);
    settle().await;
    assert_eq!(source.live_calls(), 0);
    assert_eq!(tracker.tick().await, TickOutcome::Idle);

    tracker.set_center(34.78, 32.08);
    settle().await;
    assert_eq!(source.live_calls(), 1);

    tracker.set_center(34.80, 32.10);
    settle().await;
    assert_eq!(source.live_calls(), 1);

    tracker.set_center(35.50, 32.08);
    settle().await;
    assert_eq!(source.live_calls(), 2);
    assert_eq!(tracker.center(), Some(GeoPoint::new(35.50, 32.08)));
}

#[tokio::test(start_paused = true)]
async fn disable_is_idempotent_and_stops_ticks() {
    let source = FakeSource::new(tel_aviv_fleet(), LiveMode::Unavailable);
    let tracker = Tracker::new(TrackerConfig::default(), source.clone());
    tracker.set_center(34.78, 32.08);

    let (received, callback) = recorder();
    let _sub = tracker.subscribe(callback);
    settle().await;
    let delivered = count(&received);

    tracker.disable();
    tracker.disable();
    assert_eq!(tracker.status(), TrackerStatus::Disabled);
    assert!(tracker.get_data().is_empty());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(count(&received), delivered);
    assert_eq!(source.fallback_calls(), 1);
    assert_eq!(tracker.tick().await, TickOutcome::Idle);
}

#[tokio::test(start_paused = true)]
async fn published_timestamps_never_go_backwards() {
    let stale = tel_aviv_fleet().with_timestamp(Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap());
    let source = FakeSource::new(tel_aviv_fleet(), LiveMode::Ok(stale));
    let tracker = Tracker::new(live_config(), source);
    tracker.set_center(34.78, 32.08);

    let (received, callback) = recorder();
    let _sub = tracker.subscribe(callback);
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 4);
    for pair in received.windows(2) {
        assert!(pair[1].timestamp >= pair[0].timestamp);
    }
}

#[tokio::test(start_paused = true)]
async fn live_refresh_extrapolates_between_fetches() {
    let source = FakeSource::new(tel_aviv_fleet(), LiveMode::Ok(tel_aviv_fleet()));
    let config = TrackerConfig {
        live_refresh: Duration::from_secs(10),
        ..live_config()
    };
    let tracker = Tracker::new(config, source.clone());
    tracker.set_center(34.78, 32.08);

    let (received, callback) = recorder();
    let _sub = tracker.subscribe(callback);
    tokio::time::sleep(Duration::from_millis(5500)).await;
    assert_eq!(source.live_calls(), 1);
    assert_eq!(count(&received), 7);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(source.live_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failing_subscribers_do_not_block_others() {
    let source = FakeSource::new(tel_aviv_fleet(), LiveMode::Unavailable);
    let tracker = Tracker::new(TrackerConfig::default(), source);
    tracker.set_center(34.78, 32.08);

    let _bad = tracker.subscribe(|_, _| anyhow::bail!("renderer detached"));
    let _worse = tracker.subscribe(|_, _| panic!("renderer crashed"));
    let (received, callback) = recorder();
    let _good = tracker.subscribe(callback);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(count(&received), 3);
    assert_eq!(latest(&received).len(), 3);
}
