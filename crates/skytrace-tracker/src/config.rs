//! Tracker timing and data-strategy settings.

use std::time::Duration;

use skytrace_core::MAX_TRACK_POINTS;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Period of the tick timer. Paces the extrapolation animation.
    pub tick_interval: Duration,
    /// How long the tracker stays enabled after the last subscriber leaves.
    pub disable_grace: Duration,
    /// Center moves larger than this (either axis, degrees) tick immediately.
    pub recenter_threshold_deg: f64,
    /// Never call the live feed; animate the fallback capture instead.
    ///
    /// On by default: out of the box the tracker shows simulated motion over
    /// a static snapshot, not live traffic.
    pub use_local_data: bool,
    /// Minimum age of the last live fetch before fetching again; ticks in
    /// between extrapolate. Zero fetches on every tick.
    pub live_refresh: Duration,
    pub max_track_points: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            disable_grace: Duration::from_secs(2),
            recenter_threshold_deg: 0.1,
            use_local_data: true,
            live_refresh: Duration::ZERO,
            max_track_points: MAX_TRACK_POINTS,
        }
    }
}
