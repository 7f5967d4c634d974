//! Server configuration from environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use skytrace_core::GeoPoint;
use skytrace_feed::config::{DEFAULT_FALLBACK_PATH, DEFAULT_STATES_URL, DEFAULT_TOKEN_URL};
use skytrace_feed::FeedConfig;
use skytrace_tracker::TrackerConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Center applied at startup, before any client sets one.
    pub initial_center: Option<GeoPoint>,
    pub tracker: TrackerConfig,
    pub feed: FeedConfig,
    /// Per-connection queue of undelivered snapshots on `/v1/stream`.
    pub stream_buffer: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = TrackerConfig::default();
        let tracker = TrackerConfig {
            tick_interval: env_millis("SKYTRACE_TICK_MS").unwrap_or(defaults.tick_interval),
            disable_grace: env_millis("SKYTRACE_GRACE_MS").unwrap_or(defaults.disable_grace),
            use_local_data: env_parse::<bool>("SKYTRACE_USE_LOCAL_DATA")
                .unwrap_or(defaults.use_local_data),
            live_refresh: env_parse::<u64>("SKYTRACE_LIVE_REFRESH_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.live_refresh),
            ..defaults
        };

        let feed = FeedConfig {
            states_url: env::var("OPENSKY_URL").unwrap_or_else(|_| DEFAULT_STATES_URL.to_string()),
            token_url: env::var("OPENSKY_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
            query_half_span_deg: env_parse("SKYTRACE_QUERY_SPAN_DEG").unwrap_or(5.0),
            fallback_path: env::var("SKYTRACE_FALLBACK_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_FALLBACK_PATH)),
            ..FeedConfig::default()
        }
        .with_credentials(
            &env::var("OPENSKY_CLIENT_ID").unwrap_or_default(),
            &env::var("OPENSKY_CLIENT_SECRET").unwrap_or_default(),
        );

        Self {
            server_port: env_parse("SKYTRACE_PORT").unwrap_or(3000),
            initial_center: env::var("SKYTRACE_CENTER")
                .ok()
                .and_then(|value| parse_center(&value)),
            tracker,
            feed,
            stream_buffer: env_parse("SKYTRACE_STREAM_BUFFER").unwrap_or(16),
        }
    }
}

/// Parse `"lon,lat"`.
pub fn parse_center(value: &str) -> Option<GeoPoint> {
    let (lon, lat) = value.split_once(',')?;
    let lon: f64 = lon.trim().parse().ok()?;
    let lat: f64 = lat.trim().parse().ok()?;
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return None;
    }
    Some(GeoPoint::new(lon, lat))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key)
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}
