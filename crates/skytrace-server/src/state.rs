//! State shared by every request handler.

use skytrace_tracker::Tracker;

use crate::config::Config;

/// The one tracker instance plus per-connection settings.
pub struct AppState {
    pub tracker: Tracker,
    pub stream_buffer: usize,
}

impl AppState {
    pub fn new(tracker: Tracker, config: &Config) -> Self {
        Self {
            tracker,
            stream_buffer: config.stream_buffer.max(1),
        }
    }
}
