//! Skytrace CLI - command line tools around the flight tracker.
//!
//! Binaries:
//! - skytrace watch: run a tracker in-process and print each snapshot
//! - skytrace normalize: convert a raw state-vector capture to GeoJSON

pub mod report;

pub use report::{normalize_file, summary_line};
