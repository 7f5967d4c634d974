//! Shared library surface for the skytrace server and its tests.

pub mod api;
pub mod config;
pub mod state;

pub use state::AppState;

/// `RUST_LOG` plus defaults for every workspace crate that logs.
pub fn log_filter() -> anyhow::Result<tracing_subscriber::EnvFilter> {
    Ok(tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("skytrace_server=debug".parse()?)
        .add_directive("skytrace_tracker=info".parse()?)
        .add_directive("skytrace_feed=info".parse()?))
}
