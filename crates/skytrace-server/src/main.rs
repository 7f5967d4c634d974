//! Skytrace server - one shared flight tracker for every map renderer.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skytrace_feed::OpenSkySource;
use skytrace_server::{api, config::Config, AppState};
use skytrace_tracker::Tracker;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(skytrace_server::log_filter()?)
        .init();

    tracing::info!("Starting skytrace server...");

    let config = Config::from_env();
    if config.tracker.use_local_data {
        tracing::info!(
            "Local-data mode: animating {} instead of querying the live feed",
            config.feed.fallback_path.display()
        );
    }

    let source = OpenSkySource::new(&config.feed).context("failed to build feed client")?;
    let tracker = Tracker::new(config.tracker.clone(), Arc::new(source));
    if let Some(center) = config.initial_center {
        tracker.set_center(center.lon, center.lat);
    }

    let state = Arc::new(AppState::new(tracker.clone(), &config));
    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracker.disable();
    tracing::info!("Skytrace server stopped");
    Ok(())
}
