//! Watch the shared tracker from a terminal, or inspect a raw capture.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use skytrace_cli::{normalize_file, summary_line};
use skytrace_feed::{FeedConfig, OpenSkySource};
use skytrace_tracker::{Tracker, TrackerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a tracker in-process and print every published snapshot
    Watch {
        /// Center longitude (default: Tel Aviv)
        #[arg(long, default_value_t = 34.7818, allow_hyphen_values = true)]
        lon: f64,

        /// Center latitude (default: Tel Aviv)
        #[arg(long, default_value_t = 32.0853, allow_hyphen_values = true)]
        lat: f64,

        /// How long to watch, in seconds
        #[arg(long, default_value_t = 10)]
        seconds: u64,

        /// Query the live feed instead of animating the fallback capture
        #[arg(long)]
        live: bool,

        /// Seconds between live fetches; ticks in between extrapolate
        #[arg(long, default_value_t = 0)]
        refresh: u64,

        /// Fallback capture to animate
        #[arg(long, default_value = skytrace_feed::config::DEFAULT_FALLBACK_PATH)]
        fallback: PathBuf,

        #[arg(long, env = "OPENSKY_CLIENT_ID", default_value = "", hide_env_values = true)]
        client_id: String,

        #[arg(long, env = "OPENSKY_CLIENT_SECRET", default_value = "", hide_env_values = true)]
        client_secret: String,
    },
    /// Print a raw state-vector capture as GeoJSON
    Normalize {
        /// Path to a states response JSON file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skytrace_tracker=info".parse()?)
                .add_directive("skytrace_feed=info".parse()?),
        )
        .init();

    match Args::parse().command {
        Command::Watch {
            lon,
            lat,
            seconds,
            live,
            refresh,
            fallback,
            client_id,
            client_secret,
        } => {
            let feed = FeedConfig {
                fallback_path: fallback,
                ..FeedConfig::default()
            }
            .with_credentials(&client_id, &client_secret);
            let config = TrackerConfig {
                use_local_data: !live,
                live_refresh: Duration::from_secs(refresh),
                ..TrackerConfig::default()
            };
            watch(config, feed, lon, lat, Duration::from_secs(seconds)).await
        }
        Command::Normalize { file } => {
            let geojson = normalize_file(&file)?;
            println!("{}", serde_json::to_string_pretty(&geojson)?);
            Ok(())
        }
    }
}

async fn watch(
    config: TrackerConfig,
    feed: FeedConfig,
    lon: f64,
    lat: f64,
    duration: Duration,
) -> anyhow::Result<()> {
    let source = OpenSkySource::new(&feed).context("failed to build feed client")?;
    let tracker = Tracker::new(config, Arc::new(source));
    tracker.set_center(lon, lat);

    println!("Watching around {:.4},{:.4} for {}s...", lon, lat, duration.as_secs());
    let subscription = tracker.subscribe(|snapshot, paths| {
        println!("{}", summary_line(&snapshot, &paths));
        Ok(())
    });

    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = tokio::signal::ctrl_c() => println!("Interrupted"),
    }

    subscription.unsubscribe();
    tracker.disable();
    Ok(())
}
