//! Static pre-captured dataset used when the live feed is off or unavailable.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use skytrace_core::{normalize_states, Snapshot, StatesResponse};
use tokio::sync::Mutex;

use crate::error::FallbackError;

/// Loads the fallback capture once and serves it from memory afterwards.
///
/// Served snapshots always carry the current time so the capture reads as
/// "now" to consumers.
pub struct FallbackDataset {
    path: PathBuf,
    cached: Mutex<Option<Snapshot>>,
    /// Set after the first failed load is reported; cleared by a success.
    failure_reported: AtomicBool,
}

impl FallbackDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
            failure_reported: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The dataset, or an empty snapshot when it cannot be read.
    pub async fn load(&self) -> Snapshot {
        match self.try_load().await {
            Ok(snapshot) => {
                self.failure_reported.store(false, Ordering::Relaxed);
                snapshot
            }
            Err(err) => {
                if self.failure_reported.swap(true, Ordering::Relaxed) {
                    tracing::debug!("Fallback dataset {} still unavailable: {}", self.path.display(), err);
                } else {
                    tracing::warn!("Fallback dataset {} unavailable: {}", self.path.display(), err);
                }
                Snapshot::empty(Utc::now())
            }
        }
    }

    pub async fn try_load(&self) -> Result<Snapshot, FallbackError> {
        let mut cached = self.cached.lock().await;
        if let Some(snapshot) = cached.as_ref() {
            return Ok(snapshot.clone().with_timestamp(Utc::now()));
        }

        let bytes = tokio::fs::read(&self.path).await?;
        let body: StatesResponse = serde_json::from_slice(&bytes)?;
        let snapshot = normalize_states(&body).with_timestamp(Utc::now());
        tracing::info!(
            "Loaded fallback dataset {} ({} aircraft)",
            self.path.display(),
            snapshot.len()
        );
        *cached = Some(snapshot.clone());
        Ok(snapshot)
    }
}
