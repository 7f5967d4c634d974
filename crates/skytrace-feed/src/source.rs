//! The position source the tracker pulls snapshots from.

use async_trait::async_trait;
use reqwest::Client;
use skytrace_core::{normalize_states, GeoPoint, Snapshot};

use crate::auth::TokenManager;
use crate::client::FeedClient;
use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::fallback::FallbackDataset;

/// Produces normalized snapshots from the live feed or the fallback capture.
///
/// Both paths yield the same [`Snapshot`] shape, so consumers cannot tell
/// where the data came from.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// One live fetch around `center`. [`FeedError::RateLimited`] is kept
    /// distinct from every other failure.
    async fn fetch_live(&self, center: GeoPoint) -> Result<Snapshot, FeedError>;

    /// The fallback capture; empty when it cannot be loaded.
    async fn load_fallback(&self) -> Snapshot;
}

/// OpenSky-style state-vector feed plus a local fallback file.
pub struct OpenSkySource {
    client: FeedClient,
    auth: TokenManager,
    fallback: FallbackDataset,
}

impl OpenSkySource {
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client: FeedClient::new(config, http.clone()),
            auth: TokenManager::new(config, http),
            fallback: FallbackDataset::new(config.fallback_path.clone()),
        })
    }
}

#[async_trait]
impl PositionSource for OpenSkySource {
    async fn fetch_live(&self, center: GeoPoint) -> Result<Snapshot, FeedError> {
        let token = self.auth.bearer_token().await;
        match self.client.fetch_states(center, token.as_deref()).await {
            Ok(body) => Ok(normalize_states(&body)),
            Err(FeedError::Unauthorized) => {
                tracing::warn!("Feed returned 401; dropping cached credentials");
                self.auth.invalidate().await;
                Err(FeedError::Unauthorized)
            }
            Err(err) => Err(err),
        }
    }

    async fn load_fallback(&self) -> Snapshot {
        self.fallback.load().await
    }
}
