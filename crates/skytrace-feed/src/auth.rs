//! Feed authentication (OAuth2 client credentials with a cached token).

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::{FeedConfig, OAuthCredentials};
use crate::error::AuthError;

const TOKEN_REFRESH_LEEWAY_SECS: u64 = 60;
const DEFAULT_TOKEN_TTL_SECS: u64 = 1800;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Serialize)]
struct OAuthTokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub struct TokenManager {
    credentials: Option<OAuthCredentials>,
    token_url: String,
    client: Client,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(config: &FeedConfig, client: Client) -> Self {
        Self {
            credentials: config.credentials.clone(),
            token_url: config.token_url.clone(),
            client,
            cached: RwLock::new(None),
        }
    }

    /// Bearer token for the next feed request.
    ///
    /// Returns `None` without credentials or when the token endpoint fails;
    /// the caller then proceeds unauthenticated.
    pub async fn bearer_token(&self) -> Option<String> {
        let credentials = self.credentials.as_ref()?;
        if let Some(token) = self.cached_token().await {
            return Some(token);
        }

        match self.fetch_token(credentials).await {
            Ok(fresh) => {
                let token = fresh.access_token.clone();
                *self.cached.write().await = Some(fresh);
                tracing::debug!("Feed access token refreshed");
                Some(token)
            }
            Err(err) => {
                tracing::warn!("Feed authentication failed, continuing unauthenticated: {}", err);
                None
            }
        }
    }

    /// Forget the cached token so the next call requests a new one.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn cached_token(&self) -> Option<String> {
        let guard = self.cached.read().await;
        guard.as_ref().and_then(|cached| {
            if cached.expires_at > Instant::now() {
                Some(cached.access_token.clone())
            } else {
                None
            }
        })
    }

    async fn fetch_token(&self, credentials: &OAuthCredentials) -> Result<CachedToken, AuthError> {
        let request = OAuthTokenRequest {
            grant_type: "client_credentials",
            client_id: credentials.client_id.as_str(),
            client_secret: credentials.client_secret.as_str(),
        };

        let response = self
            .client
            .post(self.token_url.as_str())
            .form(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::Status(response.status()));
        }
        let payload: OAuthTokenResponse = response.json().await?;

        // Short-lived tokens still get half their lifetime, never zero.
        let expires_in = payload.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let ttl = expires_in
            .saturating_sub(TOKEN_REFRESH_LEEWAY_SECS)
            .max(expires_in / 2)
            .max(1);

        Ok(CachedToken {
            access_token: payload.access_token,
            expires_at: Instant::now() + Duration::from_secs(ttl),
        })
    }
}
