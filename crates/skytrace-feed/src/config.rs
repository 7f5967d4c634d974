//! Feed endpoints and credentials.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STATES_URL: &str = "https://opensky-network.org/api/states/all";
pub const DEFAULT_TOKEN_URL: &str =
    "https://auth.opensky-network.org/auth/realms/opensky-network/protocol/openid-connect/token";
pub const DEFAULT_FALLBACK_PATH: &str = "data/flights-fallback.json";

#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub states_url: String,
    pub token_url: String,
    /// Without credentials requests go out unauthenticated.
    pub credentials: Option<OAuthCredentials>,
    /// Half-width of the query box around the center, in degrees.
    pub query_half_span_deg: f64,
    pub request_timeout: Duration,
    pub fallback_path: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            states_url: DEFAULT_STATES_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            credentials: None,
            query_half_span_deg: 5.0,
            request_timeout: Duration::from_secs(10),
            fallback_path: PathBuf::from(DEFAULT_FALLBACK_PATH),
        }
    }
}

impl FeedConfig {
    /// Set credentials when both parts are non-empty, clear them otherwise.
    pub fn with_credentials(mut self, client_id: &str, client_secret: &str) -> Self {
        let (id, secret) = (client_id.trim(), client_secret.trim());
        self.credentials = if id.is_empty() || secret.is_empty() {
            None
        } else {
            Some(OAuthCredentials {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
            })
        };
        self
    }
}
