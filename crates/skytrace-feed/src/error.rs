use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the state-vector feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// HTTP 429. The tracker stops using the live feed for the session.
    #[error("feed rate limited")]
    RateLimited,
    #[error("feed rejected credentials")]
    Unauthorized,
    #[error("feed returned error status: {0}")]
    Status(StatusCode),
    #[error("feed request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("feed response parse failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FeedError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FeedError::RateLimited)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("token endpoint returned error status: {0}")]
    Status(StatusCode),
}

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("fallback dataset read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("fallback dataset parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}
