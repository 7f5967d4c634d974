//! State-vector feed HTTP client.

use reqwest::{Client, StatusCode};
use skytrace_core::{GeoPoint, StatesResponse};

use crate::config::FeedConfig;
use crate::error::FeedError;

/// HTTP client for the state-vector endpoint.
pub struct FeedClient {
    client: Client,
    states_url: String,
    half_span_deg: f64,
}

impl FeedClient {
    pub fn new(config: &FeedConfig, client: Client) -> Self {
        Self {
            client,
            states_url: config.states_url.clone(),
            half_span_deg: config.query_half_span_deg.abs(),
        }
    }

    /// Fetch raw state vectors inside the query box around `center`.
    pub async fn fetch_states(
        &self,
        center: GeoPoint,
        bearer: Option<&str>,
    ) -> Result<StatesResponse, FeedError> {
        let bbox = [
            ("lamin", (center.lat - self.half_span_deg).max(-90.0)),
            ("lomin", (center.lon - self.half_span_deg).max(-180.0)),
            ("lamax", (center.lat + self.half_span_deg).min(90.0)),
            ("lomax", (center.lon + self.half_span_deg).min(180.0)),
        ];

        let mut request = self.client.get(self.states_url.as_str()).query(&bbox);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(FeedError::RateLimited),
            StatusCode::UNAUTHORIZED => return Err(FeedError::Unauthorized),
            status if !status.is_success() => return Err(FeedError::Status(status)),
            _ => {}
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
