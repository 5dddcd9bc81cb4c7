//! HERE Routing v8 provider.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime. Requests truck routing with per-span state
//! codes and imperial units:
//!
//! ```text
//! GET {base_url}/routes?transportMode=truck&origin=lat,lng&destination=lat,lng
//!     &return=summary&spans=stateCode,length&units=imperial&apiKey=…
//! ```
//!
//! Span and summary lengths still arrive in meters; `units` only affects
//! the provider's human-readable fields.

use std::time::Duration;

use async_trait::async_trait;
use ifta_engine::{Coordinate, RouteResponse};

use super::{ProviderError, RoutingProvider};
use crate::config::{RoutingConfig, API_KEY_ENV};
use crate::error::TrackerError;

pub struct HereRoutingProvider {
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl HereRoutingProvider {
    /// Build from config. The API key comes from `routing.api_key`, falling
    /// back to `IFTA_ROUTING_API_KEY`; a missing key is a configuration
    /// error raised here rather than on the first request.
    pub fn new(config: &RoutingConfig) -> Result<Self, TrackerError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                TrackerError::Config(format!(
                    "routing provider 'here' needs routing.api_key or {API_KEY_ENV}"
                ))
            })?;
        if config.base_url.trim().is_empty() {
            return Err(TrackerError::Config("routing.base_url is empty".to_string()));
        }
        Ok(HereRoutingProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: config.timeout(),
        })
    }

    pub fn routes_url(&self) -> String {
        format!("{}/routes", self.base_url)
    }

    /// Query parameters for one request, in wire order.
    pub fn query_params(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("transportMode", "truck".to_string()),
            ("origin", origin.to_string()),
            ("destination", destination.to_string()),
            ("return", "summary".to_string()),
            ("spans", "stateCode,length".to_string()),
            ("units", "imperial".to_string()),
            ("apiKey", self.api_key.clone()),
        ]
    }
}

#[async_trait]
impl RoutingProvider for HereRoutingProvider {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteResponse, ProviderError> {
        let url = self.routes_url();
        let params = self.query_params(origin, destination);
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .build()
                .into();
            let mut request = agent.get(&url);
            for (key, value) in &params {
                request = request.query(*key, value);
            }

            let response = request.call().map_err(|e| match e {
                ureq::Error::Timeout(_) => ProviderError::Timeout {
                    timeout_secs: timeout.as_secs(),
                },
                ureq::Error::StatusCode(status) => {
                    ProviderError::Unavailable(format!("HTTP {status}"))
                }
                other => ProviderError::Unavailable(other.to_string()),
            })?;

            let body = response.into_body().read_to_string().map_err(|e| match e {
                ureq::Error::Timeout(_) => ProviderError::Timeout {
                    timeout_secs: timeout.as_secs(),
                },
                other => ProviderError::Unavailable(format!("failed to read body: {other}")),
            })?;

            serde_json::from_str::<RouteResponse>(&body)
                .map_err(|e| ProviderError::Malformed(e.to_string()))
        })
        .await
        .map_err(|e| ProviderError::Unavailable(format!("task join error: {e}")))?
    }

    fn provider_id(&self) -> &str {
        "here"
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
