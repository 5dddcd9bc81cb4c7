//! Static routing provider: always answers with the same response.
//!
//! Used for offline replays of a saved provider payload and in tests.

use std::path::Path;

use async_trait::async_trait;
use ifta_engine::{Coordinate, RouteResponse};

use super::{ProviderError, RoutingProvider};
use crate::error::TrackerError;

pub struct StaticRouteProvider {
    response: RouteResponse,
}

impl StaticRouteProvider {
    pub fn new(response: RouteResponse) -> Self {
        StaticRouteProvider { response }
    }

    /// Load a saved provider response from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, TrackerError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::Config(format!(
                "cannot read route fixture '{}': {}",
                path.display(),
                e
            ))
        })?;
        let response = RouteResponse::from_json(&raw)?;
        Ok(StaticRouteProvider { response })
    }
}

#[async_trait]
impl RoutingProvider for StaticRouteProvider {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteResponse, ProviderError> {
        log::debug!("static route {} -> {}", origin, destination);
        Ok(self.response.clone())
    }

    fn provider_id(&self) -> &str {
        "static"
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "routes": [{
            "sections": [{
                "summary": {"length": 804672, "duration": 27000},
                "spans": [
                    {"stateCode": "TX", "length": 482803},
                    {"stateCode": "OK", "length": 321869}
                ]
            }]
        }]
    }"#;

    fn coords() -> (Coordinate, Coordinate) {
        (
            Coordinate::new(32.7767, -96.797).unwrap(),
            Coordinate::new(35.4676, -97.5164).unwrap(),
        )
    }

    #[tokio::test]
    async fn from_file_returns_fixture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let provider = StaticRouteProvider::from_file(file.path()).unwrap();
        let (o, d) = coords();
        let response = provider.route(o, d).await.unwrap();
        assert_eq!(response.routes.len(), 1);
        assert_eq!(response.routes[0].sections[0].spans.len(), 2);
    }

    #[test]
    fn missing_fixture_is_config_error() {
        let result = StaticRouteProvider::from_file(Path::new("/nonexistent/route.json"));
        assert!(matches!(result, Err(TrackerError::Config(_))));
    }

    #[test]
    fn malformed_fixture_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        let result = StaticRouteProvider::from_file(file.path());
        assert!(matches!(
            result,
            Err(TrackerError::Apportion(
                ifta_engine::ApportionError::MalformedResponse(_)
            ))
        ));
    }
}
