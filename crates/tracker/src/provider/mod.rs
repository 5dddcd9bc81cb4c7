//! Truck routing provider abstraction.
//!
//! A [`RoutingProvider`] answers one origin → destination request with a raw
//! [`RouteResponse`]; apportioning it is the engine's job. Two providers
//! ship with the crate:
//!
//! - [`HereRoutingProvider`]: HERE Routing v8 over HTTPS
//! - [`StaticRouteProvider`]: canned response from memory or a fixture file

pub mod here;
pub mod static_provider;

pub use here::HereRoutingProvider;
pub use static_provider::StaticRouteProvider;

use async_trait::async_trait;
use ifta_engine::{Coordinate, RouteResponse};

// ──────────────────────────────────────────────
// ProviderError
// ──────────────────────────────────────────────

/// Failure talking to the routing provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// No answer within the bounded timeout.
    #[error("routing provider timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Transport failure or non-success HTTP status.
    #[error("routing provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered but the body is not a route response.
    #[error("malformed routing response: {0}")]
    Malformed(String),
}

// ──────────────────────────────────────────────
// RoutingProvider
// ──────────────────────────────────────────────

/// Truck-specific routing with per-span jurisdiction annotations.
///
/// Implementations perform exactly one request per call; retry policy
/// belongs to the caller.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteResponse, ProviderError>;

    /// Short identifier used in logs.
    fn provider_id(&self) -> &str;
}
