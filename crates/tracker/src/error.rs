use ifta_engine::ApportionError;
use ifta_storage::StorageError;
use time::OffsetDateTime;

/// Errors returned by the tracker and report builder.
///
/// Domain conditions (coverage gaps, stale state, invalid odometer pairs)
/// and infrastructure faults (provider down, store unavailable) share this
/// type; [`TrackerError::is_infrastructure`] tells them apart.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Apportion(#[from] ApportionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The routing provider did not answer within the configured bound.
    #[error("routing provider timed out after {timeout_secs}s")]
    ProviderTimeout { timeout_secs: u64 },

    /// Transport failure or non-success HTTP status from the provider.
    #[error("routing provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A provider request for this leg is already outstanding.
    #[error("route calculation already in flight for leg {leg_id}")]
    RouteInFlight { leg_id: String },

    /// Caller input the tracker refuses before touching the store.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("live location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("invalid report scope: from {from} is not before to {to}")]
    InvalidScope {
        from: OffsetDateTime,
        to: OffsetDateTime,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl TrackerError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::Apportion(e) => e.code(),
            TrackerError::Storage(e) => e.code(),
            TrackerError::ProviderTimeout { .. } => "PROVIDER_TIMEOUT",
            TrackerError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            TrackerError::RouteInFlight { .. } => "ROUTE_IN_FLIGHT",
            TrackerError::InvalidRequest(_) => "INVALID_REQUEST",
            TrackerError::LocationUnavailable(_) => "LOCATION_UNAVAILABLE",
            TrackerError::InvalidScope { .. } => "INVALID_SCOPE",
            TrackerError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// True for faults outside the engine's domain: network, store, config.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            TrackerError::Storage(e) => e.is_infrastructure(),
            TrackerError::ProviderUnavailable(_)
            | TrackerError::LocationUnavailable(_)
            | TrackerError::Config(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifta_engine::LegStatus;

    #[test]
    fn codes_pass_through_wrapped_errors() {
        let e: TrackerError = ApportionError::NoRouteFound.into();
        assert_eq!(e.code(), "NO_ROUTE_FOUND");
        assert!(!e.is_infrastructure());

        let e: TrackerError = StorageError::StaleState {
            leg_id: "leg-1".into(),
            expected: LegStatus::RouteCalculated,
            found: LegStatus::InProgress,
        }
        .into();
        assert_eq!(e.code(), "STALE_STATE");
        assert!(!e.is_infrastructure());
    }

    #[test]
    fn infrastructure_classification() {
        assert!(TrackerError::ProviderUnavailable("503".into()).is_infrastructure());
        assert!(TrackerError::Storage(StorageError::Backend("disk".into())).is_infrastructure());
        assert!(!TrackerError::ProviderTimeout { timeout_secs: 5 }.is_infrastructure());
        assert_eq!(
            TrackerError::ProviderTimeout { timeout_secs: 5 }.code(),
            "PROVIDER_TIMEOUT"
        );
    }
}
