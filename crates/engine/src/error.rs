use rust_decimal::Decimal;

use crate::types::LegStatus;

/// Domain errors produced by the apportionment engine.
///
/// None of these indicate an infrastructure fault; they describe input that
/// cannot be apportioned or a lifecycle rule that was violated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApportionError {
    /// The provider response contained no route, or a route with no sections.
    #[error("routing provider returned no route")]
    NoRouteFound,

    /// Jurisdiction-annotated spans do not account for the summary distance.
    #[error(
        "provider coverage gap: {apportioned_miles} of {total_miles} miles apportioned (gap ratio {gap_ratio})"
    )]
    ProviderCoverageGap {
        total_miles: Decimal,
        apportioned_miles: Decimal,
        gap_ratio: Decimal,
    },

    /// The provider payload could not be decoded.
    #[error("malformed routing response: {0}")]
    MalformedResponse(String),

    /// Ending odometer is below the starting odometer.
    #[error("invalid odometer readings: ending {ending} is below starting {starting}")]
    InvalidOdometer { starting: Decimal, ending: Decimal },

    /// A lifecycle transition not permitted by the leg state machine.
    #[error("invalid leg transition: {from} -> {to}")]
    InvalidTransition { from: LegStatus, to: LegStatus },

    /// Origin or destination is not set on the leg.
    #[error("leg {leg_id} is missing its {which} coordinate")]
    MissingCoordinate { leg_id: String, which: &'static str },

    /// Latitude/longitude outside the valid range.
    #[error("coordinate out of range: {latitude},{longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

impl ApportionError {
    /// Stable machine-readable code, surfaced in API responses and leg failure records.
    pub fn code(&self) -> &'static str {
        match self {
            ApportionError::NoRouteFound => "NO_ROUTE_FOUND",
            ApportionError::ProviderCoverageGap { .. } => "PROVIDER_COVERAGE_GAP",
            ApportionError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            ApportionError::InvalidOdometer { .. } => "INVALID_ODOMETER",
            ApportionError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ApportionError::MissingCoordinate { .. } => "MISSING_COORDINATE",
            ApportionError::InvalidCoordinate { .. } => "INVALID_COORDINATE",
        }
    }
}
