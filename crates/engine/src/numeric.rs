//! Distance arithmetic using `rust_decimal`.
//!
//! No `f64` in the mileage path: meters are converted with an exact decimal
//! factor and rounded with `RoundingStrategy::MidpointNearestEven`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Miles per meter (0.000621371).
pub const MILES_PER_METER: Decimal = Decimal::from_parts(621_371, 0, 0, false, 9);

/// Default tolerated gap between apportioned and summary miles (0.5%).
pub const DEFAULT_COVERAGE_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Default tolerated odometer variance (10%).
pub const DEFAULT_RECONCILIATION_TOLERANCE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Convert meters to miles without rounding.
pub fn meters_to_miles(meters: Decimal) -> Decimal {
    meters * MILES_PER_METER
}

/// Round a mileage figure to one decimal place.
pub fn round_tenth(miles: Decimal) -> Decimal {
    miles.round_dp_with_strategy(1, RoundingStrategy::MidpointNearestEven)
}

/// Round a duration in seconds to a whole number of seconds.
pub fn round_seconds(seconds: Decimal) -> u64 {
    seconds
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_u64()
        .unwrap_or(0)
}

/// `|a - b| / reference`, or `None` when the reference is zero.
pub fn relative_difference(a: Decimal, b: Decimal, reference: Decimal) -> Option<Decimal> {
    if reference.is_zero() {
        return None;
    }
    (a - b).abs().checked_div(reference.abs())
}

/// Tolerances applied by the span parser and the odometer reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApportionPolicy {
    /// Maximum `|total - apportioned| / total` accepted from the provider.
    pub coverage_tolerance: Decimal,
    /// Maximum `|odometer delta - route miles| / route miles` treated as a match.
    pub reconciliation_tolerance: Decimal,
}

impl Default for ApportionPolicy {
    fn default() -> Self {
        ApportionPolicy {
            coverage_tolerance: DEFAULT_COVERAGE_TOLERANCE,
            reconciliation_tolerance: DEFAULT_RECONCILIATION_TOLERANCE,
        }
    }
}
