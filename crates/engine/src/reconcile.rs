//! Odometer reconciliation.
//!
//! Cross-checks routed distance against the driver's odometer delta. The
//! verdict is advisory only: routed miles stay authoritative and a
//! discrepancy never blocks completion.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ApportionError;
use crate::numeric::{relative_difference, ApportionPolicy};
use crate::types::TripLeg;

/// Outcome class of an odometer check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Match,
    Discrepancy,
    /// Ending reading below starting reading; no variance could be computed.
    InvalidOdometer,
}

impl Verdict {
    /// Whether the leg should be queued for human review.
    pub fn needs_review(&self) -> bool {
        !matches!(self, Verdict::Match)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Match => "MATCH",
            Verdict::Discrepancy => "RECONCILIATION_DISCREPANCY",
            Verdict::InvalidOdometer => "INVALID_ODOMETER",
        }
    }
}

/// Verdict attached to a completed leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub verdict: Verdict,
    pub odometer_delta: Option<Decimal>,
    /// `|delta - route| / route`, rounded to four places. `None` when the
    /// route distance is zero or the readings were invalid.
    pub variance: Option<Decimal>,
}

/// Compare an odometer delta against routed miles.
///
/// Returns `InvalidOdometer` when `ending < starting`. A zero-mile route
/// matches only a zero delta.
pub fn reconcile(
    starting: Decimal,
    ending: Decimal,
    total_route_miles: Decimal,
    tolerance: Decimal,
) -> Result<Reconciliation, ApportionError> {
    let delta = ending - starting;
    if delta < Decimal::ZERO {
        return Err(ApportionError::InvalidOdometer { starting, ending });
    }

    let variance = relative_difference(delta, total_route_miles, total_route_miles);
    let verdict = match variance {
        Some(v) if v <= tolerance => Verdict::Match,
        Some(_) => Verdict::Discrepancy,
        None if delta.is_zero() => Verdict::Match,
        None => Verdict::Discrepancy,
    };

    Ok(Reconciliation {
        verdict,
        odometer_delta: Some(delta),
        variance: variance.map(|v| v.round_dp(4)),
    })
}

/// Reconcile a leg's recorded odometer readings, if it has both.
///
/// `None` means reconciliation was skipped. An invalid pair of readings is
/// folded into an `InvalidOdometer` verdict rather than an error, because it
/// must not block completion.
pub fn reconcile_leg(leg: &TripLeg, policy: &ApportionPolicy) -> Option<Reconciliation> {
    let (starting, ending) = (leg.starting_odometer?, leg.ending_odometer?);
    let result = reconcile(
        starting,
        ending,
        leg.total_route_miles,
        policy.reconciliation_tolerance,
    );
    Some(result.unwrap_or(Reconciliation {
        verdict: Verdict::InvalidOdometer,
        odometer_delta: None,
        variance: None,
    }))
}
