//! Trip leg state machine.
//!
//! ```text
//! PENDING ──route ok──▶ ROUTE_CALCULATED ──start──▶ IN_PROGRESS ──complete──▶ COMPLETED
//!    │                        │
//!    └──────── fail ──────────┴──▶ FAILED
//! ```
//!
//! Each function takes the current leg by reference and returns the next
//! version; persisting it (with the optimistic status guard) is the
//! tracker's job. `COMPLETED` and `FAILED` are terminal.

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::error::ApportionError;
use crate::numeric::ApportionPolicy;
use crate::reconcile::reconcile_leg;
use crate::spans::RouteApportionment;
use crate::types::{LegFailure, LegStatus, TripLeg};

impl LegStatus {
    /// Whether the state machine permits `self -> next`.
    pub fn can_transition_to(self, next: LegStatus) -> bool {
        matches!(
            (self, next),
            (LegStatus::Pending, LegStatus::RouteCalculated)
                | (LegStatus::Pending, LegStatus::Failed)
                | (LegStatus::RouteCalculated, LegStatus::InProgress)
                | (LegStatus::RouteCalculated, LegStatus::Failed)
                | (LegStatus::InProgress, LegStatus::Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LegStatus::Completed | LegStatus::Failed)
    }
}

fn check(from: LegStatus, to: LegStatus) -> Result<(), ApportionError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ApportionError::InvalidTransition { from, to })
    }
}

/// `PENDING -> ROUTE_CALCULATED`: record the provider's apportionment.
/// A calculated leg always carries at least one jurisdiction.
pub fn route_calculated(
    leg: &TripLeg,
    route: RouteApportionment,
) -> Result<TripLeg, ApportionError> {
    check(leg.status, LegStatus::RouteCalculated)?;
    if route.miles_by_jurisdiction.is_empty() {
        return Err(ApportionError::NoRouteFound);
    }
    let mut next = leg.clone();
    next.route_miles_by_jurisdiction = route.miles_by_jurisdiction;
    next.total_route_miles = route.total_miles;
    next.total_duration_seconds = route.total_duration_seconds;
    next.status = LegStatus::RouteCalculated;
    Ok(next)
}

/// `PENDING | ROUTE_CALCULATED -> FAILED`: record why. Any partial
/// apportionment is cleared so a failed leg never carries mileage.
pub fn failed(leg: &TripLeg, error: &ApportionError) -> Result<TripLeg, ApportionError> {
    failed_with(leg, error.code(), &error.to_string())
}

/// Same as [`failed`] for failures that originate outside the engine
/// (provider timeouts, transport errors).
pub fn failed_with(leg: &TripLeg, code: &str, message: &str) -> Result<TripLeg, ApportionError> {
    check(leg.status, LegStatus::Failed)?;
    let mut next = leg.clone();
    next.route_miles_by_jurisdiction = Default::default();
    next.total_route_miles = Decimal::ZERO;
    next.total_duration_seconds = 0;
    next.status = LegStatus::Failed;
    next.failure = Some(LegFailure {
        code: code.to_string(),
        message: message.to_string(),
    });
    Ok(next)
}

/// `ROUTE_CALCULATED -> IN_PROGRESS`: freeze the calculated apportionment.
///
/// No recomputation happens here or later; mileage committed at this point
/// is what reporting sees.
pub fn started(
    leg: &TripLeg,
    starting_odometer: Option<Decimal>,
    now: OffsetDateTime,
) -> Result<TripLeg, ApportionError> {
    check(leg.status, LegStatus::InProgress)?;
    let mut next = leg.clone();
    if starting_odometer.is_some() {
        next.starting_odometer = starting_odometer;
    }
    next.status = LegStatus::InProgress;
    next.started_at = Some(now);
    Ok(next)
}

/// `IN_PROGRESS -> COMPLETED`: attach the odometer verdict, if any.
///
/// Mileage fields are carried over untouched regardless of the verdict.
pub fn completed(
    leg: &TripLeg,
    ending_odometer: Option<Decimal>,
    policy: &ApportionPolicy,
    now: OffsetDateTime,
) -> Result<TripLeg, ApportionError> {
    check(leg.status, LegStatus::Completed)?;
    let mut next = leg.clone();
    if ending_odometer.is_some() {
        next.ending_odometer = ending_odometer;
    }
    next.reconciliation = reconcile_leg(&next, policy);
    next.status = LegStatus::Completed;
    next.completed_at = Some(now);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::Verdict;
    use crate::types::{Coordinate, JurisdictionMiles, LegKind, NewLeg};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn pending_leg() -> TripLeg {
        TripLeg::pending(
            "leg-1",
            NewLeg {
                truck_identifier: "T-100".to_string(),
                kind: LegKind::Loaded,
                origin: Some(Coordinate::new(32.7767, -96.797).unwrap()),
                destination: Some(Coordinate::new(35.4676, -97.5164).unwrap()),
                starting_odometer: Some(dec("100000")),
            },
            OffsetDateTime::UNIX_EPOCH,
        )
    }

    fn route() -> RouteApportionment {
        RouteApportionment {
            total_miles: dec("500.0"),
            total_duration_seconds: 28_800,
            miles_by_jurisdiction: [("TX", dec("300.0")), ("OK", dec("200.0"))]
                .into_iter()
                .collect::<JurisdictionMiles>(),
            unattributed_meters: Decimal::ZERO,
            gap_ratio: Decimal::ZERO,
        }
    }

    #[test]
    fn empty_apportionment_is_not_calculated() {
        let empty = RouteApportionment {
            total_miles: Decimal::ZERO,
            miles_by_jurisdiction: JurisdictionMiles::new(),
            ..route()
        };
        let leg = pending_leg();
        assert_eq!(
            route_calculated(&leg, empty),
            Err(ApportionError::NoRouteFound)
        );
        assert_eq!(leg.status, LegStatus::Pending);
    }

    #[test]
    fn transition_table() {
        use LegStatus::*;
        assert!(Pending.can_transition_to(RouteCalculated));
        assert!(Pending.can_transition_to(Failed));
        assert!(RouteCalculated.can_transition_to(Failed));
        assert!(!InProgress.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(InProgress));
        assert!(!Failed.can_transition_to(Pending));
        for next in [Pending, RouteCalculated, InProgress, Completed, Failed] {
            assert!(!Completed.can_transition_to(next));
        }
    }

    #[test]
    fn full_lifecycle_with_matching_odometer() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let leg = route_calculated(&pending_leg(), route()).unwrap();
        assert_eq!(leg.status, LegStatus::RouteCalculated);
        assert_eq!(leg.total_route_miles, dec("500.0"));

        let leg = started(&leg, None, now).unwrap();
        assert_eq!(leg.starting_odometer, Some(dec("100000")));

        let leg = completed(&leg, Some(dec("100510")), &ApportionPolicy::default(), now).unwrap();
        assert_eq!(leg.status, LegStatus::Completed);
        assert_eq!(leg.reconciliation.as_ref().unwrap().verdict, Verdict::Match);
        assert_eq!(leg.completed_at, Some(now));
    }

    #[test]
    fn discrepancy_completes_without_touching_mileage() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let leg = route_calculated(&pending_leg(), route()).unwrap();
        let leg = started(&leg, None, now).unwrap();
        let before = leg.route_miles_by_jurisdiction.clone();

        let leg = completed(&leg, Some(dec("100050")), &ApportionPolicy::default(), now).unwrap();
        assert_eq!(leg.status, LegStatus::Completed);
        assert_eq!(
            leg.reconciliation.as_ref().unwrap().verdict,
            Verdict::Discrepancy
        );
        assert_eq!(leg.route_miles_by_jurisdiction, before);
        assert_eq!(leg.total_route_miles, dec("500.0"));
    }

    #[test]
    fn invalid_odometer_still_completes() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let leg = route_calculated(&pending_leg(), route()).unwrap();
        let leg = started(&leg, None, now).unwrap();
        let leg = completed(&leg, Some(dec("99000")), &ApportionPolicy::default(), now).unwrap();
        assert_eq!(leg.status, LegStatus::Completed);
        assert_eq!(
            leg.reconciliation.unwrap().verdict,
            Verdict::InvalidOdometer
        );
    }

    #[test]
    fn missing_odometer_skips_reconciliation() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let mut leg = pending_leg();
        leg.starting_odometer = None;
        let leg = route_calculated(&leg, route()).unwrap();
        let leg = started(&leg, None, now).unwrap();
        let leg = completed(&leg, Some(dec("100510")), &ApportionPolicy::default(), now).unwrap();
        assert_eq!(leg.reconciliation, None);
    }

    #[test]
    fn failure_clears_mileage_and_records_code() {
        let leg = failed(&pending_leg(), &ApportionError::NoRouteFound).unwrap();
        assert_eq!(leg.status, LegStatus::Failed);
        assert!(leg.route_miles_by_jurisdiction.is_empty());
        assert_eq!(leg.failure.unwrap().code, "NO_ROUTE_FOUND");
    }

    #[test]
    fn completed_leg_rejects_every_transition() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let leg = route_calculated(&pending_leg(), route()).unwrap();
        let leg = started(&leg, None, now).unwrap();
        let leg = completed(&leg, None, &ApportionPolicy::default(), now).unwrap();

        assert!(route_calculated(&leg, route()).is_err());
        assert!(started(&leg, None, now).is_err());
        assert!(failed(&leg, &ApportionError::NoRouteFound).is_err());
        assert_eq!(
            completed(&leg, None, &ApportionPolicy::default(), now),
            Err(ApportionError::InvalidTransition {
                from: LegStatus::Completed,
                to: LegStatus::Completed,
            })
        );
    }
}
