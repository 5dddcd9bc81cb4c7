//! IFTA worksheet assembly.
//!
//! [`build_report`] is pure: the caller supplies the legs (normally a store
//! query) and gets back totals, the jurisdiction table and the per-leg
//! audit detail. Legs outside the scope or not `COMPLETED` are skipped
//! here too, so a loose query can never leak failed legs into a report.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::aggregate::{MileageAggregator, MileageTotals};
use crate::reconcile::Verdict;
use crate::types::{JurisdictionMiles, LegKind, LegStatus, TripLeg};

/// Reporting scope: half-open completion window `[from, to)` and an
/// optional truck filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportScope {
    #[serde(with = "time::serde::rfc3339")]
    pub from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub to: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truck_identifier: Option<String>,
}

impl ReportScope {
    /// Whether a leg falls inside this scope (status is not considered).
    pub fn contains(&self, leg: &TripLeg) -> bool {
        let Some(completed_at) = leg.completed_at else {
            return false;
        };
        if completed_at < self.from || completed_at >= self.to {
            return false;
        }
        match &self.truck_identifier {
            Some(truck) => &leg.truck_identifier == truck,
            None => true,
        }
    }
}

/// Audit drill-down row for one leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegDetail {
    pub leg_id: String,
    pub truck_identifier: String,
    pub kind: LegKind,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    pub total_route_miles: Decimal,
    pub jurisdictions: JurisdictionMiles,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<Decimal>,
}

/// Consolidated state-by-state worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IftaReport {
    pub scope: ReportScope,
    pub totals: MileageTotals,
    pub legs: Vec<LegDetail>,
    /// Ids of legs whose odometer verdict needs review.
    pub flagged_legs: Vec<String>,
    /// SHA-256 over the canonical JSON of `totals`.
    pub fingerprint: String,
}

/// Build the worksheet for `scope` from candidate legs.
pub fn build_report<'a>(
    scope: &ReportScope,
    legs: impl IntoIterator<Item = &'a TripLeg>,
) -> IftaReport {
    let mut in_scope: Vec<&TripLeg> = legs
        .into_iter()
        .filter(|leg| leg.status == LegStatus::Completed && scope.contains(leg))
        .collect();
    // One row per id whatever the input order: the earliest completion wins.
    in_scope.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.completed_at.cmp(&b.completed_at)));
    in_scope.dedup_by(|a, b| a.id == b.id);
    in_scope.sort_by(|a, b| {
        a.completed_at
            .cmp(&b.completed_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let totals = MileageAggregator::from_legs(in_scope.iter().copied()).totals();

    let legs: Vec<LegDetail> = in_scope
        .iter()
        .filter_map(|leg| {
            Some(LegDetail {
                leg_id: leg.id.clone(),
                truck_identifier: leg.truck_identifier.clone(),
                kind: leg.kind,
                created_at: leg.created_at,
                completed_at: leg.completed_at?,
                total_route_miles: leg.total_route_miles,
                jurisdictions: leg.route_miles_by_jurisdiction.clone(),
                verdict: leg.reconciliation.as_ref().map(|r| r.verdict),
                variance: leg.reconciliation.as_ref().and_then(|r| r.variance),
            })
        })
        .collect();

    let flagged_legs = legs
        .iter()
        .filter(|d| d.verdict.is_some_and(|v| v.needs_review()))
        .map(|d| d.leg_id.clone())
        .collect();

    let fingerprint = fingerprint(&totals);

    IftaReport {
        scope: scope.clone(),
        totals,
        legs,
        flagged_legs,
        fingerprint,
    }
}

/// Hex SHA-256 of the compact JSON encoding of `totals`.
pub fn fingerprint(totals: &MileageTotals) -> String {
    let canonical = serde_json::to_string(totals).unwrap_or_default();
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}
