use ifta_engine::{LegStatus, TripLeg, Verdict};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::StorageError;

/// Filter for [`LegStore::list_legs`](crate::LegStore::list_legs).
///
/// The completion window is half-open: `completed_from <= completed_at < completed_to`.
/// Any bound on `completed_at` excludes legs that have not completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegQuery {
    pub status: Option<LegStatus>,
    pub truck_identifier: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_from: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_to: Option<OffsetDateTime>,
}

impl LegQuery {
    /// Completed legs for one truck (or all trucks) in a completion window.
    pub fn completed_between(
        from: OffsetDateTime,
        to: OffsetDateTime,
        truck_identifier: Option<String>,
    ) -> Self {
        LegQuery {
            status: Some(LegStatus::Completed),
            truck_identifier,
            completed_from: Some(from),
            completed_to: Some(to),
        }
    }

    pub fn matches(&self, leg: &TripLeg) -> bool {
        if self.status.is_some_and(|s| s != leg.status) {
            return false;
        }
        if let Some(truck) = &self.truck_identifier {
            if &leg.truck_identifier != truck {
                return false;
            }
        }
        if self.completed_from.is_some() || self.completed_to.is_some() {
            let Some(completed_at) = leg.completed_at else {
                return false;
            };
            if self.completed_from.is_some_and(|from| completed_at < from) {
                return false;
            }
            if self.completed_to.is_some_and(|to| completed_at >= to) {
                return false;
            }
        }
        true
    }
}

/// Sort legs by creation time, then id, for stable listings.
pub(crate) fn sort_legs(legs: &mut [TripLeg]) {
    legs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// A completed leg whose odometer check needs a human look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub id: String,
    pub leg_id: String,
    pub truck_identifier: String,
    pub verdict: Verdict,
    pub total_route_miles: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odometer_delta: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<Decimal>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ReviewResolution>,
}

impl ReviewItem {
    pub fn is_open(&self) -> bool {
        self.resolution.is_none()
    }
}

/// Reviewer sign-off. Never changes leg mileage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResolution {
    pub reviewer: String,
    pub note: String,
    #[serde(with = "time::serde::rfc3339")]
    pub resolved_at: OffsetDateTime,
}

pub(crate) fn sort_reviews(items: &mut [ReviewItem]) {
    items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Shared optimistic-guard check used by every backend.
pub(crate) fn guard_swap(stored: &TripLeg, expected: LegStatus) -> Result<(), StorageError> {
    if stored.status != expected {
        return Err(StorageError::StaleState {
            leg_id: stored.id.clone(),
            expected,
            found: stored.status,
        });
    }
    if stored.status == LegStatus::Completed {
        return Err(StorageError::Immutable {
            leg_id: stored.id.clone(),
        });
    }
    Ok(())
}
