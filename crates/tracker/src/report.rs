//! Report builder: store query plus engine aggregation.

use std::sync::Arc;

use ifta_engine::{build_report, IftaReport, ReportScope};
use ifta_storage::{LegQuery, LegStore};
use time::{Date, OffsetDateTime};

use crate::error::TrackerError;

/// Read-only; safe to call repeatedly and concurrently.
pub struct ReportBuilder {
    store: Arc<dyn LegStore>,
}

impl ReportBuilder {
    pub fn new(store: Arc<dyn LegStore>) -> Self {
        ReportBuilder { store }
    }

    pub async fn get_report(&self, scope: &ReportScope) -> Result<IftaReport, TrackerError> {
        if scope.from >= scope.to {
            return Err(TrackerError::InvalidScope {
                from: scope.from,
                to: scope.to,
            });
        }
        let query =
            LegQuery::completed_between(scope.from, scope.to, scope.truck_identifier.clone());
        let legs = self.store.list_legs(&query).await?;
        let report = build_report(scope, &legs);
        log::info!(
            "report {} .. {}{}: {} legs, {} jurisdictions, {} flagged",
            scope.from,
            scope.to,
            scope
                .truck_identifier
                .as_deref()
                .map(|t| format!(" truck {t}"))
                .unwrap_or_default(),
            report.legs.len(),
            report.totals.jurisdiction_count,
            report.flagged_legs.len()
        );
        Ok(report)
    }
}

/// Scope covering whole UTC days: `[from 00:00, to 00:00)`.
pub fn date_scope(from: Date, to: Date, truck_identifier: Option<String>) -> ReportScope {
    ReportScope {
        from: midnight_utc(from),
        to: midnight_utc(to),
        truck_identifier,
    }
}

fn midnight_utc(date: Date) -> OffsetDateTime {
    date.midnight().assume_utc()
}
