//! Conformance test suite for `LegStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any `LegStore`
//! implementation can run to verify correctness. The suite covers:
//!
//! - **Legs**: insert/get round trip, duplicate detection, missing ids
//! - **Compare-and-swap**: accepted swaps, `StaleState`, completed-leg immutability
//! - **Queries**: status, truck and half-open completion-window filters
//! - **Review queue**: enqueue, open/all listings, resolution
//! - **Concurrency**: N racing swaps on one leg produce exactly one winner
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use ifta_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn sqlite_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_sqlite_store().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod cas;
mod concurrent;
mod legs;
mod query;
mod review;

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use ifta_engine::{Coordinate, JurisdictionMiles, LegKind, LegStatus, NewLeg, TripLeg, Verdict};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::record::ReviewItem;
use crate::LegStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "legs", "cas", "query").
    pub category: String,
    /// Test name (e.g. "insert_then_get_round_trips").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(legs::run_leg_tests(&factory).await);
    results.extend(cas::run_cas_tests(&factory).await);
    results.extend(query::run_query_tests(&factory).await);
    results.extend(review::run_review_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap_or_default()
}

fn at(unix_seconds: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(unix_seconds).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// 2026-01-01T00:00:00Z
const JAN_1: i64 = 1_767_225_600;
const DAY: i64 = 86_400;

pub(crate) fn make_pending_leg(id: &str, truck: &str, kind: LegKind) -> TripLeg {
    TripLeg::pending(
        id,
        NewLeg {
            truck_identifier: truck.to_string(),
            kind,
            origin: Coordinate::new(32.7767, -96.797).ok(),
            destination: Coordinate::new(35.4676, -97.5164).ok(),
            starting_odometer: Some(dec("100000")),
        },
        at(JAN_1),
    )
}

/// A leg carried through to `COMPLETED` at `completed_at`, bypassing the store.
fn make_completed_leg(
    id: &str,
    truck: &str,
    kind: LegKind,
    completed_at: OffsetDateTime,
    miles: &[(&str, &str)],
) -> TripLeg {
    let mut leg = make_pending_leg(id, truck, kind);
    leg.route_miles_by_jurisdiction = miles
        .iter()
        .map(|(code, m)| (*code, dec(m)))
        .collect::<JurisdictionMiles>();
    leg.total_route_miles = leg.route_miles_by_jurisdiction.total();
    leg.status = LegStatus::Completed;
    leg.started_at = Some(completed_at);
    leg.completed_at = Some(completed_at);
    leg
}

fn with_status(leg: &TripLeg, status: LegStatus) -> TripLeg {
    let mut next = leg.clone();
    next.status = status;
    next
}

fn make_review(id: &str, leg_id: &str, created_at: OffsetDateTime) -> ReviewItem {
    ReviewItem {
        id: id.to_string(),
        leg_id: leg_id.to_string(),
        truck_identifier: "T-100".to_string(),
        verdict: Verdict::Discrepancy,
        total_route_miles: dec("500.0"),
        odometer_delta: Some(dec("50")),
        variance: Some(dec("0.9")),
        created_at,
        resolution: None,
    }
}
