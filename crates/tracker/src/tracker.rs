//! Trip leg tracker: drives legs through the lifecycle against a store.
//!
//! Every transition is a read, a pure lifecycle step from `ifta-engine`,
//! and a compare-and-swap guarded on the status that was read. Two racing
//! transitions on one leg therefore resolve to one winner and one
//! `STALE_STATE`; nothing blocks.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use ifta_engine::lifecycle;
use ifta_engine::{
    apportion_route, ApportionError, ApportionPolicy, Coordinate, LegKind, LegStatus, NewLeg,
    TripLeg,
};
use ifta_storage::{LegStore, ReviewItem, ReviewResolution, StorageError};
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::{TrackerConfig, DEFAULT_TIMEOUT_SECS};
use crate::error::TrackerError;
use crate::location::LocationSource;
use crate::provider::{ProviderError, RoutingProvider};

type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

pub struct TripLegTracker {
    store: Arc<dyn LegStore>,
    provider: Arc<dyn RoutingProvider>,
    terminal: Option<Coordinate>,
    policy: ApportionPolicy,
    provider_timeout: Duration,
    clock: Clock,
    in_flight: Mutex<HashSet<String>>,
}

/// Releases a leg's in-flight claim when the provider call ends.
struct InFlightClaim<'a> {
    set: &'a Mutex<HashSet<String>>,
    leg_id: String,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.leg_id);
    }
}

impl TripLegTracker {
    pub fn new(store: Arc<dyn LegStore>, provider: Arc<dyn RoutingProvider>) -> Self {
        TripLegTracker {
            store,
            provider,
            terminal: None,
            policy: ApportionPolicy::default(),
            provider_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            clock: Arc::new(OffsetDateTime::now_utc),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Wire a tracker from configuration: provider, terminal, policy and timeout.
    pub fn from_config(
        config: &TrackerConfig,
        store: Arc<dyn LegStore>,
    ) -> Result<Self, TrackerError> {
        let mut tracker = TripLegTracker::new(store, config.build_provider()?)
            .with_policy(config.policy)
            .with_provider_timeout(config.routing.timeout());
        tracker.terminal = config.terminal_coordinate()?;
        Ok(tracker)
    }

    pub fn with_terminal(mut self, terminal: Coordinate) -> Self {
        self.terminal = Some(terminal);
        self
    }

    pub fn with_policy(mut self, policy: ApportionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> OffsetDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn store(&self) -> &Arc<dyn LegStore> {
        &self.store
    }

    pub fn policy(&self) -> &ApportionPolicy {
        &self.policy
    }

    pub fn terminal(&self) -> Option<Coordinate> {
        self.terminal
    }

    fn now(&self) -> OffsetDateTime {
        (self.clock)()
    }

    // ── Creation ────────────────────────────────────────────────────────────

    /// Create a `PENDING` leg for an explicit origin/destination pair.
    ///
    /// `DEADHEAD_RETURN` legs are refused here; they only come from
    /// [`create_deadhead_return`](Self::create_deadhead_return), which pins
    /// the destination to the terminal.
    pub async fn create_leg(&self, new_leg: NewLeg) -> Result<TripLeg, TrackerError> {
        if new_leg.kind == LegKind::DeadheadReturn {
            return Err(TrackerError::InvalidRequest(
                "DEADHEAD_RETURN legs are created from the driver's location, not explicit endpoints"
                    .to_string(),
            ));
        }
        self.insert_new_leg(new_leg).await
    }

    /// Create a `DEADHEAD_RETURN` leg from the driver's live position to the
    /// configured terminal.
    pub async fn create_deadhead_return(
        &self,
        truck_identifier: &str,
        location: &dyn LocationSource,
        starting_odometer: Option<Decimal>,
    ) -> Result<TripLeg, TrackerError> {
        let terminal = self.terminal.ok_or_else(|| {
            TrackerError::Config("no terminal coordinate configured for deadhead returns".to_string())
        })?;
        let origin = location.current_position()?;
        self.insert_new_leg(NewLeg {
            truck_identifier: truck_identifier.to_string(),
            kind: LegKind::DeadheadReturn,
            origin: Some(origin),
            destination: Some(terminal),
            starting_odometer,
        })
        .await
    }

    async fn insert_new_leg(&self, new_leg: NewLeg) -> Result<TripLeg, TrackerError> {
        if new_leg.truck_identifier.trim().is_empty() {
            return Err(TrackerError::InvalidRequest(
                "truck_identifier must not be empty".to_string(),
            ));
        }
        let leg = TripLeg::pending(Uuid::new_v4().to_string(), new_leg, self.now());
        let (origin, destination) = leg.endpoints()?;
        Coordinate::new(origin.latitude, origin.longitude)?;
        Coordinate::new(destination.latitude, destination.longitude)?;

        self.store.insert_leg(leg.clone()).await?;
        log::info!(
            "leg {}: created {} for truck {} ({} -> {})",
            leg.id,
            leg.kind,
            leg.truck_identifier,
            origin,
            destination
        );
        Ok(leg)
    }

    pub async fn get_leg(&self, leg_id: &str) -> Result<TripLeg, TrackerError> {
        Ok(self.store.get_leg(leg_id).await?)
    }

    // ── Transitions ─────────────────────────────────────────────────────────

    /// `PENDING -> ROUTE_CALCULATED`, or `PENDING -> FAILED` on any provider
    /// or apportionment error. The error is returned after the failure is
    /// persisted; retrying means creating a fresh leg.
    pub async fn calculate_route(&self, leg_id: &str) -> Result<TripLeg, TrackerError> {
        let leg = self.store.get_leg(leg_id).await?;
        expect_status(&leg, LegStatus::Pending)?;
        let _claim = self.claim(leg_id)?;
        // An earlier claim holder may have finished between the read and
        // the claim.
        let leg = self.store.get_leg(leg_id).await?;
        expect_status(&leg, LegStatus::Pending)?;
        let (origin, destination) = leg.endpoints()?;

        let started = Instant::now();
        let outcome = match tokio::time::timeout(
            self.provider_timeout,
            self.provider.route(origin, destination),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                timeout_secs: self.provider_timeout.as_secs(),
            }),
        };
        log::info!(
            "leg {}: {} provider call took {:?}",
            leg_id,
            self.provider.provider_id(),
            started.elapsed()
        );

        let failure = match outcome {
            Ok(response) => match apportion_route(&response, &self.policy)
                .and_then(|route| lifecycle::route_calculated(&leg, route))
            {
                Ok(next) => {
                    let stored = self.swap(LegStatus::Pending, next).await?;
                    log::info!(
                        "leg {}: PENDING -> ROUTE_CALCULATED ({} mi across {} jurisdictions)",
                        leg_id,
                        stored.total_route_miles,
                        stored.route_miles_by_jurisdiction.len()
                    );
                    return Ok(stored);
                }
                Err(e) => TrackerError::Apportion(e),
            },
            Err(ProviderError::Timeout { timeout_secs }) => {
                TrackerError::ProviderTimeout { timeout_secs }
            }
            Err(ProviderError::Unavailable(msg)) => TrackerError::ProviderUnavailable(msg),
            Err(ProviderError::Malformed(msg)) => {
                TrackerError::Apportion(ApportionError::MalformedResponse(msg))
            }
        };

        let failed = lifecycle::failed_with(&leg, failure.code(), &failure.to_string())?;
        self.swap(LegStatus::Pending, failed).await?;
        log::warn!("leg {}: PENDING -> FAILED: {}", leg_id, failure);
        Err(failure)
    }

    /// `ROUTE_CALCULATED -> IN_PROGRESS`. The calculated mileage is frozen;
    /// no route is recomputed.
    pub async fn start_leg(
        &self,
        leg_id: &str,
        starting_odometer: Option<Decimal>,
    ) -> Result<TripLeg, TrackerError> {
        let leg = self.store.get_leg(leg_id).await?;
        expect_status(&leg, LegStatus::RouteCalculated)?;
        let next = lifecycle::started(&leg, starting_odometer, self.now())?;
        let stored = self.swap(LegStatus::RouteCalculated, next).await?;
        log::info!("leg {}: ROUTE_CALCULATED -> IN_PROGRESS", leg_id);
        Ok(stored)
    }

    /// `IN_PROGRESS -> COMPLETED` with the odometer verdict attached.
    ///
    /// A `DISCREPANCY` or `INVALID_ODOMETER` verdict never blocks completion;
    /// it enqueues a review item instead.
    pub async fn complete_leg(
        &self,
        leg_id: &str,
        ending_odometer: Option<Decimal>,
    ) -> Result<TripLeg, TrackerError> {
        let leg = self.store.get_leg(leg_id).await?;
        expect_status(&leg, LegStatus::InProgress)?;
        let now = self.now();
        let next = lifecycle::completed(&leg, ending_odometer, &self.policy, now)?;
        let stored = self.swap(LegStatus::InProgress, next).await?;

        match &stored.reconciliation {
            Some(rec) if rec.verdict.needs_review() => {
                log::warn!(
                    "leg {}: IN_PROGRESS -> COMPLETED with {} (delta {:?}, route {} mi)",
                    leg_id,
                    rec.verdict.as_str(),
                    rec.odometer_delta,
                    stored.total_route_miles
                );
                let item = ReviewItem {
                    id: Uuid::new_v4().to_string(),
                    leg_id: stored.id.clone(),
                    truck_identifier: stored.truck_identifier.clone(),
                    verdict: rec.verdict,
                    total_route_miles: stored.total_route_miles,
                    odometer_delta: rec.odometer_delta,
                    variance: rec.variance,
                    created_at: now,
                    resolution: None,
                };
                log::info!("leg {}: queued review {}", leg_id, item.id);
                self.store.enqueue_review(item).await?;
            }
            Some(rec) => log::info!(
                "leg {}: IN_PROGRESS -> COMPLETED ({})",
                leg_id,
                rec.verdict.as_str()
            ),
            None => log::info!("leg {}: IN_PROGRESS -> COMPLETED (no odometer)", leg_id),
        }
        Ok(stored)
    }

    // ── Review queue ────────────────────────────────────────────────────────

    pub async fn list_reviews(&self, open_only: bool) -> Result<Vec<ReviewItem>, TrackerError> {
        Ok(self.store.list_reviews(open_only).await?)
    }

    /// Sign off a flagged leg. Leg mileage is never touched.
    pub async fn resolve_review(
        &self,
        review_id: &str,
        reviewer: &str,
        note: &str,
    ) -> Result<ReviewItem, TrackerError> {
        if reviewer.trim().is_empty() {
            return Err(TrackerError::InvalidRequest(
                "reviewer must not be empty".to_string(),
            ));
        }
        let item = self
            .store
            .resolve_review(
                review_id,
                ReviewResolution {
                    reviewer: reviewer.to_string(),
                    note: note.to_string(),
                    resolved_at: self.now(),
                },
            )
            .await?;
        log::info!("review {} for leg {} resolved by {}", review_id, item.leg_id, reviewer);
        Ok(item)
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    fn claim(&self, leg_id: &str) -> Result<InFlightClaim<'_>, TrackerError> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !set.insert(leg_id.to_string()) {
            log::warn!("leg {}: route request already outstanding", leg_id);
            return Err(TrackerError::RouteInFlight {
                leg_id: leg_id.to_string(),
            });
        }
        Ok(InFlightClaim {
            set: &self.in_flight,
            leg_id: leg_id.to_string(),
        })
    }

    async fn swap(&self, expected: LegStatus, next: TripLeg) -> Result<TripLeg, TrackerError> {
        match self.store.compare_and_swap(expected, next).await {
            Ok(stored) => Ok(stored),
            Err(e @ StorageError::StaleState { .. }) => {
                log::warn!("{e}");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// The persisted status must be the transition's pre-state.
fn expect_status(leg: &TripLeg, expected: LegStatus) -> Result<(), TrackerError> {
    if leg.status == expected {
        return Ok(());
    }
    let err = StorageError::StaleState {
        leg_id: leg.id.clone(),
        expected,
        found: leg.status,
    };
    log::warn!("{err}");
    Err(err.into())
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
