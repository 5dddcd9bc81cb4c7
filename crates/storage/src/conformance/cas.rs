use std::future::Future;

use ifta_engine::{LegKind, LegStatus};

use super::{at, make_completed_leg, make_pending_leg, with_status, TestResult, JAN_1};
use crate::{LegStore, StorageError};

pub(super) async fn run_cas_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "cas",
            "swap_with_matching_status_succeeds",
            swap_with_matching_status_succeeds(factory).await,
        ),
        TestResult::from_result(
            "cas",
            "swap_with_stale_status_rejected",
            swap_with_stale_status_rejected(factory).await,
        ),
        TestResult::from_result(
            "cas",
            "stale_swap_leaves_record_untouched",
            stale_swap_leaves_record_untouched(factory).await,
        ),
        TestResult::from_result(
            "cas",
            "completed_leg_is_immutable",
            completed_leg_is_immutable(factory).await,
        ),
        TestResult::from_result(
            "cas",
            "swap_missing_leg_not_found",
            swap_missing_leg_not_found(factory).await,
        ),
    ]
}

async fn swap_with_matching_status_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let leg = make_pending_leg("leg-1", "T-100", LegKind::Loaded);
    s.insert_leg(leg.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let next = with_status(&leg, LegStatus::RouteCalculated);
    let stored = s
        .compare_and_swap(LegStatus::Pending, next.clone())
        .await
        .map_err(|e| format!("swap: {e}"))?;
    if stored != next {
        return Err("swap did not return the written leg".to_string());
    }
    let read = s.get_leg("leg-1").await.map_err(|e| format!("get: {e}"))?;
    if read.status != LegStatus::RouteCalculated {
        return Err(format!("expected ROUTE_CALCULATED, got {}", read.status));
    }
    Ok(())
}

async fn swap_with_stale_status_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let leg = make_pending_leg("leg-1", "T-100", LegKind::Loaded);
    s.insert_leg(with_status(&leg, LegStatus::RouteCalculated))
        .await
        .map_err(|e| format!("insert: {e}"))?;

    match s
        .compare_and_swap(LegStatus::Pending, with_status(&leg, LegStatus::Failed))
        .await
    {
        Err(StorageError::StaleState {
            leg_id,
            expected,
            found,
        }) => {
            if leg_id != "leg-1"
                || expected != LegStatus::Pending
                || found != LegStatus::RouteCalculated
            {
                return Err(format!(
                    "wrong StaleState fields: {leg_id} expected={expected} found={found}"
                ));
            }
            Ok(())
        }
        other => Err(format!("expected StaleState, got {:?}", other)),
    }
}

async fn stale_swap_leaves_record_untouched<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let leg = with_status(
        &make_pending_leg("leg-1", "T-100", LegKind::Loaded),
        LegStatus::InProgress,
    );
    s.insert_leg(leg.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let mut tampered = with_status(&leg, LegStatus::Completed);
    tampered.truck_identifier = "T-999".to_string();
    let _ = s
        .compare_and_swap(LegStatus::RouteCalculated, tampered)
        .await;

    let read = s.get_leg("leg-1").await.map_err(|e| format!("get: {e}"))?;
    if read != leg {
        return Err("stale swap modified the stored leg".to_string());
    }
    Ok(())
}

async fn completed_leg_is_immutable<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let leg = make_completed_leg(
        "leg-1",
        "T-100",
        LegKind::Loaded,
        at(JAN_1),
        &[("TX", "10.0")],
    );
    s.insert_leg(leg.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let mut rewrite = leg.clone();
    rewrite.total_route_miles = rewrite.total_route_miles * rust_decimal::Decimal::TWO;
    match s.compare_and_swap(LegStatus::Completed, rewrite).await {
        Err(StorageError::Immutable { leg_id }) if leg_id == "leg-1" => {}
        other => return Err(format!("expected Immutable, got {:?}", other)),
    }
    match s
        .compare_and_swap(LegStatus::InProgress, leg.clone())
        .await
    {
        Err(StorageError::StaleState { .. }) => {}
        other => return Err(format!("expected StaleState, got {:?}", other)),
    }
    let read = s.get_leg("leg-1").await.map_err(|e| format!("get: {e}"))?;
    if read != leg {
        return Err("completed leg was modified".to_string());
    }
    Ok(())
}

async fn swap_missing_leg_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let leg = make_pending_leg("ghost", "T-100", LegKind::Loaded);
    match s.compare_and_swap(LegStatus::Pending, leg).await {
        Err(StorageError::LegNotFound { leg_id }) if leg_id == "ghost" => Ok(()),
        other => Err(format!("expected LegNotFound, got {:?}", other)),
    }
}
