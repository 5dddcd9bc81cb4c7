use std::future::Future;

use ifta_engine::{LegKind, LegStatus};

use super::{make_completed_leg, make_pending_leg, at, TestResult, JAN_1};
use crate::{LegStore, StorageError};

pub(super) async fn run_leg_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "legs",
            "insert_then_get_round_trips",
            insert_then_get_round_trips(factory).await,
        ),
        TestResult::from_result(
            "legs",
            "completed_leg_round_trips_mileage",
            completed_leg_round_trips_mileage(factory).await,
        ),
        TestResult::from_result(
            "legs",
            "duplicate_insert_rejected",
            duplicate_insert_rejected(factory).await,
        ),
        TestResult::from_result(
            "legs",
            "get_missing_leg_not_found",
            get_missing_leg_not_found(factory).await,
        ),
    ]
}

async fn insert_then_get_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
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
    let read = s.get_leg("leg-1").await.map_err(|e| format!("get: {e}"))?;
    if read != leg {
        return Err(format!("round trip mismatch: {:?} != {:?}", read, leg));
    }
    if read.status != LegStatus::Pending {
        return Err(format!("expected PENDING, got {}", read.status));
    }
    Ok(())
}

async fn completed_leg_round_trips_mileage<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let leg = make_completed_leg(
        "leg-1",
        "T-100",
        LegKind::DeadheadReturn,
        at(JAN_1 + 3_600),
        &[("TX", "300.0"), ("OK", "200.0")],
    );
    s.insert_leg(leg.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;
    let read = s.get_leg("leg-1").await.map_err(|e| format!("get: {e}"))?;
    let codes: Vec<&str> = read
        .route_miles_by_jurisdiction
        .iter()
        .map(|e| e.jurisdiction.as_str())
        .collect();
    if codes != ["TX", "OK"] {
        return Err(format!("jurisdiction order not preserved: {:?}", codes));
    }
    if read != leg {
        return Err("completed leg did not round trip".to_string());
    }
    Ok(())
}

async fn duplicate_insert_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
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
    match s.insert_leg(leg).await {
        Err(StorageError::AlreadyExists { leg_id }) if leg_id == "leg-1" => Ok(()),
        other => Err(format!("expected AlreadyExists, got {:?}", other)),
    }
}

async fn get_missing_leg_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get_leg("leg-999").await {
        Err(StorageError::LegNotFound { leg_id }) if leg_id == "leg-999" => Ok(()),
        other => Err(format!("expected LegNotFound, got {:?}", other)),
    }
}
