use std::future::Future;
use std::sync::Arc;

use ifta_engine::{LegKind, LegStatus};

use super::{make_pending_leg, with_status, TestResult};
use crate::{LegStore, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_swaps_exactly_one_wins",
        concurrent_swaps_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_inserts_exactly_one_wins",
        concurrent_inserts_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_swaps_different_legs_all_succeed",
        concurrent_swaps_different_legs_all_succeed(factory).await,
    ));

    results
}

// ── Concurrent swap: exactly one wins ───────────────────────────────────────

/// N tasks race to move the same leg out of `ROUTE_CALCULATED`, each tagging
/// the write with its own truck id. Exactly one swap lands; the rest see
/// `StaleState`, and the stored leg carries the winner's tag.
async fn concurrent_swaps_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let leg = with_status(
        &make_pending_leg("leg-1", "T-100", LegKind::Loaded),
        LegStatus::RouteCalculated,
    );
    storage
        .insert_leg(leg.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        let mut next = with_status(&leg, LegStatus::InProgress);
        next.truck_identifier = format!("T-{i}");
        handles.push(tokio::spawn(async move {
            match s.compare_and_swap(LegStatus::RouteCalculated, next).await {
                Ok(stored) => Ok(Some(stored.truck_identifier)),
                Err(StorageError::StaleState { .. }) => Ok(None),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = Vec::new();
    let mut losers = 0usize;
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        match outcome {
            Some(tag) => winners.push(tag),
            None => losers += 1,
        }
    }

    if winners.len() != 1 {
        return Err(format!("expected exactly 1 winner, got {}", winners.len()));
    }
    if losers != N - 1 {
        return Err(format!("expected {} losers, got {losers}", N - 1));
    }

    let read = storage
        .get_leg("leg-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if read.status != LegStatus::InProgress {
        return Err(format!("expected IN_PROGRESS, got {}", read.status));
    }
    if read.truck_identifier != winners[0] {
        return Err(format!(
            "stored leg tagged {} but winner was {}",
            read.truck_identifier, winners[0]
        ));
    }
    Ok(())
}

// ── Concurrent insert: exactly one wins ─────────────────────────────────────

async fn concurrent_inserts_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            let leg = make_pending_leg("leg-1", "T-100", LegKind::Loaded);
            match s.insert_leg(leg).await {
                Ok(()) => Ok(true),
                Err(StorageError::AlreadyExists { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }

    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    Ok(())
}

// ── Concurrent swaps on different legs: all succeed ─────────────────────────

/// No false conflicts when there is no contention.
async fn concurrent_swaps_different_legs_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    for i in 0..N {
        storage
            .insert_leg(make_pending_leg(&format!("leg-{i}"), "T-100", LegKind::Loaded))
            .await
            .map_err(|e| format!("insert leg-{i}: {e}"))?;
    }

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            let leg = s.get_leg(&format!("leg-{i}")).await?;
            s.compare_and_swap(
                LegStatus::Pending,
                with_status(&leg, LegStatus::RouteCalculated),
            )
            .await?;
            Ok::<(), StorageError>(())
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        handle
            .await
            .map_err(|e| format!("task {i} panic: {e}"))?
            .map_err(|e| format!("task {i} failed: {e}"))?;
    }

    for i in 0..N {
        let leg = storage
            .get_leg(&format!("leg-{i}"))
            .await
            .map_err(|e| format!("get leg-{i}: {e}"))?;
        if leg.status != LegStatus::RouteCalculated {
            return Err(format!(
                "leg-{i}: expected ROUTE_CALCULATED, got {}",
                leg.status
            ));
        }
    }
    Ok(())
}
