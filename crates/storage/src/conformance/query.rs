use std::future::Future;

use ifta_engine::{LegKind, LegStatus};

use super::{at, make_completed_leg, make_pending_leg, with_status, TestResult, DAY, JAN_1};
use crate::{LegQuery, LegStore};

pub(super) async fn run_query_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "query",
            "empty_store_lists_nothing",
            empty_store_lists_nothing(factory).await,
        ),
        TestResult::from_result(
            "query",
            "status_filter_excludes_failed",
            status_filter_excludes_failed(factory).await,
        ),
        TestResult::from_result(
            "query",
            "truck_filter",
            truck_filter(factory).await,
        ),
        TestResult::from_result(
            "query",
            "completion_window_is_half_open",
            completion_window_is_half_open(factory).await,
        ),
    ]
}

async fn seed<S: LegStore>(s: &S) -> Result<(), String> {
    let legs = vec![
        make_completed_leg(
            "jan-a",
            "T-100",
            LegKind::Loaded,
            at(JAN_1 + 10 * DAY),
            &[("TX", "300.0")],
        ),
        make_completed_leg(
            "jan-b",
            "T-200",
            LegKind::DeadheadReturn,
            at(JAN_1 + 20 * DAY),
            &[("OK", "120.0")],
        ),
        make_completed_leg(
            "feb-a",
            "T-100",
            LegKind::Loaded,
            at(JAN_1 + 31 * DAY),
            &[("NM", "80.0")],
        ),
        with_status(
            &make_pending_leg("failed", "T-100", LegKind::Loaded),
            LegStatus::Failed,
        ),
        make_pending_leg("pending", "T-200", LegKind::Loaded),
    ];
    for leg in legs {
        s.insert_leg(leg).await.map_err(|e| format!("insert: {e}"))?;
    }
    Ok(())
}

fn ids(legs: &[ifta_engine::TripLeg]) -> Vec<String> {
    let mut ids: Vec<String> = legs.iter().map(|l| l.id.clone()).collect();
    ids.sort();
    ids
}

async fn empty_store_lists_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let legs = s
        .list_legs(&LegQuery::default())
        .await
        .map_err(|e| format!("list: {e}"))?;
    if !legs.is_empty() {
        return Err(format!("expected no legs, got {}", legs.len()));
    }
    Ok(())
}

async fn status_filter_excludes_failed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s).await?;

    let all = s
        .list_legs(&LegQuery::default())
        .await
        .map_err(|e| format!("list: {e}"))?;
    if all.len() != 5 {
        return Err(format!("expected 5 legs, got {}", all.len()));
    }

    let completed = s
        .list_legs(&LegQuery {
            status: Some(LegStatus::Completed),
            ..LegQuery::default()
        })
        .await
        .map_err(|e| format!("list: {e}"))?;
    if ids(&completed) != ["feb-a", "jan-a", "jan-b"] {
        return Err(format!("unexpected completed legs: {:?}", ids(&completed)));
    }
    Ok(())
}

async fn truck_filter<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s).await?;

    let legs = s
        .list_legs(&LegQuery {
            truck_identifier: Some("T-200".to_string()),
            ..LegQuery::default()
        })
        .await
        .map_err(|e| format!("list: {e}"))?;
    if ids(&legs) != ["jan-b", "pending"] {
        return Err(format!("unexpected T-200 legs: {:?}", ids(&legs)));
    }
    Ok(())
}

async fn completion_window_is_half_open<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s).await?;

    // [jan-a's completion, feb-a's completion) keeps jan-a, drops feb-a
    let legs = s
        .list_legs(&LegQuery::completed_between(
            at(JAN_1 + 10 * DAY),
            at(JAN_1 + 31 * DAY),
            None,
        ))
        .await
        .map_err(|e| format!("list: {e}"))?;
    if ids(&legs) != ["jan-a", "jan-b"] {
        return Err(format!("unexpected window legs: {:?}", ids(&legs)));
    }

    let scoped = s
        .list_legs(&LegQuery::completed_between(
            at(JAN_1),
            at(JAN_1 + 59 * DAY),
            Some("T-100".to_string()),
        ))
        .await
        .map_err(|e| format!("list: {e}"))?;
    if ids(&scoped) != ["feb-a", "jan-a"] {
        return Err(format!("unexpected scoped legs: {:?}", ids(&scoped)));
    }
    Ok(())
}
