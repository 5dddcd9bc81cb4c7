use std::future::Future;

use time::OffsetDateTime;

use super::{at, make_review, TestResult, DAY, JAN_1};
use crate::{LegStore, ReviewResolution, StorageError};

pub(super) async fn run_review_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "review",
            "enqueued_items_listed_in_creation_order",
            enqueued_items_listed_in_creation_order(factory).await,
        ),
        TestResult::from_result(
            "review",
            "duplicate_review_rejected",
            duplicate_review_rejected(factory).await,
        ),
        TestResult::from_result(
            "review",
            "resolved_items_hidden_from_open_listing",
            resolved_items_hidden_from_open_listing(factory).await,
        ),
        TestResult::from_result(
            "review",
            "resolve_twice_rejected",
            resolve_twice_rejected(factory).await,
        ),
        TestResult::from_result(
            "review",
            "resolve_missing_not_found",
            resolve_missing_not_found(factory).await,
        ),
    ]
}

fn resolution(note: &str) -> ReviewResolution {
    ReviewResolution {
        reviewer: "auditor".to_string(),
        note: note.to_string(),
        resolved_at: OffsetDateTime::UNIX_EPOCH,
    }
}

async fn enqueued_items_listed_in_creation_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.enqueue_review(make_review("rev-b", "leg-2", at(JAN_1 + DAY)))
        .await
        .map_err(|e| format!("enqueue: {e}"))?;
    s.enqueue_review(make_review("rev-a", "leg-1", at(JAN_1)))
        .await
        .map_err(|e| format!("enqueue: {e}"))?;

    let items = s
        .list_reviews(true)
        .await
        .map_err(|e| format!("list: {e}"))?;
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    if ids != ["rev-a", "rev-b"] {
        return Err(format!("unexpected order: {:?}", ids));
    }
    Ok(())
}

async fn duplicate_review_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let item = make_review("rev-a", "leg-1", at(JAN_1));
    s.enqueue_review(item.clone())
        .await
        .map_err(|e| format!("enqueue: {e}"))?;
    match s.enqueue_review(item).await {
        Err(StorageError::DuplicateReview { review_id }) if review_id == "rev-a" => Ok(()),
        other => Err(format!("expected DuplicateReview, got {:?}", other)),
    }
}

async fn resolved_items_hidden_from_open_listing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for (id, offset) in [("rev-a", 0), ("rev-b", DAY)] {
        s.enqueue_review(make_review(id, "leg-1", at(JAN_1 + offset)))
            .await
            .map_err(|e| format!("enqueue: {e}"))?;
    }

    let resolved = s
        .resolve_review("rev-a", resolution("odometer typo"))
        .await
        .map_err(|e| format!("resolve: {e}"))?;
    if resolved.resolution.as_ref().map(|r| r.note.as_str()) != Some("odometer typo") {
        return Err("resolution not returned".to_string());
    }

    let open = s
        .list_reviews(true)
        .await
        .map_err(|e| format!("list open: {e}"))?;
    if open.len() != 1 || open[0].id != "rev-b" {
        return Err(format!("unexpected open items: {:?}", open));
    }
    let all = s
        .list_reviews(false)
        .await
        .map_err(|e| format!("list all: {e}"))?;
    if all.len() != 2 {
        return Err(format!("expected 2 items, got {}", all.len()));
    }
    Ok(())
}

async fn resolve_twice_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.enqueue_review(make_review("rev-a", "leg-1", at(JAN_1)))
        .await
        .map_err(|e| format!("enqueue: {e}"))?;
    s.resolve_review("rev-a", resolution("first"))
        .await
        .map_err(|e| format!("resolve: {e}"))?;
    match s.resolve_review("rev-a", resolution("second")).await {
        Err(StorageError::ReviewAlreadyResolved { .. }) => Ok(()),
        other => Err(format!("expected ReviewAlreadyResolved, got {:?}", other)),
    }
}

async fn resolve_missing_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LegStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.resolve_review("rev-404", resolution("n/a")).await {
        Err(StorageError::ReviewNotFound { review_id }) if review_id == "rev-404" => Ok(()),
        other => Err(format!("expected ReviewNotFound, got {:?}", other)),
    }
}
