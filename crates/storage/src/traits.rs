use async_trait::async_trait;
use ifta_engine::{LegStatus, TripLeg};

use crate::error::StorageError;
use crate::record::{LegQuery, ReviewItem, ReviewResolution};

/// Durable storage for trip legs and the odometer review queue.
///
/// ## Optimistic guard
///
/// Every status change goes through [`compare_and_swap`](LegStore::compare_and_swap):
/// the write is accepted only if the persisted status still equals the
/// status the caller read. A mismatch returns
/// `Err(StorageError::StaleState { .. })`; nothing blocks and nothing is
/// overwritten. A leg persisted as `COMPLETED` rejects every write with
/// `Err(StorageError::Immutable { .. })`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be shared through
/// axum application state and across async task boundaries.
#[async_trait]
pub trait LegStore: Send + Sync + 'static {
    // ── Legs ──────────────────────────────────────────────────────────────────

    /// Persist a new leg. Returns `Err(StorageError::AlreadyExists)` on id reuse.
    async fn insert_leg(&self, leg: TripLeg) -> Result<(), StorageError>;

    /// Read one leg. Returns `Err(StorageError::LegNotFound)` if absent.
    async fn get_leg(&self, leg_id: &str) -> Result<TripLeg, StorageError>;

    /// Replace the stored leg with `leg` iff its persisted status is `expected`.
    ///
    /// Returns the stored leg on success.
    async fn compare_and_swap(
        &self,
        expected: LegStatus,
        leg: TripLeg,
    ) -> Result<TripLeg, StorageError>;

    /// List legs matching `query`, ordered by `(created_at, id)`.
    async fn list_legs(&self, query: &LegQuery) -> Result<Vec<TripLeg>, StorageError>;

    // ── Review queue ──────────────────────────────────────────────────────────

    /// Append a review item. Returns `Err(StorageError::DuplicateReview)` on id reuse.
    async fn enqueue_review(&self, item: ReviewItem) -> Result<(), StorageError>;

    /// List review items ordered by `(created_at, id)`; `open_only` hides resolved ones.
    async fn list_reviews(&self, open_only: bool) -> Result<Vec<ReviewItem>, StorageError>;

    /// Attach a resolution to an open review item.
    async fn resolve_review(
        &self,
        review_id: &str,
        resolution: ReviewResolution,
    ) -> Result<ReviewItem, StorageError>;
}
