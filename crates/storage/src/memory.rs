//! In-process `LegStore` backed by `BTreeMap`s behind a `tokio::sync::RwLock`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use ifta_engine::{LegStatus, TripLeg};
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{guard_swap, sort_legs, sort_reviews, LegQuery, ReviewItem, ReviewResolution};
use crate::traits::LegStore;

#[derive(Default)]
struct Inner {
    legs: BTreeMap<String, TripLeg>,
    reviews: BTreeMap<String, ReviewItem>,
}

/// Volatile store. The write lock makes each compare-and-swap atomic.
#[derive(Default)]
pub struct MemoryLegStore {
    inner: RwLock<Inner>,
}

impl MemoryLegStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LegStore for MemoryLegStore {
    async fn insert_leg(&self, leg: TripLeg) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        if inner.legs.contains_key(&leg.id) {
            return Err(StorageError::AlreadyExists { leg_id: leg.id });
        }
        log::debug!("insert leg {} ({})", leg.id, leg.status);
        inner.legs.insert(leg.id.clone(), leg);
        Ok(())
    }

    async fn get_leg(&self, leg_id: &str) -> Result<TripLeg, StorageError> {
        let inner = self.inner.read().await;
        inner
            .legs
            .get(leg_id)
            .cloned()
            .ok_or_else(|| StorageError::LegNotFound {
                leg_id: leg_id.to_string(),
            })
    }

    async fn compare_and_swap(
        &self,
        expected: LegStatus,
        leg: TripLeg,
    ) -> Result<TripLeg, StorageError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .legs
            .get_mut(&leg.id)
            .ok_or_else(|| StorageError::LegNotFound {
                leg_id: leg.id.clone(),
            })?;
        guard_swap(stored, expected)?;
        log::debug!("swap leg {}: {} -> {}", leg.id, expected, leg.status);
        *stored = leg.clone();
        Ok(leg)
    }

    async fn list_legs(&self, query: &LegQuery) -> Result<Vec<TripLeg>, StorageError> {
        let inner = self.inner.read().await;
        let mut legs: Vec<TripLeg> = inner
            .legs
            .values()
            .filter(|leg| query.matches(leg))
            .cloned()
            .collect();
        sort_legs(&mut legs);
        Ok(legs)
    }

    async fn enqueue_review(&self, item: ReviewItem) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        if inner.reviews.contains_key(&item.id) {
            return Err(StorageError::DuplicateReview { review_id: item.id });
        }
        inner.reviews.insert(item.id.clone(), item);
        Ok(())
    }

    async fn list_reviews(&self, open_only: bool) -> Result<Vec<ReviewItem>, StorageError> {
        let inner = self.inner.read().await;
        let mut items: Vec<ReviewItem> = inner
            .reviews
            .values()
            .filter(|item| !open_only || item.is_open())
            .cloned()
            .collect();
        sort_reviews(&mut items);
        Ok(items)
    }

    async fn resolve_review(
        &self,
        review_id: &str,
        resolution: ReviewResolution,
    ) -> Result<ReviewItem, StorageError> {
        let mut inner = self.inner.write().await;
        let item = inner
            .reviews
            .get_mut(review_id)
            .ok_or_else(|| StorageError::ReviewNotFound {
                review_id: review_id.to_string(),
            })?;
        if !item.is_open() {
            return Err(StorageError::ReviewAlreadyResolved {
                review_id: review_id.to_string(),
            });
        }
        item.resolution = Some(resolution);
        Ok(item.clone())
    }
}
