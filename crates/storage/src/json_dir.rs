//! Filesystem `LegStore`: one pretty-printed JSON document per record.
//!
//! Layout under the root directory:
//!
//! ```text
//! legs/<leg_id>.json
//! reviews/<review_id>.json
//! ```
//!
//! Writes go to a temporary sibling and are renamed into place. Mutating
//! calls are serialized by an in-process mutex, which is what makes
//! compare-and-swap atomic; the directory must not be shared by two
//! processes writing concurrently.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ifta_engine::{LegStatus, TripLeg};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::record::{guard_swap, sort_legs, sort_reviews, LegQuery, ReviewItem, ReviewResolution};
use crate::traits::LegStore;

const LEGS_DIR: &str = "legs";
const REVIEWS_DIR: &str = "reviews";

pub struct JsonDirLegStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonDirLegStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        for sub in [LEGS_DIR, REVIEWS_DIR] {
            tokio::fs::create_dir_all(root.join(sub))
                .await
                .map_err(|e| backend(&root.join(sub), e))?;
        }
        log::debug!("opened leg store at {}", root.display());
        Ok(JsonDirLegStore {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, dir: &str, id: &str) -> PathBuf {
        self.root.join(dir).join(format!("{}.json", id))
    }

    /// Path of an existing leg. An id that cannot name a file cannot name a
    /// stored leg either.
    fn leg_path(&self, leg_id: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_id(leg_id) {
            return Err(StorageError::LegNotFound {
                leg_id: leg_id.to_string(),
            });
        }
        Ok(self.record_path(LEGS_DIR, leg_id))
    }

    fn review_path(&self, review_id: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_id(review_id) {
            return Err(StorageError::ReviewNotFound {
                review_id: review_id.to_string(),
            });
        }
        Ok(self.record_path(REVIEWS_DIR, review_id))
    }

    /// Path for a record about to be written.
    fn new_record_path(&self, dir: &str, id: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_id(id) {
            return Err(StorageError::Backend(format!(
                "record id '{}' is not a safe file name",
                id
            )));
        }
        Ok(self.record_path(dir, id))
    }
}

fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn backend(path: &Path, e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(format!("{}: {}", path.display(), e))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| backend(path, e)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(backend(path, e)),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| backend(path, e))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| backend(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| backend(path, e))
}

async fn read_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StorageError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| backend(dir, e))?;
    let mut records = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| backend(dir, e))? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(record) = read_json(&path).await? {
            records.push(record);
        }
    }
    Ok(records)
}

#[async_trait]
impl LegStore for JsonDirLegStore {
    async fn insert_leg(&self, leg: TripLeg) -> Result<(), StorageError> {
        let path = self.new_record_path(LEGS_DIR, &leg.id)?;
        let _guard = self.write_lock.lock().await;
        if read_json::<TripLeg>(&path).await?.is_some() {
            return Err(StorageError::AlreadyExists { leg_id: leg.id });
        }
        write_json(&path, &leg).await
    }

    async fn get_leg(&self, leg_id: &str) -> Result<TripLeg, StorageError> {
        let path = self.leg_path(leg_id)?;
        read_json(&path)
            .await?
            .ok_or_else(|| StorageError::LegNotFound {
                leg_id: leg_id.to_string(),
            })
    }

    async fn compare_and_swap(
        &self,
        expected: LegStatus,
        leg: TripLeg,
    ) -> Result<TripLeg, StorageError> {
        let path = self.leg_path(&leg.id)?;
        let _guard = self.write_lock.lock().await;
        let stored: TripLeg = read_json(&path)
            .await?
            .ok_or_else(|| StorageError::LegNotFound {
                leg_id: leg.id.clone(),
            })?;
        guard_swap(&stored, expected)?;
        write_json(&path, &leg).await?;
        log::debug!("swap leg {}: {} -> {}", leg.id, expected, leg.status);
        Ok(leg)
    }

    async fn list_legs(&self, query: &LegQuery) -> Result<Vec<TripLeg>, StorageError> {
        let mut legs: Vec<TripLeg> = read_all::<TripLeg>(&self.root.join(LEGS_DIR))
            .await?
            .into_iter()
            .filter(|leg| query.matches(leg))
            .collect();
        sort_legs(&mut legs);
        Ok(legs)
    }

    async fn enqueue_review(&self, item: ReviewItem) -> Result<(), StorageError> {
        let path = self.new_record_path(REVIEWS_DIR, &item.id)?;
        let _guard = self.write_lock.lock().await;
        if read_json::<ReviewItem>(&path).await?.is_some() {
            return Err(StorageError::DuplicateReview { review_id: item.id });
        }
        write_json(&path, &item).await
    }

    async fn list_reviews(&self, open_only: bool) -> Result<Vec<ReviewItem>, StorageError> {
        let mut items: Vec<ReviewItem> = read_all::<ReviewItem>(&self.root.join(REVIEWS_DIR))
            .await?
            .into_iter()
            .filter(|item| !open_only || item.is_open())
            .collect();
        sort_reviews(&mut items);
        Ok(items)
    }

    async fn resolve_review(
        &self,
        review_id: &str,
        resolution: ReviewResolution,
    ) -> Result<ReviewItem, StorageError> {
        let path = self.review_path(review_id)?;
        let _guard = self.write_lock.lock().await;
        let mut item: ReviewItem =
            read_json(&path)
                .await?
                .ok_or_else(|| StorageError::ReviewNotFound {
                    review_id: review_id.to_string(),
                })?;
        if !item.is_open() {
            return Err(StorageError::ReviewAlreadyResolved {
                review_id: review_id.to_string(),
            });
        }
        item.resolution = Some(resolution);
        write_json(&path, &item).await?;
        Ok(item)
    }
}
