use ifta_engine::LegStatus;

/// All errors that can be returned by a `LegStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic guard failed: the persisted status is not the one the
    /// caller read. The caller must re-read the leg and retry.
    #[error("stale state on leg {leg_id}: expected {expected}, found {found}")]
    StaleState {
        leg_id: String,
        expected: LegStatus,
        found: LegStatus,
    },

    /// The leg is `COMPLETED` and can no longer be written.
    #[error("leg {leg_id} is completed and immutable")]
    Immutable { leg_id: String },

    /// No leg with the given id.
    #[error("leg not found: {leg_id}")]
    LegNotFound { leg_id: String },

    /// A leg with this id already exists.
    #[error("leg already exists: {leg_id}")]
    AlreadyExists { leg_id: String },

    /// No review item with the given id.
    #[error("review item not found: {review_id}")]
    ReviewNotFound { review_id: String },

    /// A review item with this id already exists.
    #[error("review item already exists: {review_id}")]
    DuplicateReview { review_id: String },

    /// The review item already carries a resolution.
    #[error("review item already resolved: {review_id}")]
    ReviewAlreadyResolved { review_id: String },

    /// A backend-specific storage error (I/O, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::StaleState { .. } => "STALE_STATE",
            StorageError::Immutable { .. } => "LEG_IMMUTABLE",
            StorageError::LegNotFound { .. } => "LEG_NOT_FOUND",
            StorageError::AlreadyExists { .. } => "LEG_ALREADY_EXISTS",
            StorageError::ReviewNotFound { .. } => "REVIEW_NOT_FOUND",
            StorageError::DuplicateReview { .. } => "REVIEW_ALREADY_EXISTS",
            StorageError::ReviewAlreadyResolved { .. } => "REVIEW_ALREADY_RESOLVED",
            StorageError::Backend(_) => "STORAGE_UNAVAILABLE",
        }
    }

    /// Only backend failures are infrastructure faults; everything else is
    /// a domain signal the caller is expected to handle.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, StorageError::Backend(_))
    }
}
