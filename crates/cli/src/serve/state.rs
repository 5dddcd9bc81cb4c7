//! Application state.

use ifta_tracker::{ReportBuilder, TripLegTracker};

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// Leg lifecycle and review queue.
    pub(crate) tracker: TripLegTracker,
    /// Read-only worksheet queries over the same store.
    pub(crate) reports: ReportBuilder,
}
