//! IFTA trip leg tracking services.
//!
//! - [`TripLegTracker`]: lifecycle transitions against a [`LegStore`](ifta_storage::LegStore)
//! - [`ReportBuilder`]: consolidated worksheet for a scope
//! - [`provider`]: truck routing providers (HERE v8, static fixture)
//! - [`LocationSource`]: live position for deadhead returns
//! - [`TrackerConfig`]: `ifta.toml` plus environment overrides

pub mod config;
mod error;
pub mod location;
pub mod provider;
mod report;
mod tracker;

pub use config::TrackerConfig;
pub use error::TrackerError;
pub use location::{FixedLocation, LocationSource};
pub use provider::{ProviderError, RoutingProvider};
pub use report::{date_scope, ReportBuilder};
pub use tracker::TripLegTracker;
