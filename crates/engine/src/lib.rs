//! IFTA mileage apportionment engine.
//!
//! Pure, I/O-free building blocks used by the tracker and report services:
//!
//! - [`spans`]: routing response → per-jurisdiction miles
//! - [`aggregate`]: completed legs → jurisdiction totals (loaded vs. deadhead)
//! - [`reconcile`]: routed miles vs. odometer delta
//! - [`lifecycle`]: trip leg state machine
//! - [`report`]: worksheet assembly for a date range / truck
//!
//! All distance arithmetic uses `rust_decimal::Decimal`.

pub mod aggregate;
pub mod error;
pub mod lifecycle;
pub mod numeric;
pub mod reconcile;
pub mod report;
pub mod spans;
pub mod types;

pub use aggregate::{JurisdictionTotal, MileageAggregator, MileageTotals};
pub use error::ApportionError;
pub use numeric::ApportionPolicy;
pub use reconcile::{reconcile, reconcile_leg, Reconciliation, Verdict};
pub use report::{build_report, IftaReport, LegDetail, ReportScope};
pub use spans::{apportion_route, RouteApportionment, RouteResponse};
pub use types::{
    Coordinate, JurisdictionEntry, JurisdictionMiles, LegFailure, LegKind, LegStatus, NewLeg,
    TripLeg,
};
