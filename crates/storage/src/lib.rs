//! Persistence boundary for IFTA trip legs.
//!
//! [`LegStore`] is the trait the tracker and report builder program
//! against. Two backends ship with the crate: [`MemoryLegStore`] for tests
//! and ephemeral servers, and [`JsonDirLegStore`] which keeps one JSON
//! document per record on disk. [`conformance`] holds the backend-agnostic
//! suite both of them (and any external backend) must pass.

pub mod conformance;
mod error;
mod json_dir;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use json_dir::JsonDirLegStore;
pub use memory::MemoryLegStore;
pub use record::{LegQuery, ReviewItem, ReviewResolution};
pub use traits::LegStore;
