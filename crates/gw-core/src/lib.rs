//! # gw-core
//!
//! Core types and traits for getweights.
//!
//! The pipeline crate depends only on the traits declared here, so file
//! readers and metadata catalogs can be swapped without touching the
//! aggregation logic.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{DatasetDiscovery, EventCounter, MetadataSource};
pub use types::{
    PhysicsConstants, PhysicsParam, SENTINEL, Sample, SampleSource, WeightRecord, WeightTable,
};

/// Crate version, shared by every binary in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
