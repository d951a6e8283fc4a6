//! Collaborator traits for getweights
//!
//! The aggregation pipeline talks to the outside world only through these
//! traits: something that counts events in a file, something that answers
//! metadata queries, and something that turns a dataset pattern into files.

use std::path::Path;

use crate::Result;
use crate::types::{PhysicsParam, SampleSource};

/// Produces a processed-event count for one file.
pub trait EventCounter: Send + Sync {
    /// Count events in `path`
    fn count(&self, path: &Path) -> Result<f64>;

    /// Short description for logs (e.g. `cut_flow[2]`)
    fn describe(&self) -> String;
}

/// Answers dataset and physics-parameter queries.
pub trait MetadataSource: Send + Sync {
    /// Logical dataset names matching `pattern` (`%` matches any run of characters)
    fn list_datasets(&self, pattern: &str) -> Result<Vec<String>>;

    /// Every physics-parameter row recorded for `logical_dataset_name`
    fn physics_params(&self, logical_dataset_name: &str) -> Result<Vec<PhysicsParam>>;
}

/// Resolves a dataset pattern into datasets with their physical files.
pub trait DatasetDiscovery: Send + Sync {
    /// Datasets matching `pattern`, each with its file replicas
    fn resolve(&self, pattern: &str) -> Result<Vec<SampleSource>>;
}
