//! Common data types for getweights

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Value stored in a physics field when the catalog has no usable answer.
pub const SENTINEL: f64 = -1.0;

/// An input dataset as found by discovery, before its name is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSource {
    /// Directory name, file name or logical dataset name
    pub name: String,
    /// Physical files that belong to the dataset
    pub files: Vec<PathBuf>,
}

impl SampleSource {
    /// Create a sample source
    pub fn new(name: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self { name: name.into(), files }
    }
}

/// A dataset whose identifiers were extracted from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Numeric dataset identifier (6 to 8 digits)
    pub dataset_id: String,
    /// Simulation campaign token (`e` followed by 4 digits)
    pub generator_tag: String,
    /// Name the identifiers were parsed from
    pub name: String,
    /// Physical files that belong to the dataset
    pub files: Vec<PathBuf>,
}

/// Cross section, filter efficiency and k-factor of one generation-level dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConstants {
    /// Cross section
    pub cross_section: f64,
    /// Generator filter efficiency
    pub filter_efficiency: f64,
    /// Higher-order correction factor
    pub k_factor: f64,
}

impl Default for PhysicsConstants {
    fn default() -> Self {
        Self { cross_section: SENTINEL, filter_efficiency: SENTINEL, k_factor: SENTINEL }
    }
}

impl PhysicsConstants {
    /// True when none of the fields is at the sentinel.
    pub fn is_known(&self) -> bool {
        [self.cross_section, self.filter_efficiency, self.k_factor].iter().all(|&v| v != SENTINEL)
    }
}

/// One row returned by a metadata catalog for a logical dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsParam {
    /// Parameter name (`crossSection`, `genFiltEff`, `kFactor`, ...)
    pub param_name: String,
    /// Parameter value
    pub param_value: f64,
    /// When the row was inserted into the catalog
    pub insert_time: NaiveDateTime,
}

/// Normalization constants for one dataset.
///
/// Field order is the serialized key order, which is kept alphabetical so
/// JSON and YAML outputs have sorted keys at every level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    /// Cross section of the generation-level dataset
    #[serde(rename = "cross section", default = "sentinel")]
    pub cross_section: f64,
    /// Files that could not be counted
    #[serde(default)]
    pub errors: Vec<String>,
    /// Generator filter efficiency
    #[serde(rename = "filter efficiency", default = "sentinel")]
    pub filter_efficiency: f64,
    /// Higher-order correction factor
    #[serde(rename = "k-factor", default = "sentinel")]
    pub k_factor: f64,
    /// Sum of processed events over all readable files
    #[serde(rename = "num events", default)]
    pub num_events: f64,
}

fn sentinel() -> f64 {
    SENTINEL
}

impl Default for WeightRecord {
    fn default() -> Self {
        Self::new(0.0, Vec::new(), PhysicsConstants::default())
    }
}

impl WeightRecord {
    /// Create a weight record
    pub fn new(num_events: f64, errors: Vec<String>, physics: PhysicsConstants) -> Self {
        Self {
            cross_section: physics.cross_section,
            errors,
            filter_efficiency: physics.filter_efficiency,
            k_factor: physics.k_factor,
            num_events,
        }
    }

    /// Physics constants of this record
    pub fn physics(&self) -> PhysicsConstants {
        PhysicsConstants {
            cross_section: self.cross_section,
            filter_efficiency: self.filter_efficiency,
            k_factor: self.k_factor,
        }
    }

    /// True when every file was counted and every physics field is known.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.physics().is_known()
    }
}

/// Weight records keyed by dataset id, iterated in sorted key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable(BTreeMap<String, WeightRecord>);

impl WeightTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record of `dataset_id`. Returns the replaced record.
    pub fn upsert(
        &mut self,
        dataset_id: impl Into<String>,
        record: WeightRecord,
    ) -> Option<WeightRecord> {
        self.0.insert(dataset_id.into(), record)
    }

    /// Record of `dataset_id`, if present
    pub fn get(&self, dataset_id: &str) -> Option<&WeightRecord> {
        self.0.get(dataset_id)
    }

    /// Whether `dataset_id` has a record
    pub fn contains(&self, dataset_id: &str) -> bool {
        self.0.contains_key(dataset_id)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(dataset_id, record)` in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &WeightRecord)> {
        self.0.iter()
    }

    /// Iterate mutably over records in sorted order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut WeightRecord)> {
        self.0.iter_mut()
    }

    /// Dataset ids in sorted order
    pub fn dataset_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
