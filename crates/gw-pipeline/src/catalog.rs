//! Metadata catalog loaded from a JSON export.
//!
//! ```json
//! {
//!   "datasets": ["mc15_13TeV.410000.PowhegPythiaEvtGen_ttbar.evgen.EVNT.e3698"],
//!   "physics_params": [
//!     {"logicalDatasetName": "mc15_13TeV.410000.PowhegPythiaEvtGen_ttbar.evgen.EVNT.e3698",
//!      "paramName": "crossSection", "paramValue": "696.11",
//!      "insert_time": "2015-07-30 10:12:01"}
//!   ],
//!   "replicas": {"user.jdoe.410000.ttbar.e3698_p2375": ["/data/a.root", "/data/b.root"]}
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use gw_core::{
    DatasetDiscovery, Error, MetadataSource, PhysicsConstants, PhysicsParam, Result, SampleSource,
};

/// Timestamp format of `insert_time`.
pub const INSERT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cross section parameter.
pub const CROSS_SECTION: &str = "crossSection";
/// Generator filter efficiency parameter.
pub const FILTER_EFFICIENCY: &str = "genFiltEff";
/// Higher-order correction parameter.
pub const K_FACTOR: &str = "kFactor";

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    datasets: Vec<String>,
    #[serde(default)]
    physics_params: Vec<ParamRow>,
    #[serde(default)]
    replicas: Option<BTreeMap<String, Vec<PathBuf>>>,
}

#[derive(Debug, Deserialize)]
struct ParamRow {
    #[serde(rename = "logicalDatasetName")]
    logical_dataset_name: String,
    #[serde(rename = "paramName")]
    param_name: String,
    #[serde(rename = "paramValue", deserialize_with = "number_or_string")]
    param_value: f64,
    #[serde(deserialize_with = "insert_time")]
    insert_time: NaiveDateTime,
}

fn number_or_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }
    let value = match Raw::deserialize(d)? {
        Raw::Number(v) => v,
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom)?,
    };
    if !value.is_finite() {
        return Err(serde::de::Error::custom(format!("non-finite parameter value {value}")));
    }
    Ok(value)
}

fn insert_time<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<NaiveDateTime, D::Error> {
    let s = String::deserialize(d)?;
    NaiveDateTime::parse_from_str(&s, INSERT_TIME_FORMAT).map_err(serde::de::Error::custom)
}

/// In-memory catalog answering metadata and grid-discovery queries.
#[derive(Debug, Clone, Default)]
pub struct LocalCatalog {
    datasets: BTreeSet<String>,
    params: BTreeMap<String, Vec<PhysicsParam>>,
    replicas: Option<BTreeMap<String, Vec<PathBuf>>>,
}

impl LocalCatalog {
    /// Load a catalog export.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let catalog = Self::from_json(&text)?;
        tracing::debug!(
            path = %path.display(),
            datasets = catalog.datasets.len(),
            with_replicas = catalog.replicas.is_some(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse a catalog export from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(text)?;
        let mut datasets: BTreeSet<String> = file.datasets.into_iter().collect();
        let mut params: BTreeMap<String, Vec<PhysicsParam>> = BTreeMap::new();
        for row in file.physics_params {
            datasets.insert(row.logical_dataset_name.clone());
            params.entry(row.logical_dataset_name).or_default().push(PhysicsParam {
                param_name: row.param_name,
                param_value: row.param_value,
                insert_time: row.insert_time,
            });
        }
        Ok(Self { datasets, params, replicas: file.replicas })
    }

    /// Add a dataset with its parameter rows.
    pub fn insert(&mut self, logical_dataset_name: impl Into<String>, rows: Vec<PhysicsParam>) {
        let name = logical_dataset_name.into();
        self.datasets.insert(name.clone());
        self.params.entry(name).or_default().extend(rows);
    }

    /// Whether the catalog can resolve grid patterns.
    pub fn has_replicas(&self) -> bool {
        self.replicas.is_some()
    }
}

impl MetadataSource for LocalCatalog {
    fn list_datasets(&self, pattern: &str) -> Result<Vec<String>> {
        let re = wildcard_regex(pattern)?;
        Ok(self.datasets.iter().filter(|name| re.is_match(name)).cloned().collect())
    }

    fn physics_params(&self, logical_dataset_name: &str) -> Result<Vec<PhysicsParam>> {
        Ok(self.params.get(logical_dataset_name).cloned().unwrap_or_default())
    }
}

impl DatasetDiscovery for LocalCatalog {
    fn resolve(&self, pattern: &str) -> Result<Vec<SampleSource>> {
        let Some(replicas) = &self.replicas else {
            return Err(Error::Setup("catalog has no replica information".into()));
        };
        let re = wildcard_regex(pattern)?;
        Ok(replicas
            .iter()
            .filter(|(name, _)| re.is_match(name))
            .map(|(name, files)| SampleSource::new(name.clone(), files.clone()))
            .collect())
    }
}

/// Anchored regex for a catalog pattern: `%` and `*` match any run of
/// characters, everything else is literal. A `scope:` prefix is ignored.
pub fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let pattern = pattern.split_once(':').map_or(pattern, |(_, name)| name);
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for (i, literal) in pattern.split(['%', '*']).enumerate() {
        if i > 0 {
            re.push_str(".*");
        }
        re.push_str(&regex::escape(literal));
    }
    re.push('$');
    Regex::new(&re).map_err(|e| Error::Validation(format!("bad pattern '{pattern}': {e}")))
}

/// Latest value of each physics constant; absent ones stay at the sentinel.
pub fn latest_constants(rows: &[PhysicsParam]) -> PhysicsConstants {
    let latest = |name: &str| {
        rows.iter()
            .filter(|row| row.param_name == name)
            .max_by_key(|row| row.insert_time)
            .map(|row| row.param_value)
    };
    let mut constants = PhysicsConstants::default();
    if let Some(v) = latest(CROSS_SECTION) {
        constants.cross_section = v;
    }
    if let Some(v) = latest(FILTER_EFFICIENCY) {
        constants.filter_efficiency = v;
    }
    if let Some(v) = latest(K_FACTOR) {
        constants.k_factor = v;
    }
    constants
}

/// Physics constants without any row among `rows`.
pub fn missing_params(rows: &[PhysicsParam]) -> Vec<&'static str> {
    [CROSS_SECTION, FILTER_EFFICIENCY, K_FACTOR]
        .into_iter()
        .filter(|name| !rows.iter().any(|row| row.param_name == *name))
        .collect()
}
