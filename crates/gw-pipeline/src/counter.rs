//! Declarative event counters over ROOT histograms.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use gw_core::{Error, EventCounter, Result};
use gw_root::{Histogram, RootFile};

/// What number to take out of each file.
///
/// Loaded from the `--config` JSON file:
///
/// ```json
/// {"kind": "histogram_bin", "histogram": "cut_flow", "bin": 2}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CounterSpec {
    /// Content of one cell, ROOT numbering (0 is the underflow)
    HistogramBin {
        /// Histogram path, `/`-separated through sub-directories
        histogram: String,
        /// Cell index
        bin: usize,
    },
    /// Sum of the regular bins, optionally with under/overflow
    HistogramIntegral {
        /// Histogram path
        histogram: String,
        /// Add underflow and overflow cells
        #[serde(default)]
        include_flows: bool,
    },
    /// Stored number of entries
    HistogramEntries {
        /// Histogram path
        histogram: String,
    },
}

impl Default for CounterSpec {
    /// Second cutflow bin: events after the derivation's initial selection.
    fn default() -> Self {
        CounterSpec::HistogramBin { histogram: "cut_flow".into(), bin: 2 }
    }
}

impl CounterSpec {
    /// Load and validate a spec from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let spec: CounterSpec = serde_json::from_str(&text)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Histogram path the spec reads.
    pub fn histogram(&self) -> &str {
        match self {
            CounterSpec::HistogramBin { histogram, .. }
            | CounterSpec::HistogramIntegral { histogram, .. }
            | CounterSpec::HistogramEntries { histogram } => histogram,
        }
    }

    /// Reject specs that cannot address anything.
    pub fn validate(&self) -> Result<()> {
        if self.histogram().split('/').all(str::is_empty) {
            return Err(Error::Validation("counter histogram path is empty".into()));
        }
        Ok(())
    }

    fn extract(&self, h: &Histogram) -> std::result::Result<f64, String> {
        match self {
            CounterSpec::HistogramBin { bin, .. } => h.bin_content(*bin).ok_or_else(|| {
                format!("bin {bin} out of range for '{}' with {} bins", h.name, h.n_bins)
            }),
            CounterSpec::HistogramIntegral { include_flows, .. } => Ok(h.integral(*include_flows)),
            CounterSpec::HistogramEntries { .. } => Ok(h.entries),
        }
    }
}

/// [`EventCounter`] reading one histogram per file.
#[derive(Debug, Clone)]
pub struct HistogramCounter {
    spec: CounterSpec,
}

impl HistogramCounter {
    /// Create a counter, validating the spec.
    pub fn new(spec: CounterSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self { spec })
    }

    /// Count events in an already opened file.
    pub fn count_in(&self, file: &RootFile) -> Result<f64> {
        let path = file.path().display().to_string();
        let histogram = file
            .get_histogram(self.spec.histogram())
            .map_err(|e| Error::Counter { path: path.clone(), message: e.to_string() })?;
        self.spec.extract(&histogram).map_err(|message| Error::Counter { path, message })
    }
}

impl EventCounter for HistogramCounter {
    fn count(&self, path: &Path) -> Result<f64> {
        let file = RootFile::open(path).map_err(|e| Error::Counter {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.count_in(&file)
    }

    fn describe(&self) -> String {
        match &self.spec {
            CounterSpec::HistogramBin { histogram, bin } => format!("{histogram}[{bin}]"),
            CounterSpec::HistogramIntegral { histogram, include_flows: true } => {
                format!("integral({histogram}, flows)")
            }
            CounterSpec::HistogramIntegral { histogram, .. } => format!("integral({histogram})"),
            CounterSpec::HistogramEntries { histogram } => format!("entries({histogram})"),
        }
    }
}
