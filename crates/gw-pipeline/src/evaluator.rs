//! Per-sample evaluation: event counts plus physics constants.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use gw_core::{
    Error, EventCounter, MetadataSource, PhysicsConstants, Result, Sample, WeightRecord,
};

use crate::catalog::{latest_constants, missing_params};
use crate::naming;
use crate::retry::RetryPolicy;

/// Default catalog project of the EVNT datasets.
pub const DEFAULT_PROJECT: &str = "mc15_13TeV";
/// Default worker pool size.
pub const DEFAULT_WORKERS: usize = 8;
/// Default bound on a single file read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Resolved run parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Worker pool size
    pub workers: usize,
    /// Per-file retry policy
    pub retry: RetryPolicy,
    /// Bound on one read attempt; `None` waits forever
    pub read_timeout: Option<Duration>,
    /// Catalog project used in the EVNT pattern
    pub project: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            retry: RetryPolicy::default(),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            project: DEFAULT_PROJECT.to_string(),
        }
    }
}

/// A count must be a finite, non-negative number of events.
fn usable(path: &Path, count: f64) -> Result<f64> {
    if count.is_finite() && count >= 0.0 {
        Ok(count)
    } else {
        Err(Error::Counter {
            path: path.display().to_string(),
            message: format!("counter returned {count}"),
        })
    }
}

/// Everything an evaluation needs, shared read-only by all workers.
#[derive(Clone)]
pub struct RunContext {
    /// Event counter
    pub counter: Arc<dyn EventCounter>,
    /// Metadata source
    pub metadata: Arc<dyn MetadataSource>,
    /// Run parameters
    pub settings: RunSettings,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("counter", &self.counter.describe())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Computes the [`WeightRecord`] of one sample.
#[derive(Debug, Clone)]
pub struct Evaluator {
    ctx: RunContext,
}

impl Evaluator {
    /// Create an evaluator
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    /// Run parameters
    pub fn settings(&self) -> &RunSettings {
        &self.ctx.settings
    }

    /// Evaluate one sample.
    ///
    /// Unreadable files end up in `errors` and metadata problems leave the
    /// physics fields at the sentinel; only a malformed sample is an error.
    pub fn evaluate(&self, sample: &Sample) -> Result<WeightRecord> {
        if !naming::is_well_formed(sample) {
            return Err(Error::Validation(format!(
                "sample '{}' has malformed identifiers ({}, {})",
                sample.name, sample.dataset_id, sample.generator_tag
            )));
        }

        let (num_events, errors) = self.count_files(&sample.files);
        let physics = self.lookup_physics(sample);
        tracing::debug!(
            dataset_id = %sample.dataset_id,
            files = sample.files.len(),
            failed = errors.len(),
            num_events,
            physics_known = physics.is_known(),
            "sample evaluated"
        );
        Ok(WeightRecord::new(num_events, errors, physics))
    }

    /// Sum counts over `files`; returns the total and the paths that failed.
    pub fn count_files(&self, files: &[PathBuf]) -> (f64, Vec<String>) {
        let mut total = 0.0;
        let mut errors = Vec::new();
        for path in files {
            match self.count_file(path) {
                Ok(n) => total += n,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "giving up on file");
                    errors.push(path.display().to_string());
                }
            }
        }
        (total, errors)
    }

    /// Count one file under the retry policy.
    pub fn count_file(&self, path: &Path) -> Result<f64> {
        let label = path.display().to_string();
        self.ctx.settings.retry.run(&label, || self.count_once(path).and_then(|n| usable(path, n)))
    }

    fn count_once(&self, path: &Path) -> Result<f64> {
        let Some(timeout) = self.ctx.settings.read_timeout else {
            return self.ctx.counter.count(path);
        };

        // The reader runs detached; on timeout it is abandoned and its result dropped.
        let (tx, rx) = crossbeam_channel::bounded(1);
        let counter = Arc::clone(&self.ctx.counter);
        let owned = path.to_path_buf();
        std::thread::Builder::new().name("gw-read".into()).spawn(move || {
            let _ = tx.send(counter.count(&owned));
        })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout {
                path: path.display().to_string(),
                seconds: timeout.as_secs_f64(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Counter {
                path: path.display().to_string(),
                message: "reader thread panicked".into(),
            }),
        }
    }

    /// Physics constants of the sample's EVNT dataset, sentinels unless the
    /// pattern matches exactly one dataset.
    pub fn lookup_physics(&self, sample: &Sample) -> PhysicsConstants {
        let settings = &self.ctx.settings;
        let pattern =
            naming::evnt_pattern(&settings.project, &sample.dataset_id, &sample.generator_tag);
        let matches = match self.ctx.metadata.list_datasets(&pattern) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "dataset query failed");
                return PhysicsConstants::default();
            }
        };
        let [evnt] = matches.as_slice() else {
            tracing::warn!(
                pattern = %pattern,
                matches = matches.len(),
                "expected exactly one EVNT dataset"
            );
            return PhysicsConstants::default();
        };
        match self.ctx.metadata.physics_params(evnt) {
            Ok(rows) => {
                let missing = missing_params(&rows);
                if !missing.is_empty() {
                    tracing::warn!(
                        dataset = %evnt,
                        missing = ?missing,
                        "physics parameters missing, left at -1"
                    );
                }
                latest_constants(&rows)
            }
            Err(e) => {
                tracing::warn!(dataset = %evnt, error = %e, "physics parameter query failed");
                PhysicsConstants::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use gw_core::{PhysicsParam, SENTINEL};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::LocalCatalog;

    /// Counts `<n>.root` as n; anything else fails.
    struct NameCounter;

    impl EventCounter for NameCounter {
        fn count(&self, path: &Path) -> Result<f64> {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            stem.parse().map_err(|_| Error::Counter {
                path: path.display().to_string(),
                message: "not a count".into(),
            })
        }

        fn describe(&self) -> String {
            "name".into()
        }
    }

    struct FlakyCounter {
        calls: AtomicUsize,
        failures: usize,
    }

    impl EventCounter for FlakyCounter {
        fn count(&self, path: &Path) -> Result<f64> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(Error::Counter {
                    path: path.display().to_string(),
                    message: "busy".into(),
                });
            }
            Ok(10.0)
        }

        fn describe(&self) -> String {
            "flaky".into()
        }
    }

    struct SlowCounter;

    impl EventCounter for SlowCounter {
        fn count(&self, _path: &Path) -> Result<f64> {
            std::thread::sleep(Duration::from_secs(5));
            Ok(1.0)
        }

        fn describe(&self) -> String {
            "slow".into()
        }
    }

    fn row(name: &str, value: f64) -> PhysicsParam {
        let t = NaiveDate::from_ymd_opt(2015, 7, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        PhysicsParam { param_name: name.into(), param_value: value, insert_time: t }
    }

    fn catalog() -> LocalCatalog {
        let mut c = LocalCatalog::default();
        c.insert(
            "mc15_13TeV.410000.PowhegPythiaEvtGen_ttbar.evgen.EVNT.e3698",
            vec![row("crossSection", 696.11), row("genFiltEff", 0.543), row("kFactor", 1.1949)],
        );
        c.insert("mc15_13TeV.361106.Zee_a.evgen.EVNT.e3601", vec![row("crossSection", 1.0)]);
        c.insert("mc15_13TeV.361106.Zee_b.evgen.EVNT.e3601", vec![row("crossSection", 2.0)]);
        c
    }

    fn evaluator(counter: impl EventCounter + 'static, settings: RunSettings) -> Evaluator {
        let metadata = Arc::new(catalog());
        Evaluator::new(RunContext { counter: Arc::new(counter), metadata, settings })
    }

    fn fast() -> RunSettings {
        RunSettings {
            retry: RetryPolicy { base_delay: Duration::ZERO, ..RetryPolicy::default() },
            ..RunSettings::default()
        }
    }

    fn sample(id: &str, tag: &str, files: &[&str]) -> Sample {
        Sample {
            dataset_id: id.into(),
            generator_tag: tag.into(),
            name: format!("user.test.{id}.x.{tag}_p1"),
            files: files.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn counts_are_summed_and_failures_listed() {
        let e = evaluator(NameCounter, fast());
        let s = sample("410000", "e3698", &["100.root", "bad.root", "23.5.root"]);
        let record = e.evaluate(&s).unwrap();
        assert_relative_eq!(record.num_events, 123.5);
        assert_eq!(record.errors, vec!["bad.root".to_string()]);
        assert_relative_eq!(record.cross_section, 696.11);
        assert_relative_eq!(record.filter_efficiency, 0.543);
        assert_relative_eq!(record.k_factor, 1.1949);
        assert!(!record.is_complete());
    }

    #[test]
    fn nonsense_counts_are_failures() {
        let e = evaluator(NameCounter, fast());
        let s = sample("410000", "e3698", &["10.root", "NaN.root", "-5.root", "inf.root"]);
        let record = e.evaluate(&s).unwrap();
        assert_eq!(record.num_events, 10.0);
        assert_eq!(record.errors, vec!["NaN.root", "-5.root", "inf.root"]);
    }

    #[test]
    fn all_files_failing_still_yields_a_record() {
        let e = evaluator(NameCounter, fast());
        let record = e.evaluate(&sample("410000", "e3698", &["a.root", "b.root"])).unwrap();
        assert_eq!(record.num_events, 0.0);
        assert_eq!(record.errors.len(), 2);
    }

    #[test]
    fn ambiguous_evnt_match_leaves_sentinels() {
        let e = evaluator(NameCounter, fast());
        let record = e.evaluate(&sample("361106", "e3601", &["5.root"])).unwrap();
        assert_eq!(record.num_events, 5.0);
        assert_eq!(record.physics(), PhysicsConstants::default());
        assert_eq!(record.cross_section, SENTINEL);
    }

    #[test]
    fn missing_evnt_match_leaves_sentinels() {
        let e = evaluator(NameCounter, fast());
        let physics = e.lookup_physics(&sample("999999", "e0001", &[]));
        assert!(!physics.is_known());
    }

    #[test]
    fn project_changes_the_pattern() {
        let settings = RunSettings { project: "mc16_13TeV".into(), ..fast() };
        let e = evaluator(NameCounter, settings);
        assert!(!e.lookup_physics(&sample("410000", "e3698", &[])).is_known());
    }

    #[test]
    fn transient_failures_are_retried() {
        let e = evaluator(FlakyCounter { calls: AtomicUsize::new(0), failures: 2 }, fast());
        assert_eq!(e.count_file(Path::new("f.root")).unwrap(), 10.0);

        let e = evaluator(FlakyCounter { calls: AtomicUsize::new(0), failures: 3 }, fast());
        assert!(e.count_file(Path::new("f.root")).is_err());
    }

    #[test]
    fn hung_reads_time_out() {
        let settings = RunSettings {
            retry: RetryPolicy::none(),
            read_timeout: Some(Duration::from_millis(50)),
            ..RunSettings::default()
        };
        let e = evaluator(SlowCounter, settings);
        let err = e.count_file(Path::new("slow.root")).unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn malformed_sample_is_rejected() {
        let e = evaluator(NameCounter, fast());
        assert!(matches!(e.evaluate(&sample("41", "e3698", &[])), Err(Error::Validation(_))));
    }
}
