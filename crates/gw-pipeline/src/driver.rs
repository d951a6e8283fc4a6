//! Aggregation driver: fan samples out to a worker pool, merge records as they
//! complete, checkpoint after each merge.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gw_core::{Error, Result, SampleSource, WeightRecord, WeightTable};

use crate::evaluator::Evaluator;
use crate::naming;
use crate::output::OutputFile;

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Samples submitted to the pool
    pub submitted: usize,
    /// Records merged into the table
    pub processed: usize,
    /// Samples dropped because their name did not parse
    pub dropped: usize,
    /// Samples whose evaluation errored or panicked
    pub failed: usize,
    /// Merged records with failed files or unknown physics constants
    pub incomplete: usize,
    /// Wall time of the run
    pub elapsed: Duration,
}

enum Outcome {
    Done { name: String, dataset_id: String, record: WeightRecord },
    Dropped { name: String, error: Error },
    Failed { name: String, message: String },
}

/// Runs an [`Evaluator`] over many samples and keeps the output file current.
#[derive(Debug)]
pub struct Driver {
    evaluator: Arc<Evaluator>,
    output: OutputFile,
}

impl Driver {
    /// Create a driver writing to `output`
    pub fn new(evaluator: Evaluator, output: OutputFile) -> Self {
        Self { evaluator: Arc::new(evaluator), output }
    }

    /// Evaluate every source and return the final table.
    ///
    /// Per-sample problems are logged and counted, never returned; errors
    /// come only from building the pool or writing the final output.
    pub fn run(&self, sources: Vec<SampleSource>) -> Result<(WeightTable, RunSummary)> {
        let start = Instant::now();
        let workers = self.evaluator.settings().workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("gw-worker-{i}"))
            .build()
            .map_err(|e| Error::Setup(format!("cannot start worker pool: {e}")))?;

        let mut summary = RunSummary { submitted: sources.len(), ..Default::default() };
        tracing::info!(samples = summary.submitted, workers, "starting run");

        let (tx, rx) = crossbeam_channel::unbounded();
        for source in sources {
            let tx = tx.clone();
            let evaluator = Arc::clone(&self.evaluator);
            pool.spawn(move || {
                let name = source.name.clone();
                let outcome = catch_unwind(AssertUnwindSafe(|| process(&evaluator, source)))
                    .unwrap_or_else(|p| Outcome::Failed { name, message: panic_message(&*p) });
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        let mut table = WeightTable::new();
        let mut last_written: Option<Vec<u8>> = None;
        let mut finished = 0;
        for outcome in rx.iter() {
            finished += 1;
            match outcome {
                Outcome::Done { name, dataset_id, record } => {
                    if !record.is_complete() {
                        summary.incomplete += 1;
                    }
                    tracing::info!(
                        finished,
                        total = summary.submitted,
                        dataset_id = %dataset_id,
                        num_events = record.num_events,
                        errors = record.errors.len(),
                        "sample done"
                    );
                    if table.upsert(dataset_id.clone(), record).is_some() {
                        tracing::warn!(
                            dataset_id = %dataset_id,
                            sample = %name,
                            "dataset id seen twice, keeping the latest record"
                        );
                    }
                    summary.processed += 1;
                    if let Err(e) = self.checkpoint(&table, &mut last_written) {
                        let path = self.output.path().display();
                        tracing::error!(path = %path, error = %e, "checkpoint failed");
                    }
                }
                Outcome::Dropped { name, error } => {
                    summary.dropped += 1;
                    tracing::warn!(sample = %name, error = %error, "sample dropped");
                }
                Outcome::Failed { name, message } => {
                    summary.failed += 1;
                    tracing::error!(sample = %name, error = %message, "sample failed");
                }
            }
        }

        self.checkpoint(&table, &mut last_written)?;
        summary.elapsed = start.elapsed();
        tracing::info!(
            processed = summary.processed,
            dropped = summary.dropped,
            failed = summary.failed,
            incomplete = summary.incomplete,
            elapsed_s = summary.elapsed.as_secs_f64(),
            output = %self.output.path().display(),
            "run finished"
        );
        Ok((table, summary))
    }

    /// Write the table unless the bytes on disk are already identical.
    fn checkpoint(&self, table: &WeightTable, last_written: &mut Option<Vec<u8>>) -> Result<()> {
        let bytes = self.output.render(table)?;
        if last_written.as_deref() == Some(bytes.as_slice()) {
            return Ok(());
        }
        self.output.write_bytes(&bytes)?;
        *last_written = Some(bytes);
        Ok(())
    }
}

fn process(evaluator: &Evaluator, source: SampleSource) -> Outcome {
    let name = source.name.clone();
    let sample = match naming::parse_sample(source) {
        Ok(s) => s,
        Err(error) => return Outcome::Dropped { name, error },
    };
    match evaluator.evaluate(&sample) {
        Ok(record) => Outcome::Done { name, dataset_id: sample.dataset_id, record },
        Err(e) => Outcome::Failed { name, message: e.to_string() },
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
