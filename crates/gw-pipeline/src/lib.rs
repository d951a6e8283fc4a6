//! # gw-pipeline
//!
//! The sample-aggregation pipeline behind `getweights`:
//!
//! 1. [`discovery`] turns command-line inputs into [`SampleSource`]s.
//! 2. [`naming`] extracts dataset id and generator tag from each name.
//! 3. [`evaluator::Evaluator`] counts events file by file and looks up the
//!    physics constants of the matching EVNT dataset.
//! 4. [`driver::Driver`] runs the evaluator on a fixed worker pool, merges
//!    records as they complete and checkpoints the table through [`output`].
//!
//! [`SampleSource`]: gw_core::SampleSource

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod counter;
pub mod counts;
pub mod discovery;
pub mod driver;
pub mod evaluator;
pub mod naming;
pub mod output;
pub mod retry;

pub use catalog::LocalCatalog;
pub use counter::{CounterSpec, HistogramCounter};
pub use discovery::{DiscoveryOptions, discover};
pub use driver::{Driver, RunSummary};
pub use evaluator::{Evaluator, RunContext, RunSettings};
pub use output::{OutputFile, OutputFormat};
pub use retry::RetryPolicy;
