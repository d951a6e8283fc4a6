//! getweights CLI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use gw_core::EventCounter;
use gw_pipeline::evaluator::{DEFAULT_PROJECT, DEFAULT_WORKERS};
use gw_pipeline::{CounterSpec, HistogramCounter, RetryPolicy, RunSettings};

mod compute;
mod normalization;

#[derive(Parser)]
#[command(name = "getweights")]
#[command(about = "Make a weights file from cutflow counts and catalog metadata")]
#[command(version)]
struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also log the ROOT reader's internals
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count events and look up physics constants for every sample
    Compute {
        /// Input globs, list files (--input-list) or grid patterns (--input-grid)
        #[arg(required = true)]
        files: Vec<String>,

        /// Catalog export (JSON) with datasets, physics parameters and replicas
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Output file; `.yaml`/`.yml` selects YAML, anything else JSON
        #[arg(short, long, default_value = "weights.json")]
        output: PathBuf,

        /// Overwrite previous output if it exists
        #[arg(short, long)]
        force: bool,

        /// Inputs are text files listing one file (or grid pattern) per line
        #[arg(long)]
        input_list: bool,

        /// Inputs are grid dataset patterns resolved through the catalog
        #[arg(long)]
        input_grid: bool,

        /// Each file is a sample, rather than each directory
        #[arg(long)]
        flat_layout: bool,

        /// Worker pool size
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Catalog project of the EVNT datasets
        #[arg(long, default_value = DEFAULT_PROJECT)]
        project: String,

        #[command(flatten)]
        counting: CountingArgs,
    },

    /// Print `did<TAB>sum` of the counter over the files matching a template
    Sum {
        /// Dataset ids
        #[arg(long = "did")]
        dids: Vec<String>,

        /// File whose lines start with a dataset id
        #[arg(long)]
        did_list: Option<PathBuf>,

        /// Glob with a `{did}` placeholder, e.g. `/data/user.*.{did}.*/*.root*`
        #[arg(long)]
        template: String,

        #[command(flatten)]
        counting: CountingArgs,
    },

    /// Replace `num events` in a weights file from a `did:count` list
    UpdateCounts {
        /// Existing weights file (JSON or YAML)
        weights: PathBuf,

        /// Count list, one `did:count` per line
        #[arg(long)]
        counts: PathBuf,

        /// Output file. Defaults to `new_<weights>` next to the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

/// How each file is counted.
#[derive(Args)]
struct CountingArgs {
    /// Counter spec (JSON). Defaults to bin 2 of `cut_flow`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Attempts per file before it is recorded as an error
    #[arg(long, default_value = "3")]
    retries: u32,

    /// Delay after the first failed attempt; doubles on each retry
    #[arg(long, default_value = "500")]
    retry_delay_ms: u64,

    /// Bound on one read attempt, 0 to wait forever
    #[arg(long, default_value = "300")]
    read_timeout_secs: u64,
}

impl CountingArgs {
    fn counter(&self) -> Result<Arc<dyn EventCounter>> {
        let spec = match &self.config {
            Some(path) => CounterSpec::load(path)
                .with_context(|| format!("loading counter config {}", path.display()))?,
            None => CounterSpec::default(),
        };
        let counter = HistogramCounter::new(spec)?;
        tracing::info!(counter = %counter.describe(), "counter ready");
        Ok(Arc::new(counter))
    }

    fn settings(&self, workers: usize, project: String) -> RunSettings {
        RunSettings {
            workers,
            retry: RetryPolicy {
                max_attempts: self.retries.max(1),
                base_delay: Duration::from_millis(self.retry_delay_ms),
                ..RetryPolicy::default()
            },
            read_timeout: (self.read_timeout_secs > 0)
                .then(|| Duration::from_secs(self.read_timeout_secs)),
            project,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, cli.debug))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compute {
            files,
            catalog,
            output,
            force,
            input_list,
            input_grid,
            flat_layout,
            workers,
            project,
            counting,
        } => {
            let opts = gw_pipeline::DiscoveryOptions { input_list, input_grid, flat_layout };
            let settings = counting.settings(workers, project);
            compute::cmd_compute(
                &files,
                catalog.as_ref(),
                &output,
                force,
                &opts,
                &counting,
                settings,
            )
        }
        Commands::Sum { dids, did_list, template, counting } => {
            normalization::cmd_sum(&dids, did_list.as_ref(), &template, &counting)
        }
        Commands::UpdateCounts { weights, counts, output } => {
            normalization::cmd_update_counts(&weights, &counts, output.as_ref())
        }
        Commands::Version => {
            println!("getweights {}", gw_core::VERSION);
            Ok(())
        }
    }
}

/// RUST_LOG wins; otherwise info, raised by `-v`, with the ROOT reader kept
/// quiet unless `--debug`.
fn log_filter(verbose: u8, debug: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let reader = if debug { "trace" } else { "warn" };
    EnvFilter::new(format!("{level},gw_root={reader}"))
}
