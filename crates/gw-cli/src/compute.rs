use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gw_core::{DatasetDiscovery, MetadataSource};
use gw_pipeline::{
    DiscoveryOptions, Driver, Evaluator, LocalCatalog, OutputFile, RunContext, RunSettings,
    discover,
};

use crate::CountingArgs;

pub(crate) fn cmd_compute(
    files: &[String],
    catalog: Option<&PathBuf>,
    output: &Path,
    force: bool,
    opts: &DiscoveryOptions,
    counting: &CountingArgs,
    settings: RunSettings,
) -> Result<()> {
    let catalog = match catalog {
        Some(path) => Some(
            LocalCatalog::load(path)
                .with_context(|| format!("loading catalog {}", path.display()))?,
        ),
        None => {
            tracing::warn!("no --catalog given, physics constants will stay at -1");
            None
        }
    };
    if opts.input_grid && !catalog.as_ref().is_some_and(LocalCatalog::has_replicas) {
        bail!("--input-grid needs a --catalog with a \"replicas\" section");
    }

    let counter = counting.counter()?;

    // Inputs are valid; claim the output before anything slow happens.
    let output = OutputFile::create(output, force)?;

    let grid = catalog.as_ref().map(|c| c as &dyn DatasetDiscovery);
    let sources = discover(files, opts, grid)?;
    if sources.is_empty() {
        tracing::info!("no datasets found, nothing to do");
        return Ok(());
    }
    for source in &sources {
        tracing::debug!(sample = %source.name, files = source.files.len(), "found");
    }

    let metadata: Arc<dyn MetadataSource> = Arc::new(catalog.unwrap_or_default());
    let evaluator = Evaluator::new(RunContext { counter, metadata, settings });
    let driver = Driver::new(evaluator, output);

    ctrlc::set_handler(|| {
        tracing::warn!("interrupted, exiting; the last checkpoint on disk is complete");
        std::process::exit(0);
    })
    .context("installing Ctrl-C handler")?;

    let (_, summary) = driver.run(sources)?;
    if summary.dropped + summary.failed > 0 {
        tracing::warn!(
            dropped = summary.dropped,
            failed = summary.failed,
            "some samples are missing from the output"
        );
    }
    Ok(())
}
