use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gw_core::MetadataSource;
use gw_pipeline::discovery::read_list;
use gw_pipeline::evaluator::{DEFAULT_PROJECT, DEFAULT_WORKERS};
use gw_pipeline::{Evaluator, LocalCatalog, OutputFile, RunContext, counts};

use crate::CountingArgs;

pub(crate) fn cmd_sum(
    dids: &[String],
    did_list: Option<&PathBuf>,
    template: &str,
    counting: &CountingArgs,
) -> Result<()> {
    if !template.contains("{did}") {
        bail!("--template must contain a {{did}} placeholder");
    }

    let mut all: Vec<String> = dids.to_vec();
    if let Some(path) = did_list {
        for line in read_list(path)? {
            if let Some(did) = line.split_whitespace().next() {
                all.push(did.to_string());
            }
        }
    }
    if all.is_empty() {
        bail!("no dataset ids given (use --did or --did-list)");
    }

    let metadata: Arc<dyn MetadataSource> = Arc::new(LocalCatalog::default());
    let settings = counting.settings(DEFAULT_WORKERS, DEFAULT_PROJECT.to_string());
    let evaluator = Evaluator::new(RunContext { counter: counting.counter()?, metadata, settings });

    for did in &all {
        let pattern = template.replace("{did}", did);
        let files = glob::glob(&pattern)
            .with_context(|| format!("bad template pattern '{pattern}'"))?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .collect::<Vec<_>>();
        tracing::debug!(did = %did, files = files.len(), "summing");
        let (sum, errors) = evaluator.count_files(&files);
        if !errors.is_empty() {
            tracing::warn!(did = %did, failed = errors.len(), "some files could not be counted");
        }
        println!("{did}\t{sum}");
    }
    Ok(())
}

pub(crate) fn cmd_update_counts(
    weights: &Path,
    counts_path: &Path,
    output: Option<&PathBuf>,
) -> Result<()> {
    let input = OutputFile::new(weights);
    let mut table =
        input.read().with_context(|| format!("reading weights {}", weights.display()))?;
    let listed = counts::read_counts(counts_path)
        .with_context(|| format!("reading counts {}", counts_path.display()))?;

    let missing = counts::apply_counts(&mut table, &listed);
    let target = match output {
        Some(path) => path.clone(),
        None => default_output(weights)?,
    };
    OutputFile::new(&target).write(&table)?;
    tracing::info!(
        records = table.len(),
        missing = missing.len(),
        output = %target.display(),
        "counts updated"
    );
    Ok(())
}

/// `dir/weights.json` -> `dir/new_weights.json`
fn default_output(weights: &Path) -> Result<PathBuf> {
    let Some(name) = weights.file_name() else {
        bail!("cannot derive an output name from {}", weights.display());
    };
    Ok(weights.with_file_name(format!("new_{}", name.to_string_lossy())))
}
