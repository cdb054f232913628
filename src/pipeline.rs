//! End-to-end pipeline orchestration
//!
//! Runs generation, analysis, and aggregation sequentially and writes the
//! persisted artifacts. Configuration errors abort before anything touches
//! the filesystem; generation failures are all collected first and then
//! abort before writing, so the data directory never holds a partial or
//! inconsistent artifact set. Every file is written to a temporary file in
//! its destination directory and renamed into place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tempfile::NamedTempFile;
use tracing::info;

use crate::analysis::{self, analyze_all};
use crate::csv_output;
use crate::generator::{GeneratedData, Generator};
use crate::json_output;
use crate::params::ExperimentConfig;
use crate::schema::{Metric, ALL_METRICS};
use crate::stats;

/// What to run and where to put the artifacts
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub data_dir: PathBuf,
    /// Stop after writing the raw datasets
    pub generate_only: bool,
    /// Skip generation and analyze raw CSVs already on disk
    pub analyze_only: bool,
    /// Suppress the human-readable result tables
    pub quiet: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            generate_only: false,
            analyze_only: false,
            quiet: true,
        }
    }
}

impl PipelineOptions {
    fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }
}

/// Execute the configured stages
pub fn run(config: &ExperimentConfig, options: &PipelineOptions) -> Result<()> {
    let data = if options.analyze_only {
        load_raw_datasets(config, &options.raw_dir())?
    } else {
        generate(config)?
    };

    if !options.analyze_only {
        write_raw_datasets(&data, &options.raw_dir())?;
        if options.generate_only {
            return Ok(());
        }
    }

    let summary = stats::summarize(&config.registry, &data.datasets);
    let output = analyze_all(&data.datasets);
    let coverage = data
        .dataset(Metric::CoveragePct)
        .context("coverage dataset missing")?;
    let heatmap = stats::coverage_heatmap(&config.registry, coverage);

    let processed = options.processed_dir();
    let summary_json = serde_json::to_string_pretty(&json_output::summary_statistics(&summary))
        .context("failed to serialize summary statistics")?;
    write_atomic(&processed.join("summary_statistics.json"), &summary_json)?;

    let results_json = serde_json::to_string_pretty(&json_output::statistical_results(&output))
        .context("failed to serialize statistical results")?;
    write_atomic(&processed.join("statistical_results.json"), &results_json)?;

    write_atomic(
        &processed.join("coverage_heatmap.csv"),
        &csv_output::heatmap_csv(&heatmap),
    )?;

    if !options.quiet {
        stats::print_summary(&summary);
        analysis::print_summary(&output);
    }

    Ok(())
}

/// Generate all datasets, refusing to proceed if any combination failed
fn generate(config: &ExperimentConfig) -> Result<GeneratedData> {
    let generator = Generator::new(config).context("invalid configuration")?;
    let outcome = generator.generate_all();

    if !outcome.failures.is_empty() {
        // Each failure was already logged with its full combination key
        bail!(
            "generation failed for {} combination(s); nothing written",
            outcome.failures.len()
        );
    }

    for dataset in &outcome.data.datasets {
        config
            .registry
            .validate_dataset(dataset)
            .with_context(|| format!("generated {} dataset is malformed", dataset.metric.id()))?;
    }

    Ok(outcome.data)
}

/// Read the raw CSVs of a previous generation pass back into memory
fn load_raw_datasets(config: &ExperimentConfig, raw_dir: &Path) -> Result<GeneratedData> {
    let mut datasets = Vec::with_capacity(ALL_METRICS.len());
    for metric in ALL_METRICS {
        let path = raw_dir.join(format!("{}.csv", metric.dataset_stem()));
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let dataset = csv_output::parse_metric_dataset(metric, &contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config
            .registry
            .validate_dataset(&dataset)
            .with_context(|| format!("{} does not match the registry", path.display()))?;
        datasets.push(dataset);
    }

    // Traces are only produced by a generation pass; the analysis stages
    // never consume them
    Ok(GeneratedData {
        datasets,
        traces: Vec::new(),
    })
}

/// Write the per-metric datasets and the coverage progression CSV
fn write_raw_datasets(data: &GeneratedData, raw_dir: &Path) -> Result<()> {
    for dataset in &data.datasets {
        let path = raw_dir.join(format!("{}.csv", dataset.metric.dataset_stem()));
        write_atomic(&path, &csv_output::metric_dataset_csv(dataset))?;
    }
    write_atomic(
        &raw_dir.join("coverage_over_time.csv"),
        &csv_output::coverage_traces_csv(&data.traces),
    )?;
    Ok(())
}

/// Write via a temporary file in the destination directory plus rename, so
/// readers never observe a partially written artifact
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("artifact path {} has no parent", path.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to persist {}", path.display()))?;

    info!(path = %path.display(), bytes = contents.len(), "wrote artifact");
    Ok(())
}
