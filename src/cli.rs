//! CLI argument parsing for smata-eval

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "smata-eval")]
#[command(version)]
#[command(
    about = "Synthetic experiment data and statistical validation for the SMATA evaluation",
    long_about = None
)]
pub struct Cli {
    /// Root directory for raw and processed artifacts
    #[arg(long = "data-dir", value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Base seed folded into every per-combination seed
    #[arg(long, value_name = "SEED", default_value = "42")]
    pub seed: u64,

    /// Repetitions per (app, approach) combination
    #[arg(long, value_name = "N", default_value = "10")]
    pub runs: usize,

    /// JSON file with custom target parameters (defaults to the calibrated table)
    #[arg(long = "params", value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Stop after writing the raw datasets
    #[arg(long = "generate-only", conflicts_with = "analyze_only")]
    pub generate_only: bool,

    /// Analyze raw CSVs already present in the data directory
    #[arg(long = "analyze-only")]
    pub analyze_only: bool,

    /// Suppress the result tables on stdout
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug: bool,
}
