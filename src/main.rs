use anyhow::{Context, Result};
use clap::Parser;
use smata_eval::cli::Cli;
use smata_eval::params::{ExperimentConfig, ParamsTable};
use smata_eval::pipeline::{self, PipelineOptions};
use smata_eval::schema::Registry;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let params = match &cli.params {
        Some(path) => ParamsTable::from_json_file(path)
            .with_context(|| format!("failed to load parameters from {}", path.display()))?,
        None => ParamsTable::default(),
    };

    let config = ExperimentConfig {
        seed: cli.seed,
        registry: Registry::new(cli.runs),
        params,
    };

    let options = PipelineOptions {
        data_dir: cli.data_dir,
        generate_only: cli.generate_only,
        analyze_only: cli.analyze_only,
        quiet: cli.quiet,
    };

    pipeline::run(&config, &options)
}
