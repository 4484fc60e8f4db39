use anyhow::{Context, Result};
use clap::Parser;

use code2seq_fairseq::args::PipelineCli;
use code2seq_fairseq::config::{self, PipelineConfig};
use code2seq_fairseq::preprocess::ProcessRunner;
use code2seq_fairseq::{convert, pipeline, utils};

fn main() -> Result<()> {
    utils::init_logging();
    let cli = PipelineCli::parse();

    let mut config = match &cli.config {
        Some(path) => config::read_config(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    cli.apply(&mut config);

    let summaries = pipeline::run(&config, &ProcessRunner)
        .with_context(|| format!("pipeline failed for dataset {}", config.dataset_name))?;

    let summary_path = config.target_dir.join("summary.json");
    convert::write_summary(&summary_path, &summaries)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;
    tracing::info!("Wrote {}", summary_path.display());
    Ok(())
}
