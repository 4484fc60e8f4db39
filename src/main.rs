use anyhow::{Context, Result};
use clap::Parser;

use code2seq_fairseq::{args, convert, utils, ConvertOptions};

fn main() -> Result<()> {
    utils::init_logging();
    let args = args::Cli::parse();

    let mut options = ConvertOptions::default();
    args.convert.apply(&mut options);

    let summary = convert::convert_split(&args.input_file, &args.output_dir, args.split, &options)
        .with_context(|| {
            format!(
                "failed to convert {} split from {}",
                args.split,
                args.input_file.display()
            )
        })?;

    if let Some(path) = &args.summary {
        convert::write_summary(path, &summary)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
    }
    Ok(())
}
