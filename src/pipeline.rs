use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::convert::{convert_split, ConversionSummary};
use crate::error::{ConvertError, ConvertResult};
use crate::preprocess::{binarize, ToolRunner};
use crate::record::Split;

/// Order in which splits are converted.
pub const SPLIT_ORDER: [Split; 3] = [Split::Test, Split::Val, Split::Train];

fn convert_one(config: &PipelineConfig, split: Split) -> ConvertResult<ConversionSummary> {
    convert_split(
        &config.input_path(split),
        &config.target_dir,
        split,
        &config.convert,
    )
    .map_err(|err| ConvertError::Split {
        split,
        source: Box::new(err),
    })
}

/// Converts every split, then runs the binarization passes if enabled.
///
/// Splits share no state, so `config.parallel` converts them concurrently.
/// A failed split stops the run before binarization.
pub fn run(config: &PipelineConfig, runner: &dyn ToolRunner) -> ConvertResult<Vec<ConversionSummary>> {
    config.validate()?;

    let results: Vec<ConvertResult<ConversionSummary>> = if config.parallel {
        SPLIT_ORDER
            .par_iter()
            .map(|&split| convert_one(config, split))
            .collect()
    } else {
        let mut results = Vec::with_capacity(SPLIT_ORDER.len());
        for split in SPLIT_ORDER {
            let result = convert_one(config, split);
            let failed = result.is_err();
            results.push(result);
            if failed {
                break;
            }
        }
        results
    };
    let summaries = results.into_iter().collect::<ConvertResult<Vec<_>>>()?;

    if config.preprocess.enabled {
        let dest_dir = config.dest_dir();
        crate::time_it!(
            "Time to binarize",
            binarize(&config.target_dir, &dest_dir, &config.preprocess, runner)
        )?;
        tracing::info!("Binarized data written to {}", dest_dir.display());
    } else {
        tracing::info!("Skipping binarization");
    }
    Ok(summaries)
}
