use clap::{Args, Parser};
use std::path::PathBuf;

use crate::config::{ConvertOptions, EmptyContextPolicy, PipelineConfig};
use crate::format::OutputStyle;
use crate::preprocess::FlagDialect;
use crate::record::{RecordLayout, Split};

/// Converter options shared by both binaries. Unset flags keep the configured value.
#[derive(Args, Debug, Default)]
pub struct ConvertArgs {
    #[clap(long, value_enum, help = "Fields before the contexts: `label` or `label-source`")]
    pub layout: Option<RecordLayout>,
    #[clap(
        long,
        value_enum,
        help = "Group layout on path/leaf lines: `spaced` or `nested` (fairseq --nested-line)"
    )]
    pub style: Option<OutputStyle>,
    #[clap(long, value_enum, help = "Records without path contexts are kept (empty lines) or skipped")]
    pub empty_contexts: Option<EmptyContextPolicy>,
    #[clap(long, help = "Lines parsed per parallel batch")]
    pub chunk_size: Option<usize>,
    #[clap(long, help = "Hide the progress bar")]
    pub no_progress: bool,
}

impl ConvertArgs {
    pub fn apply(&self, options: &mut ConvertOptions) {
        if let Some(layout) = self.layout {
            options.layout = layout;
        }
        if let Some(style) = self.style {
            options.style = style;
        }
        if let Some(policy) = self.empty_contexts {
            options.empty_contexts = policy;
        }
        if let Some(chunk_size) = self.chunk_size {
            options.chunk_size = chunk_size;
        }
        if self.no_progress {
            options.show_progress = false;
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "convert",
    author,
    version,
    long_about = "Converts one split of a code2seq context-path dataset into the aligned \
    {split}.src, {split}.trg, {split}.path and {split}.leaf files read by fairseq-preprocess."
)]
pub struct Cli {
    #[clap(short, long = "input_file", alias = "input-file", help = "Context-path file of the split",
    value_hint = clap::ValueHint::FilePath)]
    pub input_file: PathBuf,
    #[clap(short, long = "output_dir", alias = "output-dir", help = "Directory receiving the four output files",
    value_hint = clap::ValueHint::DirPath)]
    pub output_dir: PathBuf,
    #[clap(short, long, value_enum, help = "Split name, also the output file prefix")]
    pub split: Split,
    #[clap(long, help = "Write the conversion summary as JSON to this path")]
    pub summary: Option<PathBuf>,
    #[clap(flatten)]
    pub convert: ConvertArgs,
}

#[derive(Parser, Debug)]
#[clap(
    name = "c2s-pipeline",
    author,
    version,
    long_about = "Converts the test, val and train splits of a code2seq dataset, then builds \
    the src/trg, path and leaf vocabularies with fairseq-preprocess."
)]
pub struct PipelineCli {
    #[clap(short, long, help = "JSON pipeline configuration; flags and environment override it",
    value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[clap(long, env = "DATASET_NAME", help = "Dataset name, inputs are {source_dir}/{name}.{split}.c2s")]
    pub dataset_name: Option<String>,
    #[clap(long, env = "SOURCE_DIR", value_hint = clap::ValueHint::DirPath)]
    pub source_dir: Option<PathBuf>,
    #[clap(long, env = "TARGET_DIR", help = "Directory receiving the converted text files",
    value_hint = clap::ValueHint::DirPath)]
    pub target_dir: Option<PathBuf>,
    #[clap(long, help = "Binarized output directory [default: {target_dir}/data-bin]",
    value_hint = clap::ValueHint::DirPath)]
    pub dest_dir: Option<PathBuf>,
    #[clap(long, help = "Workers passed to the binarization tool")]
    pub workers: Option<usize>,
    #[clap(long, help = "Binarization executable [default: fairseq-preprocess]")]
    pub preprocess_bin: Option<String>,
    #[clap(long, value_enum, help = "Flag spelling understood by the binarization tool")]
    pub flag_dialect: Option<FlagDialect>,
    #[clap(long, help = "Only convert, do not run the binarization tool")]
    pub skip_binarize: bool,
    #[clap(long, help = "Convert the three splits concurrently")]
    pub parallel: bool,
    #[clap(flatten)]
    pub convert: ConvertArgs,
}

impl PipelineCli {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(name) = &self.dataset_name {
            config.dataset_name = name.clone();
        }
        if let Some(dir) = &self.source_dir {
            config.source_dir = dir.clone();
        }
        if let Some(dir) = &self.target_dir {
            config.target_dir = dir.clone();
        }
        if let Some(dir) = &self.dest_dir {
            config.dest_dir = Some(dir.clone());
        }
        if let Some(workers) = self.workers {
            config.preprocess.workers = workers;
        }
        if let Some(program) = &self.preprocess_bin {
            config.preprocess.program = program.clone();
        }
        if let Some(dialect) = self.flag_dialect {
            config.preprocess.dialect = dialect;
        }
        if self.skip_binarize {
            config.preprocess.enabled = false;
        }
        if self.parallel {
            config.parallel = true;
        }
        self.convert.apply(&mut config.convert);
    }
}
