//! Configuration objects handed explicitly to every conversion and pipeline run.
//!
//! The pipeline can also be described by a JSON file; fields missing from the
//! file fall back to the defaults below, and command line values win over both.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, ConvertResult};
use crate::format::OutputStyle;
use crate::preprocess::FlagDialect;
use crate::record::{RecordLayout, Split};

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_PREPROCESS_BIN: &str = "fairseq-preprocess";

/// What to do with a record that has a label but no path contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyContextPolicy {
    /// Write it with empty `path` and `leaf` lines.
    #[default]
    Keep,
    /// Leave it out of all four files and log a warning.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    pub layout: RecordLayout,
    pub style: OutputStyle,
    pub empty_contexts: EmptyContextPolicy,
    pub chunk_size: usize,
    pub show_progress: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            layout: RecordLayout::default(),
            style: OutputStyle::default(),
            empty_contexts: EmptyContextPolicy::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessOptions {
    /// Run the three binarization passes after converting.
    pub enabled: bool,
    pub program: String,
    pub workers: usize,
    pub dialect: FlagDialect,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            program: DEFAULT_PREPROCESS_BIN.into(),
            workers: 1,
            dialect: FlagDialect::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dataset_name: String,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    /// Binarized output, `{target_dir}/data-bin` when unset.
    pub dest_dir: Option<PathBuf>,
    pub parallel: bool,
    pub convert: ConvertOptions,
    pub preprocess: PreprocessOptions,
}

impl PipelineConfig {
    /// `{source_dir}/{dataset_name}.{split}.c2s`
    pub fn input_path(&self, split: Split) -> PathBuf {
        self.source_dir
            .join(format!("{}.{}.c2s", self.dataset_name, split.prefix()))
    }

    pub fn dest_dir(&self) -> PathBuf {
        self.dest_dir
            .clone()
            .unwrap_or_else(|| self.target_dir.join("data-bin"))
    }

    pub fn validate(&self) -> ConvertResult<()> {
        if self.dataset_name.is_empty() {
            return Err(ConvertError::InvalidConfig(
                "dataset name is not set (--dataset-name or DATASET_NAME)".into(),
            ));
        }
        if self.source_dir.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "source directory is not set (--source-dir or SOURCE_DIR)".into(),
            ));
        }
        if self.target_dir.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "target directory is not set (--target-dir or TARGET_DIR)".into(),
            ));
        }
        if self.convert.chunk_size == 0 {
            return Err(ConvertError::InvalidConfig("chunk size must be positive".into()));
        }
        if self.preprocess.workers == 0 {
            return Err(ConvertError::InvalidConfig("workers must be positive".into()));
        }
        Ok(())
    }
}

pub fn read_config(path: &Path) -> ConvertResult<PipelineConfig> {
    let config = std::fs::read_to_string(path).map_err(|err| ConvertError::InputReadFailure {
        path: path.to_path_buf(),
        source: err,
    })?;
    serde_json::from_str(&config)
        .map_err(|err| ConvertError::InvalidConfig(format!("{}: {}", path.display(), err)))
}
