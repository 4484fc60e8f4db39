// lib.rs
pub mod utils;
pub mod args;
pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod preprocess;
pub mod record;
pub mod writer;

pub use config::{ConvertOptions, PipelineConfig};
pub use convert::{convert_split, ConversionSummary};
pub use error::{ConvertError, ConvertResult};
pub use record::Split;
