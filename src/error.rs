use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::record::Split;

/// Everything that can abort a conversion or a binarization pass.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("line {line_number}: {reason}")]
    MalformedRecord { line_number: usize, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    InputReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    OutputWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} not found on PATH")]
    ToolNotFound { tool: String },

    #[error("could not start {tool} for the {pass} pass: {source}")]
    ToolLaunchFailure {
        tool: String,
        pass: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed on the {pass} pass ({status})")]
    DownstreamToolFailure {
        tool: String,
        pass: String,
        status: ExitStatus,
    },

    #[error("{split} split: {source}")]
    Split {
        split: Split,
        #[source]
        source: Box<ConvertError>,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConvertError {
    pub(crate) fn malformed(line_number: usize, reason: impl Into<String>) -> Self {
        ConvertError::MalformedRecord {
            line_number,
            reason: reason.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::OutputWriteFailure {
            path: path.into(),
            source,
        }
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_line() {
        let err = ConvertError::malformed(12, "missing label");
        assert_eq!(err.to_string(), "line 12: missing label");
    }

    #[test]
    fn test_input_not_found_message() {
        let err = ConvertError::InputNotFound {
            path: PathBuf::from("data/java-small.test.c2s"),
        };
        assert_eq!(
            err.to_string(),
            "input file not found: data/java-small.test.c2s"
        );
    }
}
