// Invocation of the external binarization tool (fairseq-preprocess).
//
// Three passes run over the same train/val/test prefixes: the joined src/trg
// dictionary, then the path and leaf vocabularies as source-only corpora.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::PreprocessOptions;
use crate::error::{ConvertError, ConvertResult};
use crate::record::Split;

/// Spelling of the source-only and line-reader flags.
///
/// Two revisions of the preprocessing tool exist in the wild and disagree on
/// these names; both are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagDialect {
    /// `--source-only` and `--nested-line` for both vocabularies.
    NestedLine,
    /// `--only-source`, `--path-line` and `--leaf-line`.
    #[default]
    LeafPathLine,
}

impl FlagDialect {
    fn source_only_flag(self) -> &'static str {
        match self {
            FlagDialect::NestedLine => "--source-only",
            FlagDialect::LeafPathLine => "--only-source",
        }
    }

    fn line_flag(self, pass: Pass) -> Option<&'static str> {
        match (self, pass) {
            (_, Pass::SourceTarget) => None,
            (FlagDialect::NestedLine, _) => Some("--nested-line"),
            (FlagDialect::LeafPathLine, Pass::Path) => Some("--path-line"),
            (FlagDialect::LeafPathLine, Pass::Leaf) => Some("--leaf-line"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    SourceTarget,
    Path,
    Leaf,
}

impl Pass {
    pub const ALL: [Pass; 3] = [Pass::SourceTarget, Pass::Path, Pass::Leaf];
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pass::SourceTarget => "src/trg",
            Pass::Path => "path",
            Pass::Leaf => "leaf",
        })
    }
}

/// Arguments for one pass. `text_dir` holds the converter's `{split}.*` files.
pub fn pass_args(
    pass: Pass,
    text_dir: &Path,
    dest_dir: &Path,
    options: &PreprocessOptions,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |flag: &str, value: OsString| {
        args.push(flag.into());
        args.push(value);
    };

    match pass {
        Pass::SourceTarget => {
            push("--source-lang", "src".into());
            push("--target-lang", "trg".into());
        }
        Pass::Path => push("--source-lang", "path".into()),
        Pass::Leaf => push("--source-lang", "leaf".into()),
    }
    push("--trainpref", text_dir.join(Split::Train.prefix()).into());
    push("--validpref", text_dir.join(Split::Val.prefix()).into());
    push("--testpref", text_dir.join(Split::Test.prefix()).into());
    push("--destdir", dest_dir.into());
    push("--workers", options.workers.to_string().into());

    match pass {
        Pass::SourceTarget => args.push("--joined-dictionary".into()),
        _ => {
            args.push(options.dialect.source_only_flag().into());
            args.extend(options.dialect.line_flag(pass).map(OsString::from));
        }
    }
    args
}

/// Seam between the pipeline and the operating system's process table.
pub trait ToolRunner {
    fn resolve(&self, program: &str) -> ConvertResult<PathBuf> {
        which::which(program).map_err(|_| ConvertError::ToolNotFound {
            tool: program.to_string(),
        })
    }

    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<ExitStatus>;
}

/// Runs the tool as a child process inheriting stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<ExitStatus> {
        Command::new(program).args(args).status()
    }
}

/// Runs the three passes in order, stopping at the first failure.
pub fn binarize(
    text_dir: &Path,
    dest_dir: &Path,
    options: &PreprocessOptions,
    runner: &dyn ToolRunner,
) -> ConvertResult<()> {
    let program = runner.resolve(&options.program)?;
    std::fs::create_dir_all(dest_dir).map_err(|err| ConvertError::write(dest_dir, err))?;

    for pass in Pass::ALL {
        let args = pass_args(pass, text_dir, dest_dir, options);
        tracing::info!(pass = %pass, "running {}", program.display());
        tracing::debug!(?args, "binarization arguments");
        let status = runner
            .run(&program, &args)
            .map_err(|err| ConvertError::ToolLaunchFailure {
                tool: options.program.clone(),
                pass: pass.to_string(),
                source: err,
            })?;
        if !status.success() {
            return Err(ConvertError::DownstreamToolFailure {
                tool: options.program.clone(),
                pass: pass.to_string(),
                status,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use std::cell::RefCell;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_source_target_args() {
        let options = PreprocessOptions {
            workers: 60,
            ..Default::default()
        };
        let args = strings(&pass_args(
            Pass::SourceTarget,
            Path::new("out"),
            Path::new("out/data-bin"),
            &options,
        ));
        assert_eq!(
            args,
            vec![
                "--source-lang", "src", "--target-lang", "trg",
                "--trainpref", "out/train", "--validpref", "out/val",
                "--testpref", "out/test", "--destdir", "out/data-bin",
                "--workers", "60", "--joined-dictionary",
            ]
        );
    }

    #[test]
    fn test_dialect_flags() {
        let mut options = PreprocessOptions::default();
        let leaf = strings(&pass_args(Pass::Leaf, Path::new("o"), Path::new("d"), &options));
        assert_eq!(leaf[0], "--source-lang");
        assert_eq!(leaf[1], "leaf");
        assert!(leaf.ends_with(&["--only-source".to_string(), "--leaf-line".to_string()]));
        let path = strings(&pass_args(Pass::Path, Path::new("o"), Path::new("d"), &options));
        assert!(path.ends_with(&["--only-source".to_string(), "--path-line".to_string()]));

        options.dialect = FlagDialect::NestedLine;
        for pass in [Pass::Path, Pass::Leaf] {
            let args = strings(&pass_args(pass, Path::new("o"), Path::new("d"), &options));
            assert!(args.ends_with(&["--source-only".to_string(), "--nested-line".to_string()]));
            assert!(!args.contains(&"--target-lang".to_string()));
        }
    }

    #[cfg(unix)]
    struct FakeRunner {
        fail_on: Option<usize>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    #[cfg(unix)]
    impl ToolRunner for FakeRunner {
        fn resolve(&self, program: &str) -> ConvertResult<PathBuf> {
            Ok(PathBuf::from(program))
        }

        fn run(&self, _program: &Path, args: &[OsString]) -> io::Result<ExitStatus> {
            use std::os::unix::process::ExitStatusExt;
            let mut calls = self.calls.borrow_mut();
            calls.push(strings(args));
            let code = if self.fail_on == Some(calls.len()) { 1 << 8 } else { 0 };
            Ok(ExitStatus::from_raw(code))
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_binarize_runs_three_passes() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner { fail_on: None, calls: RefCell::new(Vec::new()) };
        binarize(dir.path(), &dir.path().join("bin"), &PreprocessOptions::default(), &runner)
            .unwrap();
        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1][1], "path");
        assert_eq!(calls[2][1], "leaf");
        assert!(dir.path().join("bin").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_binarize_stops_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner { fail_on: Some(2), calls: RefCell::new(Vec::new()) };
        let err = binarize(dir.path(), dir.path(), &PreprocessOptions::default(), &runner)
            .unwrap_err();
        assert_eq!(runner.calls.borrow().len(), 2);
        match err {
            ConvertError::DownstreamToolFailure { pass, status, .. } => {
                assert_eq!(pass, "path");
                assert_eq!(status.code(), Some(1));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    struct UnstartableRunner;

    impl ToolRunner for UnstartableRunner {
        fn resolve(&self, program: &str) -> ConvertResult<PathBuf> {
            Ok(PathBuf::from(program))
        }

        fn run(&self, _program: &Path, _args: &[OsString]) -> io::Result<ExitStatus> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "exec format error"))
        }
    }

    #[test]
    fn test_launch_failure_keeps_cause() {
        use std::error::Error;

        let dir = tempfile::tempdir().unwrap();
        let err = binarize(
            dir.path(),
            dir.path(),
            &PreprocessOptions::default(),
            &UnstartableRunner,
        )
        .unwrap_err();
        match &err {
            ConvertError::ToolLaunchFailure { pass, source, .. } => {
                assert_eq!(pass, "src/trg");
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {}", other),
        }
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "exec format error");
    }

    #[test]
    fn test_missing_tool() {
        let err = ProcessRunner
            .resolve("definitely-not-a-real-preprocess-binary")
            .unwrap_err();
        assert!(matches!(err, ConvertError::ToolNotFound { .. }));
    }
}
