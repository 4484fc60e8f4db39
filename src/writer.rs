// Handles writing of the four aligned output files of a split

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{ConvertError, ConvertResult};
use crate::format::RenderedRecord;
use crate::record::Split;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Src,
    Trg,
    Path,
    Leaf,
}

impl OutputKind {
    pub const ALL: [OutputKind; 4] = [
        OutputKind::Src,
        OutputKind::Trg,
        OutputKind::Path,
        OutputKind::Leaf,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Src => "src",
            OutputKind::Trg => "trg",
            OutputKind::Path => "path",
            OutputKind::Leaf => "leaf",
        }
    }

    fn field(self, record: &RenderedRecord) -> &str {
        match self {
            OutputKind::Src => &record.src,
            OutputKind::Trg => &record.trg,
            OutputKind::Path => &record.path,
            OutputKind::Leaf => &record.leaf,
        }
    }
}

/// `{output_dir}/{split}.{ext}`, the `{prefix}.{lang}` naming fairseq-preprocess expects.
pub fn output_path(output_dir: &Path, split: Split, kind: OutputKind) -> PathBuf {
    output_dir.join(format!("{}.{}", split.prefix(), kind.extension()))
}

struct OutputFile {
    kind: OutputKind,
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

/// Writes records to temporary files next to their final location.
///
/// Nothing becomes visible under the final names until [`SplitWriter::commit`]
/// succeeds. Dropping the writer without committing removes the temporary files.
pub struct SplitWriter {
    files: Vec<OutputFile>,
    records: usize,
}

impl SplitWriter {
    pub fn create(output_dir: &Path, split: Split) -> ConvertResult<Self> {
        let files = OutputKind::ALL
            .iter()
            .map(|&kind| {
                let target = output_path(output_dir, split, kind);
                let tmp = tempfile::Builder::new()
                    .prefix(&format!(".{}.{}.", split.prefix(), kind.extension()))
                    .suffix(".tmp")
                    .tempfile_in(output_dir)
                    .map_err(|err| ConvertError::write(&target, err))?;
                Ok(OutputFile {
                    kind,
                    target,
                    writer: BufWriter::new(tmp),
                })
            })
            .collect::<ConvertResult<Vec<_>>>()?;
        Ok(SplitWriter { files, records: 0 })
    }

    pub fn write(&mut self, record: &RenderedRecord) -> ConvertResult<()> {
        for file in self.files.iter_mut() {
            writeln!(file.writer, "{}", file.kind.field(record))
                .map_err(|err| ConvertError::write(&file.target, err))?;
        }
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Flushes every file and moves it to its final name.
    pub fn commit(self) -> ConvertResult<Vec<PathBuf>> {
        // flush all four before renaming any of them
        let mut staged = Vec::with_capacity(self.files.len());
        for file in self.files {
            let tmp = file
                .writer
                .into_inner()
                .map_err(|err| ConvertError::write(&file.target, err.into_error()))?;
            tmp.as_file()
                .sync_all()
                .map_err(|err| ConvertError::write(&file.target, err))?;
            staged.push((tmp, file.target));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (tmp, target) in staged {
            tmp.persist(&target)
                .map_err(|err| ConvertError::write(&target, err.error))?;
            written.push(target);
        }
        Ok(written)
    }
}
