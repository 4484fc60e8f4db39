use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{ConvertOptions, EmptyContextPolicy};
use crate::error::{ConvertError, ConvertResult};
use crate::format::{render, RenderedRecord};
use crate::record::{Record, Split};
use crate::writer::SplitWriter;

/// Chunks buffered between the reader thread and the writer.
const CHANNEL_DEPTH: usize = 2;

struct Chunk {
    /// 1-based line number of `lines[0]`
    first_line: usize,
    lines: Vec<String>,
    bytes: u64,
}

enum LineOutcome {
    Record {
        rendered: RenderedRecord,
        contexts: usize,
    },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub split: Split,
    /// Records written to each of the four files.
    pub records: usize,
    pub skipped: usize,
    /// Records without path contexts, whether kept or skipped.
    pub empty_contexts: usize,
    pub contexts: usize,
    pub max_contexts: usize,
}

impl ConversionSummary {
    fn new(split: Split) -> Self {
        ConversionSummary {
            split,
            records: 0,
            skipped: 0,
            empty_contexts: 0,
            contexts: 0,
            max_contexts: 0,
        }
    }

    fn add_record(&mut self, contexts: usize) {
        self.records += 1;
        self.contexts += contexts;
        self.max_contexts = self.max_contexts.max(contexts);
        if contexts == 0 {
            self.empty_contexts += 1;
        }
    }
}

fn convert_line(
    line: &str,
    line_number: usize,
    options: &ConvertOptions,
) -> ConvertResult<LineOutcome> {
    let record = Record::parse(line, line_number, options.layout)?;
    if record.contexts.is_empty() && options.empty_contexts == EmptyContextPolicy::Skip {
        return Ok(LineOutcome::Skipped);
    }
    Ok(LineOutcome::Record {
        contexts: record.contexts.len(),
        rendered: render(&record, options.style),
    })
}

fn read_chunks<R: BufRead>(
    mut reader: R,
    input: PathBuf,
    chunk_size: usize,
    tx: Sender<ConvertResult<Chunk>>,
) {
    let new_chunk = |first_line: usize| Chunk {
        first_line,
        lines: Vec::with_capacity(chunk_size),
        bytes: 0,
    };
    // lines read before a failure go out first so earlier bad records still win
    let fail = |chunk: Chunk, err: ConvertError| {
        if !chunk.lines.is_empty() && tx.send(Ok(chunk)).is_err() {
            return;
        }
        let _ = tx.send(Err(err));
    };

    let mut chunk = new_chunk(1);
    let mut buf = Vec::new();
    let mut line_number = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(read) => {
                line_number += 1;
                chunk.bytes += read as u64;
            }
            Err(err) => {
                let err = ConvertError::InputReadFailure {
                    path: input,
                    source: err,
                };
                return fail(chunk, err);
            }
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.to_owned(),
            Err(_) => return fail(chunk, ConvertError::malformed(line_number, "invalid UTF-8")),
        };
        chunk.lines.push(line);
        if chunk.lines.len() == chunk_size {
            let full = std::mem::replace(&mut chunk, new_chunk(line_number + 1));
            // receiver gone means the conversion already failed
            if tx.send(Ok(full)).is_err() {
                return;
            }
        }
    }
    if !chunk.lines.is_empty() {
        let _ = tx.send(Ok(chunk));
    }
}

fn write_chunks(
    rx: &Receiver<ConvertResult<Chunk>>,
    writer: &mut SplitWriter,
    split: Split,
    options: &ConvertOptions,
    pb: &ProgressBar,
) -> ConvertResult<ConversionSummary> {
    let mut summary = ConversionSummary::new(split);
    for chunk in rx.iter() {
        let chunk = chunk?;
        let outcomes: Vec<ConvertResult<LineOutcome>> = chunk
            .lines
            .par_iter()
            .enumerate()
            .map(|(offset, line)| convert_line(line, chunk.first_line + offset, options))
            .collect();
        // sequential pass keeps output order and reports the earliest bad line
        for (offset, outcome) in outcomes.into_iter().enumerate() {
            match outcome? {
                LineOutcome::Record { rendered, contexts } => {
                    writer.write(&rendered)?;
                    summary.add_record(contexts);
                }
                LineOutcome::Skipped => {
                    tracing::warn!(
                        line = chunk.first_line + offset,
                        "skipping record without path contexts"
                    );
                    summary.skipped += 1;
                    summary.empty_contexts += 1;
                }
            }
        }
        pb.inc(chunk.bytes);
    }
    Ok(summary)
}

fn progress_bar(total_bytes: u64, split: Split, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template(
        "{prefix}: [{elapsed_precise} / {eta_precise}] {bar:40.cyan/blue} {bytes:>9}/{total_bytes:9} {bytes_per_sec}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    let pb = ProgressBar::new(total_bytes);
    pb.set_style(style);
    pb.set_prefix(format!("Converting {}", split));
    pb
}

fn settle_progress<T>(pb: &ProgressBar, result: &ConvertResult<T>) {
    match result {
        Ok(_) => pb.finish_and_clear(),
        Err(_) => pb.abandon(),
    }
}

/// Converts one split into `{output_dir}/{split}.{src,trg,path,leaf}`.
///
/// The four files are only put in place once every line of `input` has been
/// converted; on error no output file is created or replaced.
pub fn convert_split(
    input: &Path,
    output_dir: &Path,
    split: Split,
    options: &ConvertOptions,
) -> ConvertResult<ConversionSummary> {
    if options.chunk_size == 0 {
        return Err(ConvertError::InvalidConfig("chunk size must be positive".into()));
    }
    let file = File::open(input).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => ConvertError::InputNotFound {
            path: input.to_path_buf(),
        },
        _ => ConvertError::InputReadFailure {
            path: input.to_path_buf(),
            source: err,
        },
    })?;
    let total_bytes = file.metadata().map(|m| m.len()).unwrap_or(0);
    fs::create_dir_all(output_dir).map_err(|err| ConvertError::write(output_dir, err))?;
    tracing::info!(
        "Converting {} split: {} -> {}",
        split,
        input.display(),
        output_dir.display()
    );

    let mut writer = SplitWriter::create(output_dir, split)?;
    let pb = progress_bar(total_bytes, split, options.show_progress);

    let (tx, rx) = bounded(CHANNEL_DEPTH);
    let chunk_size = options.chunk_size;
    let input_path = input.to_path_buf();
    let reader = thread::spawn(move || {
        read_chunks(BufReader::new(file), input_path, chunk_size, tx)
    });
    let mut result = crate::time_it!(
        format!("Time to convert {}", split),
        write_chunks(&rx, &mut writer, split, options, &pb)
    );
    drop(rx);
    if reader.join().is_err() {
        result = Err(ConvertError::InputReadFailure {
            path: input.to_path_buf(),
            source: io::Error::other("reader thread panicked"),
        });
    }
    settle_progress(&pb, &result);
    let summary = result?;

    let written = writer.records();
    writer.commit()?;
    tracing::info!(
        records = written,
        skipped = summary.skipped,
        empty_contexts = summary.empty_contexts,
        max_contexts = summary.max_contexts,
        "Finished {} split",
        split
    );
    Ok(summary)
}

/// Writes any serializable summary as pretty JSON.
pub fn write_summary<T: Serialize + ?Sized>(path: &Path, summary: &T) -> ConvertResult<()> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|err| ConvertError::write(path, err.into()))?;
    fs::write(path, json + "\n").map_err(|err| ConvertError::write(path, err))
}
