// Flattening of parsed records into the four output lines.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::record::{PathContext, Record};

/// How token groups are laid out on `path` and `leaf` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputStyle {
    /// `up ClassDecl down  up Mth` : space inside a group, double space between groups.
    #[default]
    Spaced,
    /// `up|ClassDecl|down up|Mth` : the nested-line layout read by fairseq-preprocess.
    Nested,
}

impl OutputStyle {
    pub fn token_separator(self) -> &'static str {
        match self {
            OutputStyle::Spaced => " ",
            OutputStyle::Nested => "|",
        }
    }

    pub fn context_separator(self) -> &'static str {
        match self {
            OutputStyle::Spaced => "  ",
            OutputStyle::Nested => " ",
        }
    }
}

/// One record, ready to be appended to `{split}.{src,trg,path,leaf}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRecord {
    pub src: String,
    pub trg: String,
    pub path: String,
    pub leaf: String,
}

pub fn render(record: &Record<'_>, style: OutputStyle) -> RenderedRecord {
    let trg = record.label.join(" ");
    let src = match &record.source {
        Some(source) => source.join(" "),
        None => trg.clone(),
    };
    let path = join_groups(&record.contexts, style, |ctx| ctx.path.join(style.token_separator()));
    let leaf = join_groups(&record.contexts, style, |ctx| {
        ctx.start_leaf
            .iter()
            .chain(ctx.end_leaf.iter())
            .copied()
            .collect::<Vec<_>>()
            .join(style.token_separator())
    });
    RenderedRecord { src, trg, path, leaf }
}

fn join_groups<F>(contexts: &[PathContext<'_>], style: OutputStyle, group: F) -> String
where
    F: Fn(&PathContext<'_>) -> String,
{
    contexts
        .iter()
        .map(group)
        .collect::<Vec<_>>()
        .join(style.context_separator())
}
