// Parsing of code2seq context-path lines.
//
// A line is `LABEL [SOURCE] ctx1 ctx2 ...`. Each context is either
// `start|node1|...|nodeK|end` or `start_subs,node1|...|nodeK,end_subs`.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, ConvertResult};

/// Dataset partition, also the prefix of every file written for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    #[value(aliases = ["valid", "validation"])]
    #[serde(alias = "valid", alias = "validation")]
    Val,
    Test,
}

impl Split {
    pub fn prefix(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Which fields precede the contexts on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordLayout {
    /// `LABEL ctx...`; the label feeds both `src` and `trg`.
    #[default]
    Label,
    /// `LABEL SOURCE ctx...`; `src` gets the source field.
    LabelSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathContext<'a> {
    pub start_leaf: Vec<&'a str>,
    pub path: Vec<&'a str>,
    pub end_leaf: Vec<&'a str>,
}

fn subtokens<'a>(part: &'a str, name: &str, field: &str) -> Result<Vec<&'a str>, String> {
    let tokens: Vec<&str> = part.split('|').collect();
    if tokens.iter().any(|t| t.is_empty()) {
        return Err(format!("empty subtoken in {} of `{}`", name, field));
    }
    Ok(tokens)
}

impl<'a> PathContext<'a> {
    /// Empty subtokens are rejected: a spaced `path` line would otherwise show
    /// one context as two groups.
    pub fn parse(field: &'a str) -> Result<Self, String> {
        if field.contains(',') {
            let parts: Vec<&str> = field.split(',').collect();
            if parts.len() != 3 {
                return Err(format!(
                    "expected 3 comma-separated fields in `{}`, found {}",
                    field,
                    parts.len()
                ));
            }
            return Ok(PathContext {
                start_leaf: subtokens(parts[0], "start leaf", field)?,
                path: subtokens(parts[1], "path", field)?,
                end_leaf: subtokens(parts[2], "end leaf", field)?,
            });
        }

        let pieces = subtokens(field, "context", field)?;
        if pieces.len() < 3 {
            return Err(format!(
                "expected at least 3 '|'-separated pieces in `{}`, found {}",
                field,
                pieces.len()
            ));
        }
        let last = pieces.len() - 1;
        Ok(PathContext {
            start_leaf: vec![pieces[0]],
            path: pieces[1..last].to_vec(),
            end_leaf: vec![pieces[last]],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    pub label: Vec<&'a str>,
    pub source: Option<Vec<&'a str>>,
    pub contexts: Vec<PathContext<'a>>,
}

impl<'a> Record<'a> {
    /// Parses one input line. `line_number` is 1-based and only used for errors.
    pub fn parse(line: &'a str, line_number: usize, layout: RecordLayout) -> ConvertResult<Self> {
        let line = line.trim_end();
        if line.is_empty() {
            return Err(ConvertError::malformed(line_number, "empty line, missing label"));
        }
        if line.starts_with(char::is_whitespace) {
            return Err(ConvertError::malformed(line_number, "missing label field"));
        }

        let (label, rest) = match line.find(char::is_whitespace) {
            Some(idx) => (&line[..idx], &line[idx..]),
            None => (line, ""),
        };
        if label.split('|').all(str::is_empty) {
            return Err(ConvertError::malformed(line_number, "empty label"));
        }

        let mut fields = rest.split_whitespace();
        let source = match layout {
            RecordLayout::Label => None,
            RecordLayout::LabelSource => match fields.next() {
                Some(source) => Some(source.split('|').collect()),
                None => {
                    return Err(ConvertError::malformed(line_number, "missing source field"))
                }
            },
        };

        let contexts = fields
            .enumerate()
            .map(|(idx, field)| {
                PathContext::parse(field).map_err(|reason| {
                    ConvertError::malformed(line_number, format!("context {}: {}", idx + 1, reason))
                })
            })
            .collect::<ConvertResult<Vec<_>>>()?;

        Ok(Record {
            label: label.split('|').collect(),
            source,
            contexts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_piped_context() {
        let ctx = PathContext::parse("self|up|ClassDecl|down|name").unwrap();
        assert_eq!(ctx.start_leaf, vec!["self"]);
        assert_eq!(ctx.path, vec!["up", "ClassDecl", "down"]);
        assert_eq!(ctx.end_leaf, vec!["name"]);
    }

    #[test]
    fn test_parse_comma_context() {
        let ctx = PathContext::parse("get|value,Nm0|Mth|Nm1,string|builder").unwrap();
        assert_eq!(ctx.start_leaf, vec!["get", "value"]);
        assert_eq!(ctx.path, vec!["Nm0", "Mth", "Nm1"]);
        assert_eq!(ctx.end_leaf, vec!["string", "builder"]);
    }

    #[test]
    fn test_short_context_rejected() {
        let err = PathContext::parse("a|b").unwrap_err();
        assert!(err.contains("found 2"), "{}", err);
        assert!(PathContext::parse("a,b").is_err());
        assert!(PathContext::parse("a,,b").is_err());
    }

    #[test]
    fn test_empty_subtoken_rejected() {
        let err = PathContext::parse("a|up||down|b").unwrap_err();
        assert!(err.contains("empty subtoken"), "{}", err);
        let err = PathContext::parse("get|,up|down,b").unwrap_err();
        assert!(err.contains("start leaf"), "{}", err);
        let err = PathContext::parse("a,up||down,b").unwrap_err();
        assert!(err.contains("path"), "{}", err);
        assert!(PathContext::parse("|up|b").is_err());
        assert!(PathContext::parse("a|up|").is_err());

        let err = Record::parse("run a|up||down|b c|Mth|d", 5, RecordLayout::Label).unwrap_err();
        assert!(err.to_string().starts_with("line 5: context 1:"), "{}", err);
    }

    #[test]
    fn test_parse_label_layout() {
        let record = Record::parse(
            "getValue|name a|up|ClassDecl|down|b c|up|Mth|d\r",
            1,
            RecordLayout::Label,
        )
        .unwrap();
        assert_eq!(record.label, vec!["getValue", "name"]);
        assert!(record.source.is_none());
        assert_eq!(record.contexts.len(), 2);
        assert_eq!(record.contexts[1].path, vec!["up", "Mth"]);
    }

    #[test]
    fn test_parse_label_source_layout() {
        let record = Record::parse(
            "get|name return|this|name x|up|y",
            3,
            RecordLayout::LabelSource,
        )
        .unwrap();
        assert_eq!(record.source, Some(vec!["return", "this", "name"]));
        assert_eq!(record.contexts.len(), 1);

        let err = Record::parse("get|name", 3, RecordLayout::LabelSource).unwrap_err();
        assert_eq!(err.to_string(), "line 3: missing source field");
    }

    #[test]
    fn test_label_only_line_has_no_contexts() {
        let record = Record::parse("toString", 1, RecordLayout::Label).unwrap();
        assert_eq!(record.label, vec!["toString"]);
        assert!(record.contexts.is_empty());
    }

    #[test]
    fn test_missing_label_cites_line() {
        let err = Record::parse(" a|up|b", 7, RecordLayout::Label).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::MalformedRecord { line_number: 7, .. }
        ));
        let err = Record::parse("", 8, RecordLayout::Label).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::MalformedRecord { line_number: 8, .. }
        ));
        let err = Record::parse("|| a|up|b", 9, RecordLayout::Label).unwrap_err();
        assert_eq!(err.to_string(), "line 9: empty label");
    }

    #[test]
    fn test_bad_context_names_position() {
        let err = Record::parse("run a|up|b broken", 4, RecordLayout::Label).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("line 4: context 2:"), "{}", msg);
    }

    #[test]
    fn test_split_aliases() {
        assert_eq!(Split::from_str("validation", true).unwrap(), Split::Val);
        assert_eq!(Split::from_str("valid", true).unwrap(), Split::Val);
        assert_eq!(Split::Train.to_string(), "train");
        let split: Split = serde_json::from_str("\"validation\"").unwrap();
        assert_eq!(split, Split::Val);
    }
}
