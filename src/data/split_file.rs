// ============================================================
// Layer 4 — Split Files (tab-separated)
// ============================================================
// Persists a list of SentencePairs as a tab-separated table:
//
//   ja<TAB>ko
//   猫が好きです<TAB>고양이를 좋아해요
//   ...
//
// The header row names the source and target columns, so a
// file can be read back by column name regardless of order.
//
// Escaping keeps the format lossless for any UTF-8 text:
//   backslash → \\    tab → \t    newline → \n    CR → \r
//
// Writes go to "<file>.partial" first and are renamed into
// place only after the last row is flushed and synced, so a
// crash never leaves a truncated file under the final name.

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::errors::PipelineError;
use crate::domain::sentence_pair::SentencePair;

/// Names of the source-language and target-language columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub source: String,
    pub target: String,
}

impl ColumnNames {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { source: source.into(), target: target.into() }
    }
}

/// Write `pairs` to `path`, publishing the file atomically.
pub fn write_split(path: &Path, columns: &ColumnNames, pairs: &[SentencePair]) -> Result<()> {
    let staging = partial_path(path);

    {
        let file = File::create(&staging)
            .with_context(|| format!("Cannot create '{}'", staging.display()))?;
        let mut w = BufWriter::new(file);

        writeln!(w, "{}\t{}", escape_field(&columns.source), escape_field(&columns.target))?;
        for pair in pairs {
            writeln!(
                w,
                "{}\t{}",
                escape_field(&pair.source_text),
                escape_field(&pair.target_text)
            )?;
        }

        let file = w.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }

    fs::rename(&staging, path).with_context(|| {
        format!("Cannot move '{}' into place at '{}'", staging.display(), path.display())
    })?;

    tracing::debug!("Wrote {} rows to '{}'", pairs.len(), path.display());
    Ok(())
}

/// Read the pairs stored in `path`, in file order.
pub fn read_split(path: &Path, columns: &ColumnNames) -> Result<Vec<SentencePair>> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open split file '{}'", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => return Ok(Vec::new()),
    };
    let header: Vec<String> = header
        .trim_start_matches('\u{FEFF}')
        .split('\t')
        .map(unescape_field)
        .collect();

    let src_idx = column_index(&header, &columns.source, path)?;
    let tgt_idx = column_index(&header, &columns.target, path)?;
    let needed  = src_idx.max(tgt_idx) + 1;

    let mut pairs = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < needed {
            anyhow::bail!(
                "Malformed row {} in '{}': expected at least {} columns, found {}",
                line_no + 2,
                path.display(),
                needed,
                fields.len()
            );
        }

        pairs.push(SentencePair::new(
            unescape_field(fields[src_idx]),
            unescape_field(fields[tgt_idx]),
        ));
    }

    Ok(pairs)
}

/// Path of the staging file used while `path` is being written
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn column_index(header: &[String], column: &str, path: &Path) -> Result<usize> {
    header.iter().position(|h| h == column).ok_or_else(|| {
        PipelineError::config(format!(
            "column '{}' not found in '{}' (header: {})",
            column,
            path.display(),
            header.join(", ")
        ))
        .into()
    })
}

// Cleaned corpus text has no tabs or line breaks; raw model output written by `evaluate --output` may.
fn escape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_field(field: &str) -> String {
    let mut out   = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t')   => out.push('\t'),
            Some('n')   => out.push('\n'),
            Some('r')   => out.push('\r'),
            Some('\\')  => out.push('\\'),
            // Unknown escape: keep it verbatim
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnNames {
        ColumnNames::new("ja", "ko")
    }

    #[test]
    fn test_round_trip_preserves_cjk_and_special_characters() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("train.tsv");
        let pairs = vec![
            SentencePair::new("猫が好きです", "고양이를 좋아해요"),
            SentencePair::new("タブ\tと改行\nと\\", "탭\t과 줄바꿈\r\n"),
            SentencePair::new("😀 emoji", "“quotes”, commas"),
        ];

        write_split(&path, &columns(), &pairs).unwrap();
        let loaded = read_split(&path, &columns()).unwrap();

        assert_eq!(loaded, pairs);
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_columns_are_found_by_name() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("swapped.tsv");
        fs::write(&path, "ko\tja\n감사합니다\tありがとう\n").unwrap();

        let loaded = read_split(&path, &columns()).unwrap();
        assert_eq!(loaded, vec![SentencePair::new("ありがとう", "감사합니다")]);
    }

    #[test]
    fn test_missing_column_is_configuration_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tsv");
        fs::write(&path, "en\tko\nhello\t안녕\n").unwrap();

        let err = read_split(&path, &columns()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_short_row_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.tsv");
        fs::write(&path, "ja\tko\nありがとう\n").unwrap();

        assert!(read_split(&path, &columns()).is_err());
    }

    #[test]
    fn test_escape_is_reversible() {
        for s in ["", "\\", "\\t", "a\tb", "line\nbreak", "\\\\n"] {
            assert_eq!(unescape_field(&escape_field(s)), s);
        }
    }
}
