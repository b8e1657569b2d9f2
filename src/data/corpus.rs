// ============================================================
// Layer 4 — Corpus Provider
// ============================================================
// Makes sure the train/valid/test split files exist in the
// data directory, downloading and partitioning the corpus
// only when they don't.
//
//   ensure_available(dir)
//       │
//       ├── all three split files present? → no-op
//       │
//       ▼
//   CorpusSource::fetch()     → raw pairs (network or local file)
//       │
//       ▼
//   Preprocessor::clean()     → single-line, normalised text
//       │
//       ▼
//   split_corpus()            → seeded train / valid / test
//       │
//       ▼
//   write_split()             → "<file>.partial" then rename
//
// The existence check only passes when every split file was
// published by a rename, so an interrupted run is redone in
// full on the next call instead of reusing a truncated file.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::preprocessor::Preprocessor;
use crate::data::split_file::{self, ColumnNames};
use crate::data::splitter::split_corpus;
use crate::domain::errors::PipelineError;
use crate::domain::sentence_pair::{SentencePair, Split};
use crate::domain::traits::CorpusSource;

/// Locations of the persisted split files
#[derive(Debug, Clone)]
pub struct CorpusFiles {
    pub dir:     PathBuf,
    pub columns: ColumnNames,
}

impl CorpusFiles {
    pub fn path(&self, split: Split) -> PathBuf {
        self.dir.join(split.file_name())
    }

    /// True when every split file has been published
    pub fn all_present(&self) -> bool {
        Split::ALL.iter().all(|&s| self.path(s).is_file())
    }

    /// Load one split's pairs in file order
    pub fn read(&self, split: Split) -> Result<Vec<SentencePair>> {
        split_file::read_split(&self.path(split), &self.columns)
            .with_context(|| format!("Cannot read the {split} split"))
    }
}

/// Downloads and partitions a corpus into split files on demand.
pub struct CorpusProvider<'a> {
    source:         &'a dyn CorpusSource,
    columns:        ColumnNames,
    valid_fraction: f64,
    test_fraction:  f64,
    seed:           u64,
}

impl<'a> CorpusProvider<'a> {
    pub fn new(
        source:         &'a dyn CorpusSource,
        columns:        ColumnNames,
        valid_fraction: f64,
        test_fraction:  f64,
        seed:           u64,
    ) -> Self {
        Self { source, columns, valid_fraction, test_fraction, seed }
    }

    /// Ensure the split files exist under `dir`. Idempotent.
    pub fn ensure_available(&self, dir: &Path) -> Result<CorpusFiles> {
        let files = CorpusFiles {
            dir:     dir.to_path_buf(),
            columns: self.columns.clone(),
        };

        if files.all_present() {
            tracing::info!("Corpus already available in '{}'", dir.display());
            return Ok(files);
        }

        tracing::info!("Fetching corpus from {}", self.source.describe());
        let raw = self.source.fetch().map_err(|e| {
            // Keep typed retrieval errors as they are; wrap anything else
            match e.downcast::<PipelineError>() {
                Ok(typed) => anyhow::Error::new(typed),
                Err(other) => PipelineError::retrieval(self.source.describe(), format!("{other:#}")).into(),
            }
        })?;
        tracing::info!("Fetched {} sentence pairs", raw.len());

        let preprocessor = Preprocessor::new();
        let pairs: Vec<SentencePair> = raw
            .into_iter()
            .map(|p| SentencePair::new(
                preprocessor.clean(&p.source_text),
                preprocessor.clean(&p.target_text),
            ))
            .filter(SentencePair::is_complete)
            .collect();

        if pairs.is_empty() {
            return Err(PipelineError::retrieval(
                self.source.describe(),
                "source returned no usable sentence pairs",
            )
            .into());
        }

        let partition = split_corpus(pairs, self.valid_fraction, self.test_fraction, self.seed);

        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create data directory '{}'", dir.display()))?;

        for (split, rows) in [
            (Split::Train, &partition.train),
            (Split::Valid, &partition.valid),
            (Split::Test,  &partition.test),
        ] {
            split_file::write_split(&files.path(split), &self.columns, rows)?;
            tracing::info!("Persisted {} {} pairs", rows.len(), split);
        }

        Ok(files)
    }
}

// ─── TsvFileSource ────────────────────────────────────────────────────────────
/// A corpus stored as one tab-separated file with a header row.
pub struct TsvFileSource {
    path:    PathBuf,
    columns: ColumnNames,
}

impl TsvFileSource {
    pub fn new(path: impl Into<PathBuf>, columns: ColumnNames) -> Self {
        Self { path: path.into(), columns }
    }
}

impl CorpusSource for TsvFileSource {
    fn describe(&self) -> String {
        format!("file '{}'", self.path.display())
    }

    fn fetch(&self) -> Result<Vec<SentencePair>> {
        if !self.path.is_file() {
            return Err(PipelineError::retrieval(self.describe(), "file does not exist").into());
        }
        split_file::read_split(&self.path, &self.columns)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// In-memory source that counts how often it is fetched
    struct FixedSource {
        pairs:   Vec<SentencePair>,
        fetches: Cell<usize>,
    }

    impl FixedSource {
        fn new(n: usize) -> Self {
            let pairs = (0..n)
                .map(|i| SentencePair::new(format!("文{i}"), format!("문장 {i}")))
                .collect();
            Self { pairs, fetches: Cell::new(0) }
        }
    }

    impl CorpusSource for FixedSource {
        fn describe(&self) -> String {
            "fixed".into()
        }

        fn fetch(&self) -> Result<Vec<SentencePair>> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(self.pairs.clone())
        }
    }

    struct FailingSource;

    impl CorpusSource for FailingSource {
        fn describe(&self) -> String {
            "unreachable host".into()
        }

        fn fetch(&self) -> Result<Vec<SentencePair>> {
            anyhow::bail!("connection refused")
        }
    }

    fn provider(source: &dyn CorpusSource) -> CorpusProvider<'_> {
        CorpusProvider::new(source, ColumnNames::new("ja", "ko"), 0.1, 0.1, 42)
    }

    #[test]
    fn test_creates_all_three_disjoint_splits() {
        let dir    = tempfile::tempdir().unwrap();
        let source = FixedSource::new(40);

        let files = provider(&source).ensure_available(dir.path()).unwrap();
        assert!(files.all_present());

        let train = files.read(Split::Train).unwrap();
        let valid = files.read(Split::Valid).unwrap();
        let test  = files.read(Split::Test).unwrap();
        assert_eq!(train.len() + valid.len() + test.len(), 40);
        assert_eq!(valid.len(), 4);
        assert_eq!(test.len(), 4);
        assert!(test.iter().all(|p| !train.contains(p) && !valid.contains(p)));
    }

    #[test]
    fn test_second_call_is_a_no_op() {
        let dir    = tempfile::tempdir().unwrap();
        let source = FixedSource::new(20);
        let p      = provider(&source);

        let files  = p.ensure_available(dir.path()).unwrap();
        let before: Vec<Vec<u8>> = Split::ALL.iter()
            .map(|&s| fs::read(files.path(s)).unwrap())
            .collect();

        p.ensure_available(dir.path()).unwrap();
        let after: Vec<Vec<u8>> = Split::ALL.iter()
            .map(|&s| fs::read(files.path(s)).unwrap())
            .collect();

        assert_eq!(source.fetches.get(), 1);
        assert_eq!(before, after);
    }

    #[test]
    fn test_retrieval_failure_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");

        let err = provider(&FailingSource).ensure_available(&data_dir).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Retrieval { .. })
        ));
        for split in Split::ALL {
            assert!(!data_dir.join(split.file_name()).exists());
        }
    }

    #[test]
    fn test_incomplete_directory_is_regenerated() {
        let dir    = tempfile::tempdir().unwrap();
        let source = FixedSource::new(20);
        let p      = provider(&source);

        // A stray train file from an interrupted run is not enough
        fs::write(dir.path().join("train.tsv"), "ja\tko\n").unwrap();
        let files = p.ensure_available(dir.path()).unwrap();

        assert_eq!(source.fetches.get(), 1);
        assert_eq!(files.read(Split::Train).unwrap().len(), 16);
    }

    #[test]
    fn test_tsv_file_source_reads_by_column() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.tsv");
        fs::write(&path, "ja\tko\n猫が好きです\t고양이를 좋아해요\n").unwrap();

        let source = TsvFileSource::new(&path, ColumnNames::new("ja", "ko"));
        let pairs  = source.fetch().unwrap();
        assert_eq!(pairs, vec![SentencePair::new("猫が好きです", "고양이를 좋아해요")]);
    }
}
