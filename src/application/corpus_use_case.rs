// ============================================================
// Layer 2 — PrepareCorpusUseCase
// ============================================================
// Makes sure train.tsv / valid.tsv / test.tsv exist in the
// data directory, fetching and partitioning the corpus the
// first time:
//
//   corpus_file set   → TsvFileSource        (Layer 4 - data)
//   otherwise         → DatasetsServerSource (Layer 6 - infra)

use anyhow::Result;

use crate::application::config::RunConfig;
use crate::data::corpus::{CorpusFiles, CorpusProvider, TsvFileSource};
use crate::domain::traits::CorpusSource;
use crate::infra::remote_corpus::DatasetsServerSource;

pub struct PrepareCorpusUseCase<'a> {
    config: &'a RunConfig,
}

impl<'a> PrepareCorpusUseCase<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self { config }
    }

    fn source(&self) -> Result<Box<dyn CorpusSource>> {
        let cfg = self.config;
        let source: Box<dyn CorpusSource> = match &cfg.corpus_file {
            Some(path) => Box::new(TsvFileSource::new(path, cfg.columns())),
            None       => Box::new(
                DatasetsServerSource::new(&cfg.dataset, cfg.columns(), cfg.max_rows)?
                    .with_split(&cfg.dataset_split),
            ),
        };
        Ok(source)
    }

    pub fn execute(&self) -> Result<CorpusFiles> {
        let cfg    = self.config;
        let source = self.source()?;
        let provider = CorpusProvider::new(
            source.as_ref(),
            cfg.columns(),
            cfg.valid_fraction,
            cfg.test_fraction,
            cfg.seed,
        );
        provider.ensure_available(&cfg.data_dir)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::split_file::write_split;
    use crate::domain::errors::PipelineError;
    use crate::domain::sentence_pair::{SentencePair, Split};

    #[test]
    fn test_local_corpus_is_partitioned_once() {
        let dir    = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.tsv");
        let pairs: Vec<SentencePair> = (0..20)
            .map(|i| SentencePair::new(format!("文{i}です"), format!("문장 {i}")))
            .collect();

        let mut cfg = RunConfig {
            corpus_file: Some(corpus.clone()),
            data_dir:    dir.path().join("data"),
            ..RunConfig::default()
        };
        write_split(&corpus, &cfg.columns(), &pairs).unwrap();

        let files = PrepareCorpusUseCase::new(&cfg).execute().unwrap();
        let total: usize = Split::ALL.iter().map(|&s| files.read(s).unwrap().len()).sum();
        assert_eq!(total, 20);

        // Second run reuses the split files even if the source is gone
        std::fs::remove_file(&corpus).unwrap();
        cfg.seed = 7;
        let again = PrepareCorpusUseCase::new(&cfg).execute().unwrap();
        assert_eq!(again.read(Split::Test).unwrap(), files.read(Split::Test).unwrap());
    }

    #[test]
    fn test_missing_local_corpus_is_retrieval_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            corpus_file: Some(dir.path().join("absent.tsv")),
            data_dir:    dir.path().join("data"),
            ..RunConfig::default()
        };

        let err = PrepareCorpusUseCase::new(&cfg).execute().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Retrieval { .. })
        ));
        assert!(!dir.path().join("data").join("train.tsv").exists());
    }
}
