// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a translator on the test split:
//
//   Step 1: Validate the run config          (Layer 2)
//   Step 2: Make the split files available   (Layer 4 - data)
//   Step 3a: model → open checkpoint, encode the test split,
//            run the evaluation loop         (Layer 5 - ml)
//   Step 3b: deepl / openai → translate the raw source texts
//            and score them the same way     (Layer 6 - infra)
//   Step 4: Optionally write predictions next to references

use anyhow::Result;
use std::path::PathBuf;

use crate::application::config::RunConfig;
use crate::application::corpus_use_case::PrepareCorpusUseCase;
use crate::application::pretrained::open_checkpoint;
use crate::application::translate_use_case::{TranslatorChoice, TranslatorKind};
use crate::data::dataset::TranslationDataset;
use crate::data::split_file::{write_split, ColumnNames};
use crate::domain::sentence_pair::{SentencePair, Split};
use crate::ml::evaluator::{evaluate, evaluate_translator, EvaluationReport};

pub struct EvaluateUseCase {
    config: RunConfig,
    choice: TranslatorChoice,
    output: Option<PathBuf>,
}

impl EvaluateUseCase {
    pub fn new(config: RunConfig, kind: TranslatorKind) -> Self {
        Self { config, choice: TranslatorChoice::new(kind), output: None }
    }

    pub fn with_checkpoint(mut self, checkpoint: PathBuf) -> Self {
        self.choice.checkpoint = Some(checkpoint);
        self
    }

    pub fn with_gpt_model(mut self, model: impl Into<String>) -> Self {
        self.choice.gpt_model = model.into();
        self
    }

    /// Write a prediction/reference TSV after scoring
    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output = Some(path);
        self
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        let cfg = &self.config;
        cfg.validate()?;

        let files      = PrepareCorpusUseCase::new(cfg).execute()?;
        let test_pairs = files.read(Split::Test)?;
        tracing::info!("Test split: {} pairs", test_pairs.len());

        let report = match self.choice.kind {
            TranslatorKind::Model => {
                let path = self.choice.checkpoint.as_ref().unwrap_or(&cfg.checkpoint_dir);
                let (effective, pretrained) = open_checkpoint(cfg, path)?;
                let test = TranslationDataset::encode(Split::Test, &test_pairs, &pretrained.encoder)?;
                let options = effective.eval_options(&pretrained.encoder.token_ids());
                evaluate(pretrained.model.as_ref(), &pretrained.encoder, &test, &options)?
            }
            TranslatorKind::Deepl | TranslatorKind::Openai => {
                let translator = self.choice.build(cfg)?;
                evaluate_translator(
                    translator.as_ref(),
                    &test_pairs,
                    &cfg.source_lang,
                    &cfg.target_lang,
                    cfg.bleu_tokenize,
                )?
            }
        };

        if let Some(path) = &self.output {
            let rows: Vec<SentencePair> = report
                .predictions
                .iter()
                .zip(&report.references)
                .map(|(p, refs)| SentencePair::new(p.as_str(), refs.first().map_or("", String::as_str)))
                .collect();
            write_split(path, &ColumnNames::new("prediction", "reference"), &rows)?;
            tracing::info!("Wrote {} predictions to '{}'", rows.len(), path.display());
        }

        for metric in &report.scores {
            tracing::info!("{}", metric);
        }
        Ok(report)
    }
}
