// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// Every setting of a fine-tuning or evaluation run in one
// serde struct. It is built from the CLI arguments, checked by
// `validate()` before any corpus, model or batch is touched,
// and written into every checkpoint as run_config.json so an
// evaluation later uses the same tags and lengths.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::encoder::{LanguageTags, TokenIds};
use crate::data::split_file::ColumnNames;
use crate::domain::errors::PipelineError;
use crate::domain::traits::Persistable;
use crate::infra::remote_corpus::DEFAULT_DATASET;
use crate::ml::evaluator::EvalOptions;
use crate::ml::inferencer::LanguagePair;
use crate::ml::seq2seq::ComputeDevice;
use crate::ml::trainer::TrainOptions;
use crate::scoring::tokenize::BleuTokenizer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Local pretrained directory or "org/name" on the Hub
    pub model:            String,
    pub source_lang:      String,
    pub target_lang:      String,
    pub source_tag:       Option<String>,
    pub target_tag:       Option<String>,
    /// Write the target tag at the first generated position
    pub force_target_tag: bool,

    pub learning_rate:    f64,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub max_length:       usize,
    pub max_new_tokens:   usize,
    pub seed:             u64,
    pub device:           ComputeDevice,

    pub data_dir:         PathBuf,
    pub checkpoint_dir:   PathBuf,
    pub valid_fraction:   f64,
    pub test_fraction:    f64,

    /// A local TSV corpus; when unset the dataset is downloaded
    pub corpus_file:      Option<PathBuf>,
    pub dataset:          String,
    /// datasets-server split the rows are paged from
    pub dataset_split:    String,
    pub max_rows:         usize,
    pub source_column:    String,
    pub target_column:    String,

    pub bleu_tokenize:    BleuTokenizer,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model:            "models/koja-base".to_string(),
            source_lang:      "ja".to_string(),
            target_lang:      "ko".to_string(),
            source_tag:       Some("jpn_Jpan".to_string()),
            target_tag:       Some("kor_Hang".to_string()),
            force_target_tag: true,

            learning_rate:    2e-5,
            epochs:           3,
            batch_size:       16,
            max_length:       128,
            max_new_tokens:   128,
            seed:             42,
            device:           ComputeDevice::Cpu,

            data_dir:         PathBuf::from("data"),
            checkpoint_dir:   PathBuf::from("checkpoints"),
            valid_fraction:   0.1,
            test_fraction:    0.1,

            corpus_file:      None,
            dataset:          DEFAULT_DATASET.to_string(),
            dataset_split:    "train".to_string(),
            max_rows:         10_000,
            source_column:    "ja".to_string(),
            target_column:    "ko".to_string(),

            bleu_tokenize:    BleuTokenizer::Mteval13a,
        }
    }
}

impl RunConfig {
    /// Reject inconsistent settings before any work starts
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(PipelineError::Configuration(msg).into()) };

        if self.model.trim().is_empty() {
            return fail("model must name a pretrained directory or hub id".into());
        }
        if self.source_lang.trim().is_empty() || self.target_lang.trim().is_empty() {
            return fail("source_lang and target_lang are required".into());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return fail(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if self.epochs == 0 {
            return fail("epochs must be at least 1".into());
        }
        if self.batch_size == 0 {
            return fail("batch_size must be at least 1".into());
        }
        if self.max_length < 3 {
            return fail(format!("max_length {} is too short for tag + token + eos", self.max_length));
        }
        if self.max_new_tokens == 0 {
            return fail("max_new_tokens must be at least 1".into());
        }
        for (name, v) in [("valid_fraction", self.valid_fraction), ("test_fraction", self.test_fraction)] {
            if !(0.0..1.0).contains(&v) {
                return fail(format!("{name} must be in [0, 1), got {v}"));
            }
        }
        if self.valid_fraction + self.test_fraction >= 1.0 {
            return fail("valid_fraction + test_fraction leaves no training data".into());
        }
        if self.force_target_tag && self.target_tag.is_none() {
            return fail("force_target_tag needs a target_tag".into());
        }
        if self.corpus_file.is_none() && self.max_rows == 0 {
            return fail("max_rows must be at least 1".into());
        }
        if self.corpus_file.is_none() && self.dataset_split.trim().is_empty() {
            return fail("dataset_split must name a datasets-server split".into());
        }
        if self.source_column.is_empty() || self.source_column == self.target_column {
            return fail("source_column and target_column must be distinct names".into());
        }
        Ok(())
    }

    pub fn language_tags(&self) -> LanguageTags {
        LanguageTags {
            source: self.source_tag.clone(),
            target: self.target_tag.clone(),
        }
    }

    pub fn language_pair(&self) -> LanguagePair {
        LanguagePair {
            source:     self.source_lang.clone(),
            target:     self.target_lang.clone(),
            source_tag: self.source_tag.clone(),
            target_tag: self.target_tag.clone(),
        }
    }

    pub fn columns(&self) -> ColumnNames {
        ColumnNames::new(&self.source_column, &self.target_column)
    }

    /// Token forced at the first generated position, if any
    pub fn forced_bos(&self, ids: &TokenIds) -> Option<u32> {
        if self.force_target_tag { ids.target_tag } else { None }
    }

    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            epochs:     self.epochs,
            batch_size: self.batch_size,
            seed:       self.seed,
        }
    }

    pub fn eval_options(&self, ids: &TokenIds) -> EvalOptions {
        EvalOptions {
            batch_size:     self.batch_size,
            max_new_tokens: self.max_new_tokens,
            forced_bos:     self.forced_bos(ids),
            bleu_tokenize:  self.bleu_tokenize,
        }
    }

    /// Take over the settings a checkpoint was trained with.
    ///
    /// Language tags and max_length must match training for the encoder
    /// to reproduce the sequences the model saw.
    pub fn adopt_checkpoint(&mut self, trained: &RunConfig) {
        self.source_lang = trained.source_lang.clone();
        self.target_lang = trained.target_lang.clone();
        self.source_tag  = trained.source_tag.clone();
        self.target_tag  = trained.target_tag.clone();
        self.max_length  = trained.max_length;
        self.force_target_tag = trained.force_target_tag;
    }
}

impl Persistable for RunConfig {
    fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write run config to '{}'", path.display()))
    }

    fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read run config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .map_err(|e| PipelineError::config(format!("invalid run config '{}': {e}", path.display())).into())
    }
}
