// ============================================================
// Layer 2 — InitModelUseCase
// ============================================================
// Bootstraps a small pretrained directory from the corpus, for
// machines without a published checkpoint:
//
//   Step 1: Read the train split          (Layer 4 - data)
//   Step 2: Build a character vocabulary  (Layer 6 - infra)
//   Step 3: Save tokenizer.json           (Layer 6 - infra)
//   Step 4: Write model_config.json and
//           freshly initialised weights   (Layer 5 - ml)
//
// The output directory can be passed as --model to train.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::application::config::RunConfig;
use crate::application::corpus_use_case::PrepareCorpusUseCase;
use crate::domain::errors::PipelineError;
use crate::domain::sentence_pair::Split;
use crate::infra::tokenizer_store::{build_char_tokenizer, TokenizerStore};
use crate::ml::model::Seq2SeqConfig;
use crate::ml::seq2seq::write_initial_model;

/// Size of the freshly initialised transformer
#[derive(Debug, Clone, Copy)]
pub struct ModelShape {
    pub d_model:  usize,
    pub d_ff:     usize,
    pub n_heads:  usize,
    pub n_layers: usize,
    pub dropout:  f64,
}

impl Default for ModelShape {
    fn default() -> Self {
        Self { d_model: 256, d_ff: 1024, n_heads: 8, n_layers: 3, dropout: 0.1 }
    }
}

pub struct InitModelUseCase {
    config:     RunConfig,
    shape:      ModelShape,
    output_dir: PathBuf,
}

impl InitModelUseCase {
    pub fn new(config: RunConfig, shape: ModelShape, output_dir: PathBuf) -> Self {
        Self { config, shape, output_dir }
    }

    pub fn execute(&self) -> Result<PathBuf> {
        let cfg   = &self.config;
        let shape = self.shape;

        if shape.n_heads == 0 || shape.d_model % shape.n_heads != 0 {
            return Err(PipelineError::config(format!(
                "d_model {} must be a multiple of n_heads {}",
                shape.d_model, shape.n_heads
            ))
            .into());
        }

        // ── Step 1: Train split texts ─────────────────────────────────────────
        let files = PrepareCorpusUseCase::new(cfg).execute()?;
        let pairs = files.read(Split::Train)?;
        let texts: Vec<String> = pairs
            .iter()
            .flat_map(|p| [p.source_text.clone(), p.target_text.clone()])
            .collect();

        // ── Step 2: Vocabulary with the language tags as specials ─────────────
        let tags: Vec<&str> = [cfg.source_tag.as_deref(), cfg.target_tag.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        let tokenizer = build_char_tokenizer(&texts, &tags)?;

        // ── Step 3: Tokenizer ─────────────────────────────────────────────────
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Cannot create '{}'", self.output_dir.display()))?;
        TokenizerStore::new(&self.output_dir).save(&tokenizer)?;

        // ── Step 4: Architecture + weights ────────────────────────────────────
        let model_config = Seq2SeqConfig::new(
            tokenizer.get_vocab_size(true),
            shape.d_model,
            shape.d_ff,
            shape.n_heads,
            shape.n_layers,
            shape.n_layers,
            cfg.max_length.max(cfg.max_new_tokens + 1),
        )
        .with_dropout(shape.dropout);
        write_initial_model(&model_config, &self.output_dir)?;

        tracing::info!(
            "Initialised model in '{}' (vocab {}, d_model {}, {} layers)",
            self.output_dir.display(),
            model_config.vocab_size,
            shape.d_model,
            shape.n_layers
        );
        Ok(self.output_dir.clone())
    }
}
