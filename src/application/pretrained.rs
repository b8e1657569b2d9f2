// ============================================================
// Layer 2 — Opening a Pretrained Model
// ============================================================
// Shared by train, evaluate and translate:
//
//   Step 1: Load tokenizer.json             (Layer 6 - infra)
//   Step 2: Build the pair encoder          (Layer 4 - data)
//   Step 3: Rebuild the model + load weights (Layer 5 - ml)

use anyhow::{Context, Result};
use std::path::Path;

use crate::application::config::RunConfig;
use crate::data::encoder::{PairEncoder, SpecialTokens};
use crate::domain::traits::{Persistable, TranslationModel};
use crate::infra::checkpoint::{resolve_checkpoint, RUN_CONFIG_FILE};
use crate::infra::hub::PretrainedArtifacts;
use crate::infra::tokenizer_store::load_tokenizer;
use crate::ml::seq2seq::load_model;

pub struct PretrainedModel {
    pub encoder: PairEncoder,
    pub model:   Box<dyn TranslationModel>,
}

impl PretrainedModel {
    pub fn open(config: &RunConfig, artifacts: &PretrainedArtifacts) -> Result<Self> {
        let tokenizer = load_tokenizer(&artifacts.tokenizer)
            .with_context(|| format!("Cannot open the tokenizer of '{}'", artifacts.identifier))?;
        tracing::info!(
            "Tokenizer loaded: {} entries",
            tokenizer.get_vocab_size(true)
        );

        let encoder = PairEncoder::new(
            tokenizer,
            &config.language_tags(),
            &SpecialTokens::default(),
            config.max_length,
        )?;

        let model = load_model(config.device, artifacts, &encoder, config.learning_rate)
            .with_context(|| format!("Cannot load model '{}'", artifacts.identifier))?;

        Ok(Self { encoder, model })
    }
}

/// Open a fine-tuned checkpoint with the settings it was trained with.
///
/// `path` may be an epoch directory, a run directory or the checkpoint
/// root. Returns the effective config alongside the model.
pub fn open_checkpoint(config: &RunConfig, path: &Path) -> Result<(RunConfig, PretrainedModel)> {
    let epoch_dir = resolve_checkpoint(path)?;
    tracing::info!("Using checkpoint '{}'", epoch_dir.display());

    let mut effective = config.clone();
    let saved = epoch_dir.join(RUN_CONFIG_FILE);
    if saved.is_file() {
        effective.adopt_checkpoint(&RunConfig::load(&saved)?);
    }

    let artifacts = PretrainedArtifacts::from_dir(&epoch_dir)?;
    let model     = PretrainedModel::open(&effective, &artifacts)?;
    Ok((effective, model))
}
