// ============================================================
// Layer 2 — TranslateUseCase
// ============================================================
// Translates sentences with any Translator:
//
//   model   → a fine-tuned checkpoint   (Layer 5 - ml)
//   deepl   → DeepL REST API            (Layer 6 - infra)
//   openai  → OpenAI chat completions   (Layer 6 - infra)

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::application::config::RunConfig;
use crate::application::pretrained::open_checkpoint;
use crate::domain::traits::Translator;
use crate::infra::translators::{DeepLTranslator, OpenAiTranslator, DEFAULT_GPT_MODEL};
use crate::ml::inferencer::ModelTranslator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TranslatorKind {
    Model,
    Deepl,
    Openai,
}

/// Everything needed to build any of the translators
#[derive(Debug, Clone)]
pub struct TranslatorChoice {
    pub kind:       TranslatorKind,
    /// Epoch dir, run dir or checkpoint root; defaults to checkpoint_dir
    pub checkpoint: Option<PathBuf>,
    pub gpt_model:  String,
}

impl TranslatorChoice {
    pub fn new(kind: TranslatorKind) -> Self {
        Self { kind, checkpoint: None, gpt_model: DEFAULT_GPT_MODEL.to_string() }
    }

    pub fn build(&self, config: &RunConfig) -> Result<Box<dyn Translator>> {
        let translator: Box<dyn Translator> = match self.kind {
            TranslatorKind::Model => {
                let path = self.checkpoint.as_ref().unwrap_or(&config.checkpoint_dir);
                let (effective, pretrained) = open_checkpoint(config, path)?;
                let forced = effective.forced_bos(&pretrained.encoder.token_ids());
                Box::new(ModelTranslator::new(
                    pretrained.model,
                    pretrained.encoder,
                    effective.language_pair(),
                    effective.max_new_tokens,
                    forced,
                ))
            }
            TranslatorKind::Deepl  => Box::new(DeepLTranslator::from_env()?),
            TranslatorKind::Openai => Box::new(OpenAiTranslator::from_env(self.gpt_model.clone())?),
        };
        Ok(translator)
    }
}

pub struct TranslateUseCase {
    config: RunConfig,
    choice: TranslatorChoice,
}

impl TranslateUseCase {
    pub fn new(config: RunConfig, choice: TranslatorChoice) -> Self {
        Self { config, choice }
    }

    /// Translate each line from source_lang into target_lang, in order
    pub fn execute(&self, texts: &[String]) -> Result<Vec<String>> {
        let cfg        = &self.config;
        let translator = self.choice.build(cfg)?;
        tracing::info!(
            "Translating {} lines {} → {} with '{}'",
            texts.len(), cfg.source_lang, cfg.target_lang, translator.name()
        );

        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                translator
                    .translate(text, &cfg.source_lang, &cfg.target_lang)
                    .with_context(|| format!("Line {} could not be translated", i + 1))
            })
            .collect()
    }
}
