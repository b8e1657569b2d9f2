// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The pipeline talks to its external collaborators only
// through these traits:
//
//   CorpusSource     — where the parallel corpus comes from
//                      (local TSV file, HF datasets-server, …)
//   TranslationModel — the pretrained seq2seq model: train step,
//                      validation loss, generation, persistence
//   Translator       — anything that turns text in one language
//                      into text in another (the fine-tuned
//                      model, DeepL, GPT)
//
// The fine-tuning and evaluation loops only see
// `dyn TranslationModel`, so any conforming model satisfies
// them. Tests drive the loops with a small in-memory double.

use anyhow::Result;
use std::path::Path;

use crate::domain::encoded::Batch;
use crate::domain::errors::TranslationServiceError;
use crate::domain::sentence_pair::SentencePair;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// A remote or local origin of parallel sentence pairs.
///
/// Implementations:
///   - TsvFileSource        → a delimited file on disk
///   - DatasetsServerSource → the Hugging Face datasets-server rows API
pub trait CorpusSource {
    /// Human-readable origin, used in logs and error messages
    fn describe(&self) -> String;

    /// Retrieve the full corpus. Any failure is a retrieval error.
    fn fetch(&self) -> Result<Vec<SentencePair>>;
}

// ─── TranslationModel ─────────────────────────────────────────────────────────
/// The capability set of a pretrained encoder-decoder model.
///
/// Loading is a constructor on the concrete type and is not part of the
/// object-safe surface.
pub trait TranslationModel {
    /// Forward pass, built-in loss against `batch` labels, backward pass
    /// and one optimiser step. Returns the batch loss.
    fn train_step(&mut self, batch: &Batch) -> Result<f64>;

    /// Forward pass and loss with gradients disabled and no update.
    fn validation_loss(&self, batch: &Batch) -> Result<f64>;

    /// Generate output token ids for every example in `batch`.
    ///
    /// `forced_bos` is written at the first output position when set.
    /// Generation stops at the end-of-sequence token or after
    /// `max_new_tokens` tokens.
    fn generate(
        &self,
        batch:          &Batch,
        max_new_tokens: usize,
        forced_bos:     Option<u32>,
    ) -> Result<Vec<Vec<u32>>>;

    /// Persist the model parameters and architecture config into `dir`.
    /// The tokenizer is saved alongside by the checkpoint manager.
    fn save(&self, dir: &Path) -> Result<()>;
}

// ─── Translator ───────────────────────────────────────────────────────────────
/// Any black-box translator.
///
/// Implementations:
///   - ModelTranslator  → a fine-tuned checkpoint
///   - DeepLTranslator  → DeepL REST API
///   - OpenAiTranslator → OpenAI chat completions
pub trait Translator {
    /// Short name used in reports ("model", "deepl", "openai")
    fn name(&self) -> &str;

    fn translate(
        &self,
        text:        &str,
        source_lang: &str,
        target_lang: &str,
    ) -> std::result::Result<String, TranslationServiceError>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
///
/// Implementations:
///   - RunConfig → run_config.json
pub trait Persistable {
    /// Save this component's state to the given path
    fn save(&self, path: &Path) -> Result<()>;

    /// Load a component's state from the given path.
    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;
}
