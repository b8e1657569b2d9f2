// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads and saves the tokenizer.json that travels with every
// pretrained directory and checkpoint, and builds a fresh
// character-level vocabulary for `init`.
//
// The character vocabulary is written directly as a
// HuggingFace tokenizer JSON:
//   - pre_tokenizer: Split on every character (kept isolated)
//   - model:         WordLevel over the observed characters
//   - decoder:       Fuse, so decoding concatenates characters
//                    back into the original string (spaces are
//                    tokens too, so nothing is lost)
//
// Character units suit Japanese, which has no spaces between
// words, as well as Korean.

use anyhow::Result;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokenizers::Tokenizer;

use crate::domain::errors::PipelineError;

/// Special tokens present in every generated vocabulary, in id order
pub const BASE_SPECIAL_TOKENS: [&str; 3] = ["<pad>", "</s>", "<unk>"];

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load the tokenizer stored in this directory
    pub fn load(&self) -> Result<Tokenizer> {
        load_tokenizer(&self.path())
    }

    /// Write `tokenizer` into this directory
    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        let path = self.path();
        tokenizer
            .save(&path, false)
            .map_err(|e| anyhow::anyhow!("Cannot save tokenizer to '{}': {e}", path.display()))?;
        tracing::debug!("Saved tokenizer to '{}'", path.display());
        Ok(())
    }
}

/// Load a tokenizer.json from an explicit path
pub fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    if !path.is_file() {
        return Err(PipelineError::config(format!(
            "tokenizer file '{}' does not exist",
            path.display()
        ))
        .into());
    }
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {e}", path.display()))
}

/// Build a character-level tokenizer from `texts`.
///
/// Ids 0..3 are `<pad>`, `</s>`, `<unk>`; `extra_specials` (language tags)
/// follow, then every distinct character in order of descending frequency.
pub fn build_char_tokenizer(texts: &[String], extra_specials: &[&str]) -> Result<Tokenizer> {
    // ── Step 1: Count characters ──────────────────────────────────────────────
    let mut freq: HashMap<char, usize> = HashMap::new();
    for text in texts {
        for c in text.chars() {
            *freq.entry(c).or_insert(0) += 1;
        }
    }

    // Sort by frequency, ties broken by code point so the ids are stable
    let mut chars: Vec<(char, usize)> = freq.into_iter().collect();
    chars.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    // ── Step 2: Build vocab and added_tokens ──────────────────────────────────
    let mut vocab        = serde_json::Map::new();
    let mut added_tokens = Vec::new();

    for (id, token) in BASE_SPECIAL_TOKENS.iter().chain(extra_specials).enumerate() {
        vocab.insert(token.to_string(), serde_json::json!(id));
        added_tokens.push(serde_json::json!({
            "id": id, "content": token, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        }));
    }

    let mut next_id = vocab.len();
    for (c, _) in chars {
        let key = c.to_string();
        if !vocab.contains_key(&key) {
            vocab.insert(key, serde_json::json!(next_id));
            next_id += 1;
        }
    }

    // ── Step 3: Assemble tokenizer JSON in HuggingFace format ─────────────────
    let tokenizer_json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": null,
        "pre_tokenizer": {
            "type": "Split",
            "pattern": { "Regex": "." },
            "behavior": "Isolated",
            "invert": false
        },
        "post_processor": null,
        "decoder": { "type": "Fuse" },
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "<unk>"
        }
    });

    tracing::info!("Built character vocabulary with {} entries", next_id);

    let json = serde_json::to_string(&tokenizer_json)?;
    Tokenizer::from_str(&json)
        .map_err(|e| anyhow::anyhow!("Character vocabulary is not a valid tokenizer: {e}"))
}
