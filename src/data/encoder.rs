// ============================================================
// Layer 4 — Pair Encoder
// ============================================================
// Wraps a pretrained tokenizers::Tokenizer and turns sentence
// pairs into fixed-length token-id sequences.
//
// Layout of an encoded sequence (NLLB convention):
//
//   source:  [src_tag] tok tok … tok </s> <pad> <pad> …
//   labels:  [tgt_tag] tok tok … tok </s> <pad> <pad> …
//
// Truncation: content tokens are cut so the language tag and
// </s> always fit inside max_length.
// Padding:    right-padded with <pad>; the attention mask is
//             0 at pad positions.
//
// Every special token id is resolved once, when the encoder is
// built. The language tags cannot be changed per call, so
// training, generation and decoding always use the same tags.

use anyhow::Result;
use tokenizers::Tokenizer;

use crate::domain::encoded::EncodedExample;
use crate::domain::errors::PipelineError;
use crate::domain::sentence_pair::SentencePair;

/// Language-tag tokens required by a multilingual model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageTags {
    /// e.g. "jpn_Jpan"; prepended to every source sequence
    pub source: Option<String>,

    /// e.g. "kor_Hang"; prepended to every label sequence and
    /// forced at the first generated position
    pub target: Option<String>,
}

/// Names of the non-language special tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialTokens {
    pub pad: String,
    pub eos: String,

    /// First decoder input token. NLLB starts decoding from </s>.
    pub decoder_start: Option<String>,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            pad:           "<pad>".to_string(),
            eos:           "</s>".to_string(),
            decoder_start: None,
        }
    }
}

/// Resolved ids of every special token the model relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenIds {
    pub pad:           u32,
    pub eos:           u32,
    pub decoder_start: u32,
    pub source_tag:    Option<u32>,
    pub target_tag:    Option<u32>,
}

/// Fixed-length encoder over a pretrained vocabulary.
#[derive(Clone)]
pub struct PairEncoder {
    tokenizer:  Tokenizer,
    ids:        TokenIds,
    max_length: usize,
}

impl PairEncoder {
    /// Build an encoder, resolving every special token up front.
    ///
    /// Fails with a configuration error when a configured token is not in
    /// the vocabulary or `max_length` cannot hold the special tokens plus
    /// at least one content token.
    pub fn new(
        tokenizer:  Tokenizer,
        tags:       &LanguageTags,
        special:    &SpecialTokens,
        max_length: usize,
    ) -> Result<Self> {
        let lookup = |token: &str, role: &str| -> Result<u32> {
            tokenizer.token_to_id(token).ok_or_else(|| {
                PipelineError::config(format!(
                    "{role} token '{token}' is not in the tokenizer vocabulary"
                ))
                .into()
            })
        };

        let pad = lookup(&special.pad, "pad")?;
        let eos = lookup(&special.eos, "end-of-sequence")?;
        let decoder_start = match &special.decoder_start {
            Some(token) => lookup(token, "decoder start")?,
            None        => eos,
        };
        let source_tag = tags.source.as_deref()
            .map(|t| lookup(t, "source language"))
            .transpose()?;
        let target_tag = tags.target.as_deref()
            .map(|t| lookup(t, "target language"))
            .transpose()?;

        let ids = TokenIds { pad, eos, decoder_start, source_tag, target_tag };

        let reserved = 1 + usize::from(source_tag.is_some()).max(usize::from(target_tag.is_some()));
        if max_length <= reserved {
            return Err(PipelineError::config(format!(
                "max_length {max_length} leaves no room for content after {reserved} special tokens"
            ))
            .into());
        }

        tracing::debug!("Encoder ready: {:?}, max_length={}", ids, max_length);
        Ok(Self { tokenizer, ids, max_length })
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn token_ids(&self) -> TokenIds {
        self.ids
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Encode source text into `(token_ids, attention_mask)`, both of
    /// length `max_length`.
    pub fn encode(&self, text: &str, max_length: usize) -> Result<(Vec<u32>, Vec<u32>)> {
        let ids  = self.tagged_sequence(text, self.ids.source_tag, max_length)?;
        let real = ids.len();
        let ids  = self.pad(ids, max_length);

        let mut mask = vec![1u32; real];
        mask.resize(max_length, 0);
        Ok((ids, mask))
    }

    /// Encode target text into label ids of length `max_length`.
    pub fn encode_labels(&self, text: &str, max_length: usize) -> Result<Vec<u32>> {
        let ids = self.tagged_sequence(text, self.ids.target_tag, max_length)?;
        Ok(self.pad(ids, max_length))
    }

    /// Encode a full pair with the configured max length
    pub fn encode_pair(&self, pair: &SentencePair) -> Result<EncodedExample> {
        let (input_ids, attention_mask) = self.encode(&pair.source_text, self.max_length)?;
        let labels = self.encode_labels(&pair.target_text, self.max_length)?;
        Ok(EncodedExample { input_ids, attention_mask, labels })
    }

    /// Encode source text only, for inference
    pub fn encode_source(&self, text: &str) -> Result<EncodedExample> {
        let (input_ids, attention_mask) = self.encode(text, self.max_length)?;
        Ok(EncodedExample { input_ids, attention_mask, labels: Vec::new() })
    }

    /// Decode ids back into text, stripping every special token
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        let text = self.tokenizer
            .decode(ids, true)
            .map_err(|e| anyhow::anyhow!("Decode error: {e}"))?;
        Ok(text.trim().to_string())
    }

    // [tag?] content… eos, truncated to fit max_length
    fn tagged_sequence(&self, text: &str, tag: Option<u32>, max_length: usize) -> Result<Vec<u32>> {
        let encoding = self.tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        let reserved = 1 + usize::from(tag.is_some());
        let budget   = max_length.saturating_sub(reserved);

        let mut ids = Vec::with_capacity(max_length);
        ids.extend(tag);
        ids.extend(encoding.get_ids().iter().copied().take(budget));
        ids.push(self.ids.eos);
        ids.truncate(max_length);
        Ok(ids)
    }

    fn pad(&self, mut ids: Vec<u32>, max_length: usize) -> Vec<u32> {
        ids.resize(max_length, self.ids.pad);
        ids
    }
}
