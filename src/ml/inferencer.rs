// ============================================================
// Layer 5 — Model Translator
// ============================================================
// Puts a fine-tuned checkpoint behind the same Translator
// interface as the remote services, so a single sentence can be
// translated with the model, DeepL or GPT alike.
//
// The model only knows the language pair it was tuned for;
// any other pair is rejected before generation.

use anyhow::Result;

use crate::data::encoder::PairEncoder;
use crate::domain::encoded::Batch;
use crate::domain::errors::TranslationServiceError;
use crate::domain::traits::{TranslationModel, Translator};

/// The pair a checkpoint translates, by short code and model tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub source:     String,
    pub target:     String,
    pub source_tag: Option<String>,
    pub target_tag: Option<String>,
}

impl LanguagePair {
    /// Accepts either the short code ("ja") or the model tag ("jpn_Jpan")
    fn accepts(&self, source_lang: &str, target_lang: &str) -> bool {
        let matches = |lang: &str, code: &str, tag: Option<&str>| {
            lang.eq_ignore_ascii_case(code) || tag.is_some_and(|t| t == lang)
        };
        matches(source_lang, &self.source, self.source_tag.as_deref())
            && matches(target_lang, &self.target, self.target_tag.as_deref())
    }
}

pub struct ModelTranslator {
    model:          Box<dyn TranslationModel>,
    encoder:        PairEncoder,
    languages:      LanguagePair,
    max_new_tokens: usize,
    forced_bos:     Option<u32>,
}

impl ModelTranslator {
    pub fn new(
        model:          Box<dyn TranslationModel>,
        encoder:        PairEncoder,
        languages:      LanguagePair,
        max_new_tokens: usize,
        forced_bos:     Option<u32>,
    ) -> Self {
        Self { model, encoder, languages, max_new_tokens, forced_bos }
    }

    /// Translate several sentences in one generation call
    pub fn translate_all(&self, texts: &[String]) -> Result<Vec<String>> {
        let examples = texts
            .iter()
            .map(|t| self.encoder.encode_source(t))
            .collect::<Result<Vec<_>>>()?;
        let batch = Batch { indices: (0..examples.len()).collect(), examples };

        let generated = self.model.generate(&batch, self.max_new_tokens, self.forced_bos)?;
        generated.iter().map(|ids| self.encoder.decode(ids)).collect()
    }
}

impl Translator for ModelTranslator {
    fn name(&self) -> &str {
        "model"
    }

    fn translate(
        &self,
        text:        &str,
        source_lang: &str,
        target_lang: &str,
    ) -> std::result::Result<String, TranslationServiceError> {
        if !self.languages.accepts(source_lang, target_lang) {
            return Err(TranslationServiceError::UnsupportedLanguagePair {
                source_lang: source_lang.to_string(),
                target_lang: target_lang.to_string(),
            });
        }

        let mut out = self
            .translate_all(&[text.to_string()])
            .map_err(|e| TranslationServiceError::Model(format!("{e:#}")))?;
        tracing::debug!("'{}' → {:?}", text, out);
        out.pop()
            .ok_or_else(|| TranslationServiceError::Model("no sequence generated".into()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::encoder::{LanguageTags, SpecialTokens};
    use crate::domain::fakes::EchoModel;
    use crate::infra::tokenizer_store::build_char_tokenizer;

    fn translator() -> ModelTranslator {
        let texts = vec!["猫が好きです".to_string()];
        let tok   = build_char_tokenizer(&texts, &["jpn_Jpan", "kor_Hang"]).unwrap();
        let tags  = LanguageTags { source: Some("jpn_Jpan".into()), target: Some("kor_Hang".into()) };
        let enc   = PairEncoder::new(tok, &tags, &SpecialTokens::default(), 16).unwrap();
        let ids   = enc.token_ids();
        let model = EchoModel::new(ids.pad, ids.eos);

        let languages = LanguagePair {
            source:     "ja".into(),
            target:     "ko".into(),
            source_tag: tags.source.clone(),
            target_tag: tags.target.clone(),
        };
        ModelTranslator::new(Box::new(model), enc, languages, 16, ids.target_tag)
    }

    #[test]
    fn test_translates_configured_pair() {
        // The echo model copies the source, tag stripped on decode
        let out = translator().translate("猫が好きです", "ja", "ko").unwrap();
        assert_eq!(out, "猫が好きです");
    }

    #[test]
    fn test_accepts_model_tags() {
        assert!(translator().translate("猫", "jpn_Jpan", "kor_Hang").is_ok());
    }

    #[test]
    fn test_rejects_other_pairs() {
        let err = translator().translate("猫", "ja", "en").unwrap_err();
        assert!(matches!(err, TranslationServiceError::UnsupportedLanguagePair { .. }));
    }

    #[test]
    fn test_translate_all_keeps_order() {
        let out = translator()
            .translate_all(&["猫".to_string(), "好き".to_string()])
            .unwrap();
        assert_eq!(out, vec!["猫".to_string(), "好き".to_string()]);
    }
}
