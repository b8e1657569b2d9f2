// ============================================================
// Layer 5 — Evaluation Loop
// ============================================================
// Runs a model in inference mode over the ordered test split:
//
//   for each batch:
//       generate(batch, max_new_tokens, forced target tag)
//       decode predictions and label ids, specials stripped
//   after the whole split:
//       corpus BLEU / chrF / TER in one call
//
// The loop only reads from the model. The same metric step can
// score any black-box Translator over raw sentence pairs.

use anyhow::{Context, Result};

use crate::data::dataset::TranslationDataset;
use crate::data::encoder::PairEncoder;
use crate::data::supplier::BatchSupplier;
use crate::domain::errors::PipelineError;
use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::{TranslationModel, Translator};
use crate::scoring::{corpus_scores, tokenize::BleuTokenizer, MetricResult};

#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    pub batch_size:     usize,
    pub max_new_tokens: usize,
    /// Written at the first output position when set
    pub forced_bos:     Option<u32>,
    pub bleu_tokenize:  BleuTokenizer,
}

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub predictions: Vec<String>,
    /// One list per prediction; a single reference here
    pub references:  Vec<Vec<String>>,
    pub scores:      Vec<MetricResult>,
}

impl EvaluationReport {
    pub fn score(&self, name: &str) -> Option<f64> {
        self.scores.iter().find(|m| m.name == name).map(|m| m.score)
    }
}

/// Score `model` on `test`.
pub fn evaluate(
    model:   &dyn TranslationModel,
    encoder: &PairEncoder,
    test:    &TranslationDataset,
    options: &EvalOptions,
) -> Result<EvaluationReport> {
    let mut supplier = BatchSupplier::new(test, options.batch_size, false, 0);
    tracing::info!("Evaluating {} test batches", supplier.num_batches());

    let mut predictions = Vec::new();
    let mut references  = Vec::new();

    for batch in supplier.pass() {
        let generated = model
            .generate(&batch, options.max_new_tokens, options.forced_bos)
            .context("Generation failed")?;
        if generated.len() != batch.len() {
            return Err(PipelineError::Computation(format!(
                "model returned {} sequences for a batch of {}",
                generated.len(),
                batch.len()
            ))
            .into());
        }

        for (ids, example) in generated.iter().zip(&batch.examples) {
            predictions.push(encoder.decode(ids)?);
            references.push(vec![encoder.decode(&example.labels)?]);
        }
        tracing::debug!("Decoded {} predictions so far", predictions.len());
    }

    let scores = corpus_scores(&predictions, &references, options.bleu_tokenize)?;
    Ok(EvaluationReport { predictions, references, scores })
}

/// Score any translator against the raw target texts of `pairs`.
pub fn evaluate_translator(
    translator:    &dyn Translator,
    pairs:         &[SentencePair],
    source_lang:   &str,
    target_lang:   &str,
    bleu_tokenize: BleuTokenizer,
) -> Result<EvaluationReport> {
    tracing::info!("Evaluating translator '{}' on {} pairs", translator.name(), pairs.len());

    let mut predictions = Vec::with_capacity(pairs.len());
    let mut references  = Vec::with_capacity(pairs.len());

    for (row, pair) in pairs.iter().enumerate() {
        let text = translator
            .translate(&pair.source_text, source_lang, target_lang)
            .with_context(|| format!("{} failed on row {row}", translator.name()))?;
        predictions.push(text);
        references.push(vec![pair.target_text.clone()]);
    }

    let scores = corpus_scores(&predictions, &references, bleu_tokenize)?;
    Ok(EvaluationReport { predictions, references, scores })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::encoder::{LanguageTags, SpecialTokens};
    use crate::domain::errors::TranslationServiceError;
    use crate::domain::fakes::EchoModel;
    use crate::domain::sentence_pair::Split;
    use crate::infra::tokenizer_store::build_char_tokenizer;

    const SOURCES:    [&str; 3] = ["猫が好きです", "今日は寒いです", "ありがとう"];
    const REFERENCES: [&str; 3] = ["고양이를 좋아해요", "오늘은 추워요", "감사합니다"];

    fn pairs() -> Vec<SentencePair> {
        SOURCES.iter().zip(REFERENCES).map(|(s, r)| SentencePair::new(*s, r)).collect()
    }

    fn encoder() -> PairEncoder {
        let texts: Vec<String> = SOURCES.iter().chain(&REFERENCES).map(|t| t.to_string()).collect();
        let tok  = build_char_tokenizer(&texts, &["jpn_Jpan", "kor_Hang"]).unwrap();
        let tags = LanguageTags { source: Some("jpn_Jpan".into()), target: Some("kor_Hang".into()) };
        PairEncoder::new(tok, &tags, &SpecialTokens::default(), 32).unwrap()
    }

    fn options(enc: &PairEncoder) -> EvalOptions {
        EvalOptions {
            batch_size:     2,
            max_new_tokens: 32,
            forced_bos:     enc.token_ids().target_tag,
            bleu_tokenize:  BleuTokenizer::Char,
        }
    }

    #[test]
    fn test_three_row_test_split() {
        let enc   = encoder();
        let test  = TranslationDataset::encode(Split::Test, &pairs(), &enc).unwrap();
        let model = EchoModel::new(enc.token_ids().pad, enc.token_ids().eos);

        let report = evaluate(&model, &enc, &test, &options(&enc)).unwrap();

        assert_eq!(report.predictions.len(), 3);
        assert_eq!(report.references.len(), 3);
        assert!(report.references.iter().all(|r| r.len() == 1));
        assert_eq!(report.references[1], vec!["오늘은 추워요".to_string()]);
        assert_eq!(report.scores.len(), 3);

        let bleu = report.score("BLEU").unwrap();
        let chrf = report.score("chrF").unwrap();
        let ter  = report.score("TER").unwrap();
        assert!((0.0..=100.0).contains(&bleu));
        assert!((0.0..=100.0).contains(&chrf));
        assert!(ter >= 0.0);

        // The target tag was forced for generation
        assert_eq!(model.last_forced.get(), enc.token_ids().target_tag);
    }

    #[test]
    fn test_empty_test_split_is_metric_error() {
        let enc   = encoder();
        let test  = TranslationDataset::new(Split::Test, Vec::new());
        let model = EchoModel::new(0, 1);

        let err = evaluate(&model, &enc, &test, &options(&enc)).unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Metric(_))));
    }

    struct LookupTranslator;

    impl Translator for LookupTranslator {
        fn name(&self) -> &str {
            "lookup"
        }

        fn translate(&self, text: &str, source_lang: &str, target_lang: &str)
            -> std::result::Result<String, TranslationServiceError>
        {
            if (source_lang, target_lang) != ("ja", "ko") {
                return Err(TranslationServiceError::UnsupportedLanguagePair {
                    source_lang: source_lang.into(),
                    target_lang: target_lang.into(),
                });
            }
            let row = SOURCES.iter().position(|s| *s == text).unwrap_or(0);
            Ok(REFERENCES[row].to_string())
        }
    }

    #[test]
    fn test_translator_scores_against_raw_targets() {
        let report = evaluate_translator(&LookupTranslator, &pairs(), "ja", "ko", BleuTokenizer::Char).unwrap();
        assert_eq!(report.predictions, REFERENCES.map(String::from).to_vec());
        assert!((report.score("BLEU").unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_translator_failure_propagates() {
        let err = evaluate_translator(&LookupTranslator, &pairs(), "ja", "en", BleuTokenizer::Char).unwrap_err();
        assert!(err.downcast_ref::<TranslationServiceError>().is_some());
    }
}
