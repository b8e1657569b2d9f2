// ============================================================
// Layer 5b — Corpus Metrics
// ============================================================
// Corpus-level translation quality scores, computed once over
// the complete prediction/reference collection of a split:
//
//   bleu.rs      — 4-gram BLEU with brevity penalty       0–100
//   chrf.rs      — character n-gram F-score (beta = 2)    0–100
//   ter.rs       — translation edit rate with shifts      ≥ 0
//   tokenize.rs  — BLEU segment tokenizers (13a, char, none)
//
// Each prediction is paired with one or more references.

pub mod bleu;
pub mod chrf;
pub mod ter;
pub mod tokenize;

use anyhow::Result;
use serde::Serialize;
use std::fmt;

use crate::domain::errors::PipelineError;
use crate::scoring::tokenize::BleuTokenizer;

/// A named corpus score. Reported, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub name:  String,
    pub score: f64,
}

impl MetricResult {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self { name: name.into(), score }
    }
}

impl fmt::Display for MetricResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:.2}", self.name, self.score)
    }
}

/// BLEU, chrF and TER over the whole corpus in one call.
///
/// Fails with a metric error when there is nothing to score, when the
/// prediction and reference counts differ, or when a prediction has no
/// reference.
pub fn corpus_scores(
    predictions: &[String],
    references:  &[Vec<String>],
    tokenize:    BleuTokenizer,
) -> Result<Vec<MetricResult>> {
    if predictions.is_empty() {
        return Err(PipelineError::Metric("no predictions to score".into()).into());
    }
    if predictions.len() != references.len() {
        return Err(PipelineError::Metric(format!(
            "{} predictions but {} reference lists",
            predictions.len(),
            references.len()
        ))
        .into());
    }
    if let Some(row) = references.iter().position(Vec::is_empty) {
        return Err(PipelineError::Metric(format!("prediction {row} has no reference")).into());
    }

    let bleu = bleu::corpus_bleu(predictions, references, tokenize);
    tracing::debug!(
        "BLEU precisions={:?} bp={:.3} sys_len={} ref_len={}",
        bleu.precisions, bleu.brevity, bleu.sys_len, bleu.ref_len
    );

    Ok(vec![
        MetricResult::new("BLEU", bleu.score),
        MetricResult::new("chrF", chrf::corpus_chrf(predictions, references)),
        MetricResult::new("TER", ter::corpus_ter(predictions, references)),
    ])
}
