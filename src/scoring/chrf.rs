// Corpus-level chrF (Popović, 2015).
//
// Character n-grams of orders 1..=6 are counted with all
// whitespace removed. Per-order hypothesis, reference and match
// counts are summed over the corpus. Precision and recall are
// each averaged over the orders that have both hypothesis and
// reference n-grams, then combined into an F-beta score with
// beta = 2 (recall weighted higher). With several references,
// the one giving the best sentence-level score is used.

use std::collections::HashMap;

pub const CHAR_ORDER: usize = 6;
pub const BETA: f64 = 2.0;

/// [hyp_count, ref_count, match_count] per order
type ChrfStats = [[usize; 3]; CHAR_ORDER];

fn char_ngrams(chars: &[char], n: usize) -> HashMap<&[char], usize> {
    let mut counts = HashMap::new();
    if chars.len() >= n {
        for window in chars.windows(n) {
            *counts.entry(window).or_insert(0) += 1;
        }
    }
    counts
}

fn strip_whitespace(text: &str) -> Vec<char> {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn segment_stats(hyp: &[char], reference: &[char]) -> ChrfStats {
    let mut stats = [[0usize; 3]; CHAR_ORDER];
    for n in 1..=CHAR_ORDER {
        let h = char_ngrams(hyp, n);
        let r = char_ngrams(reference, n);

        let matches: usize = h
            .iter()
            .map(|(gram, &c)| c.min(r.get(gram).copied().unwrap_or(0)))
            .sum();

        stats[n - 1] = [h.values().sum(), r.values().sum(), matches];
    }
    stats
}

fn f_score(stats: &ChrfStats) -> f64 {
    let mut avg_prec  = 0.0f64;
    let mut avg_rec   = 0.0f64;
    let mut effective = 0usize;

    for &[n_hyp, n_ref, n_match] in stats {
        if n_hyp > 0 && n_ref > 0 {
            avg_prec  += n_match as f64 / n_hyp as f64;
            avg_rec   += n_match as f64 / n_ref as f64;
            effective += 1;
        }
    }
    if effective == 0 {
        return 0.0;
    }
    avg_prec /= effective as f64;
    avg_rec  /= effective as f64;

    let factor = BETA * BETA;
    if avg_prec + avg_rec == 0.0 {
        0.0
    } else {
        100.0 * (1.0 + factor) * avg_prec * avg_rec / (factor * avg_prec + avg_rec)
    }
}

/// chrF over aligned hypotheses and reference lists, 0–100.
pub fn corpus_chrf(hypotheses: &[String], references: &[Vec<String>]) -> f64 {
    let mut total: ChrfStats = [[0; 3]; CHAR_ORDER];

    for (hyp, refs) in hypotheses.iter().zip(references) {
        let hyp_chars = strip_whitespace(hyp);

        let best = refs
            .iter()
            .map(|r| segment_stats(&hyp_chars, &strip_whitespace(r)))
            .max_by(|a, b| f_score(a).total_cmp(&f_score(b)));

        if let Some(best) = best {
            for (acc, seg) in total.iter_mut().zip(best) {
                for k in 0..3 {
                    acc[k] += seg[k];
                }
            }
        }
    }

    f_score(&total)
}
