// Corpus-level BLEU (Papineni et al., 2002).
//
// N-gram matches and lengths are summed over the whole corpus
// before any ratio is taken, so the result is not an average of
// sentence scores. Conventions:
//
//   - max order 4, uniform weights
//   - clipped counts against the max count over all references
//   - brevity penalty against the closest reference length
//     (ties go to the shorter reference)
//   - "exp" smoothing: an order with zero matches counts as
//     1 / (2^k · total), k = number of such orders so far
//
// Scores are on a 0–100 scale.

use std::collections::HashMap;

use crate::scoring::tokenize::BleuTokenizer;

pub const MAX_ORDER: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct BleuScore {
    pub score:      f64,
    /// Per-order precision, 0–100
    pub precisions: [f64; MAX_ORDER],
    pub brevity:    f64,
    pub sys_len:    usize,
    pub ref_len:    usize,
}

/// Running sufficient statistics over a corpus
#[derive(Debug, Default, Clone)]
struct BleuStats {
    correct: [usize; MAX_ORDER],
    total:   [usize; MAX_ORDER],
    sys_len: usize,
    ref_len: usize,
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for window in tokens.windows(n) {
            *counts.entry(window).or_insert(0) += 1;
        }
    }
    counts
}

fn closest_ref_len(hyp_len: usize, ref_lens: &[usize]) -> usize {
    ref_lens
        .iter()
        .copied()
        .min_by_key(|&len| (len.abs_diff(hyp_len), len))
        .unwrap_or(0)
}

impl BleuStats {
    fn add_segment(&mut self, hyp: &[String], refs: &[Vec<String>]) {
        let ref_lens: Vec<usize> = refs.iter().map(Vec::len).collect();
        self.sys_len += hyp.len();
        self.ref_len += closest_ref_len(hyp.len(), &ref_lens);

        for n in 1..=MAX_ORDER {
            let hyp_counts = ngram_counts(hyp, n);

            // Highest count of every n-gram across the references
            let mut max_ref: HashMap<&[String], usize> = HashMap::new();
            for r in refs {
                for (gram, count) in ngram_counts(r, n) {
                    let slot = max_ref.entry(gram).or_insert(0);
                    *slot = (*slot).max(count);
                }
            }

            let clipped: usize = hyp_counts
                .iter()
                .map(|(gram, &c)| c.min(max_ref.get(gram).copied().unwrap_or(0)))
                .sum();

            self.correct[n - 1] += clipped;
            self.total[n - 1]   += hyp.len().saturating_sub(n - 1);
        }
    }

    fn score(&self) -> BleuScore {
        let mut precisions = [0.0f64; MAX_ORDER];
        let mut smooth     = 1.0f64;

        for n in 0..MAX_ORDER {
            if self.total[n] == 0 {
                break;
            }
            if self.correct[n] == 0 {
                smooth *= 2.0;
                precisions[n] = 100.0 / (smooth * self.total[n] as f64);
            } else {
                precisions[n] = 100.0 * self.correct[n] as f64 / self.total[n] as f64;
            }
        }

        let brevity = if self.sys_len == 0 {
            0.0
        } else if self.sys_len < self.ref_len {
            (1.0 - self.ref_len as f64 / self.sys_len as f64).exp()
        } else {
            1.0
        };

        let score = if precisions.iter().any(|&p| p <= 0.0) {
            0.0
        } else {
            let mean_log = precisions.iter().map(|p| p.ln()).sum::<f64>() / MAX_ORDER as f64;
            brevity * mean_log.exp()
        };

        BleuScore {
            score,
            precisions,
            brevity,
            sys_len: self.sys_len,
            ref_len: self.ref_len,
        }
    }
}

/// BLEU over aligned hypotheses and reference lists.
///
/// Callers guarantee equal, non-zero lengths (see `corpus_scores`).
pub fn corpus_bleu(hypotheses: &[String], references: &[Vec<String>], tokenizer: BleuTokenizer) -> BleuScore {
    let mut stats = BleuStats::default();
    for (hyp, refs) in hypotheses.iter().zip(references) {
        let hyp_tokens = tokenizer.tokenize(hyp);
        let ref_tokens: Vec<Vec<String>> = refs.iter().map(|r| tokenizer.tokenize(r)).collect();
        stats.add_segment(&hyp_tokens, &ref_tokens);
    }
    stats.score()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_identical_corpus_scores_100() {
        let hyps = s(&["the cat sat on the mat", "it is cold today"]);
        let refs = vec![s(&["the cat sat on the mat"]), s(&["it is cold today"])];
        let bleu = corpus_bleu(&hyps, &refs, BleuTokenizer::Mteval13a);
        assert!((bleu.score - 100.0).abs() < 1e-9);
        assert_eq!(bleu.brevity, 1.0);
    }

    #[test]
    fn test_disjoint_corpus_is_smoothed_not_zero() {
        let hyps = s(&["a b c d e"]);
        let refs = vec![s(&["v w x y z"])];
        let bleu = corpus_bleu(&hyps, &refs, BleuTokenizer::Whitespace);
        // 100 / (2 · 5) for unigrams, halving again for every further order
        assert!((bleu.precisions[0] - 10.0).abs() < 1e-9);
        assert!((bleu.precisions[3] - 3.125).abs() < 1e-9);
        assert!(bleu.score > 0.0 && bleu.score < 10.0);
    }

    #[test]
    fn test_short_hypothesis_is_penalised() {
        let hyps = s(&["the cat"]);
        let refs = vec![s(&["the cat sat on the mat"])];
        let bleu = corpus_bleu(&hyps, &refs, BleuTokenizer::Whitespace);
        assert!(bleu.brevity < 1.0);
        assert_eq!(bleu.sys_len, 2);
        assert_eq!(bleu.ref_len, 6);
    }

    #[test]
    fn test_closest_reference_length_prefers_shorter_on_tie() {
        assert_eq!(closest_ref_len(5, &[3, 7]), 3);
        assert_eq!(closest_ref_len(5, &[9, 6, 4]), 4);
    }

    #[test]
    fn test_clipping_uses_best_reference() {
        let hyps = s(&["the the the the"]);
        let refs = vec![s(&["the cat", "the the dog"])];
        let bleu = corpus_bleu(&hyps, &refs, BleuTokenizer::Whitespace);
        // 2 of 4 unigrams survive clipping
        assert!((bleu.precisions[0] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_char_tokenizer_scores_korean_partial_match() {
        let hyps = s(&["고양이를 좋아해요"]);
        let refs = vec![s(&["고양이가 좋아요"])];
        let bleu = corpus_bleu(&hyps, &refs, BleuTokenizer::Char);
        assert!(bleu.score > 0.0 && bleu.score < 100.0);
    }
}
