// Corpus-level Translation Edit Rate (Snover et al., 2006).
//
// TER = (word edits + block shifts) / average reference length.
//
// Edits are Levenshtein operations over lower-cased whitespace
// tokens. Before counting them, the hypothesis is repeatedly
// rewritten by the single block shift that lowers the edit
// distance the most, until no shift helps:
//
//   - a block is at most MAX_SHIFT_SIZE words long
//   - it must match the reference at its destination
//   - source and destination lie within MAX_SHIFT_DIST words
//   - the search stops after MAX_SHIFT_CANDIDATES candidates
//
// Each accepted shift costs one edit. Ties between candidate
// shifts go to the longest block, then the earliest source,
// then the earliest destination. The corpus score sums edits
// and reference lengths over all segments, on a 0–100 scale
// (values above 100 are possible).

const MAX_SHIFT_SIZE: usize = 10;
const MAX_SHIFT_DIST: usize = 50;
const MAX_SHIFT_CANDIDATES: usize = 1000;

/// One alignment step, read as rewriting the reference into the hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Match,
    Substitute,
    /// A hypothesis word with no reference counterpart
    HypOnly,
    /// A reference word missing from the hypothesis
    RefOnly,
}

/// Word-level Levenshtein distance plus the operation trace
fn edit_distance(hyp: &[&str], reference: &[&str]) -> (usize, Vec<Op>) {
    let (n, m) = (hyp.len(), reference.len());
    let mut cost = vec![vec![0usize; m + 1]; n + 1];
    let mut back = vec![vec![Op::Match; m + 1]; n + 1];

    for i in 1..=n {
        cost[i][0] = i;
        back[i][0] = Op::HypOnly;
    }
    for j in 1..=m {
        cost[0][j] = j;
        back[0][j] = Op::RefOnly;
    }

    for i in 1..=n {
        for j in 1..=m {
            let (diag_op, diag_cost) = if hyp[i - 1] == reference[j - 1] {
                (Op::Match, cost[i - 1][j - 1])
            } else {
                (Op::Substitute, cost[i - 1][j - 1] + 1)
            };
            // Preference on ties: diagonal, then dropping a hypothesis word
            let mut best = (diag_cost, diag_op);
            if cost[i - 1][j] + 1 < best.0 {
                best = (cost[i - 1][j] + 1, Op::HypOnly);
            }
            if cost[i][j - 1] + 1 < best.0 {
                best = (cost[i][j - 1] + 1, Op::RefOnly);
            }
            cost[i][j] = best.0;
            back[i][j] = best.1;
        }
    }

    let mut trace = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        let op = back[i][j];
        trace.push(op);
        match op {
            Op::Match | Op::Substitute => { i -= 1; j -= 1; }
            Op::HypOnly               => { i -= 1; }
            Op::RefOnly               => { j -= 1; }
        }
    }
    trace.reverse();
    (cost[n][m], trace)
}

struct Alignment {
    /// Reference position → hypothesis position it lines up with (-1 = before start)
    align:   Vec<i64>,
    ref_err: Vec<bool>,
    hyp_err: Vec<bool>,
}

fn alignment(trace: &[Op], ref_len: usize) -> Alignment {
    let mut pos_hyp: i64 = -1;
    let mut align   = vec![-1i64; ref_len];
    let mut ref_err = Vec::with_capacity(ref_len);
    let mut hyp_err = Vec::new();
    let mut pos_ref = 0usize;

    for &op in trace {
        match op {
            Op::Match | Op::Substitute => {
                pos_hyp += 1;
                align[pos_ref] = pos_hyp;
                let wrong = op == Op::Substitute;
                hyp_err.push(wrong);
                ref_err.push(wrong);
                pos_ref += 1;
            }
            Op::HypOnly => {
                pos_hyp += 1;
                hyp_err.push(true);
            }
            Op::RefOnly => {
                align[pos_ref] = pos_hyp;
                ref_err.push(true);
                pos_ref += 1;
            }
        }
    }
    Alignment { align, ref_err, hyp_err }
}

/// Move `words[start..start + len]` so it begins before position `target`
fn perform_shift<'a>(words: &[&'a str], start: usize, len: usize, target: usize) -> Vec<&'a str> {
    let n   = words.len();
    let end = start + len;
    let mut out = Vec::with_capacity(n);

    if target < start {
        out.extend_from_slice(&words[..target]);
        out.extend_from_slice(&words[start..end]);
        out.extend_from_slice(&words[target..start]);
        out.extend_from_slice(&words[end..]);
    } else if target > end {
        out.extend_from_slice(&words[..start]);
        out.extend_from_slice(&words[end..target]);
        out.extend_from_slice(&words[start..end]);
        out.extend_from_slice(&words[target..]);
    } else {
        let mid = (len + target).min(n);
        out.extend_from_slice(&words[..start]);
        out.extend_from_slice(&words[end.min(mid)..mid]);
        out.extend_from_slice(&words[start..end]);
        out.extend_from_slice(&words[mid..]);
    }
    out
}

/// Candidate blocks: (hyp start, ref start, length) of matching word runs
fn shifted_pairs(hyp: &[&str], reference: &[&str]) -> Vec<(usize, usize, usize)> {
    let mut pairs = Vec::new();
    for start_h in 0..hyp.len() {
        for start_r in 0..reference.len() {
            if start_h.abs_diff(start_r) > MAX_SHIFT_DIST {
                continue;
            }
            let mut len = 0;
            while len < MAX_SHIFT_SIZE
                && start_h + len < hyp.len()
                && start_r + len < reference.len()
                && hyp[start_h + len] == reference[start_r + len]
            {
                len += 1;
                pairs.push((start_h, start_r, len));
            }
        }
    }
    pairs
}

/// Ranking key of a candidate shift; larger is better
type ShiftRank = (i64, usize, i64, i64);

/// Best single shift of `hyp`: (distance reduction, shifted words)
fn best_shift<'a>(
    hyp:       &[&'a str],
    reference: &[&str],
    checked:   &mut usize,
) -> Option<(i64, Vec<&'a str>)> {
    let (pre_score, trace) = edit_distance(hyp, reference);
    let Alignment { align, ref_err, hyp_err } = alignment(&trace, reference.len());

    let mut best: Option<(ShiftRank, Vec<&'a str>)> = None;

    for (start_h, start_r, len) in shifted_pairs(hyp, reference) {
        // Only move words that are wrong, onto a spot that is wrong
        if !hyp_err[start_h..start_h + len].iter().any(|&e| e) {
            continue;
        }
        if !ref_err[start_r..start_r + len].iter().any(|&e| e) {
            continue;
        }
        let anchor = align[start_r];
        if (start_h as i64) <= anchor && anchor < (start_h + len) as i64 {
            continue;
        }

        let mut prev_idx: Option<usize> = None;
        for offset in -1i64..len as i64 {
            let pos = start_r as i64 + offset;
            let idx = if pos == -1 { 0 } else { (align[pos as usize] + 1) as usize };
            if prev_idx == Some(idx) {
                continue;
            }
            prev_idx = Some(idx);

            let shifted = perform_shift(hyp, start_h, len, idx);
            let gain    = pre_score as i64 - edit_distance(&shifted, reference).0 as i64;
            let rank: ShiftRank = (gain, len, -(start_h as i64), -(idx as i64));
            *checked += 1;

            let better = match &best {
                None => true,
                Some((r, words)) => (rank, &shifted) > (*r, words),
            };
            if better {
                best = Some((rank, shifted));
            }
        }
        if *checked >= MAX_SHIFT_CANDIDATES {
            break;
        }
    }

    best.map(|(rank, words)| (rank.0, words))
}

/// Edits needed to turn `hyp` into `reference`, shifts included
pub fn sentence_edits(hyp: &[&str], reference: &[&str]) -> usize {
    if reference.is_empty() {
        return hyp.len();
    }

    let mut words   = hyp.to_vec();
    let mut shifts  = 0usize;
    let mut checked = 0usize;

    loop {
        let Some((gain, shifted)) = best_shift(&words, reference, &mut checked) else {
            break;
        };
        if checked >= MAX_SHIFT_CANDIDATES || gain <= 0 {
            break;
        }
        shifts += 1;
        words = shifted;
    }

    shifts + edit_distance(&words, reference).0
}

/// Case-insensitive TER over aligned hypotheses and reference lists, 0–100+.
pub fn corpus_ter(hypotheses: &[String], references: &[Vec<String>]) -> f64 {
    let mut total_edits   = 0.0f64;
    let mut total_ref_len = 0.0f64;

    for (hyp, refs) in hypotheses.iter().zip(references) {
        if refs.is_empty() {
            continue;
        }
        let hyp_lower = hyp.to_lowercase();
        let hyp_words: Vec<&str> = hyp_lower.split_whitespace().collect();

        let mut best_edits: Option<usize> = None;
        let mut ref_len_sum = 0usize;
        for r in refs {
            let r_lower = r.to_lowercase();
            let r_words: Vec<&str> = r_lower.split_whitespace().collect();
            let edits = sentence_edits(&hyp_words, &r_words);
            ref_len_sum += r_words.len();
            best_edits = Some(best_edits.map_or(edits, |b| b.min(edits)));
        }

        total_edits   += best_edits.unwrap_or(0) as f64;
        total_ref_len += ref_len_sum as f64 / refs.len() as f64;
    }

    if total_ref_len > 0.0 {
        100.0 * total_edits / total_ref_len
    } else if total_edits > 0.0 {
        100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_identical_is_zero() {
        assert_eq!(corpus_ter(&s(&["it is cold today"]), &[s(&["It is cold today"])]), 0.0);
    }

    #[test]
    fn test_plain_edits() {
        // one substitution, one deletion
        assert_eq!(sentence_edits(&w("a b x"), &w("a b c d")), 2);
        assert_eq!(sentence_edits(&w(""), &w("a b c")), 3);
        assert_eq!(sentence_edits(&w("a b"), &w("")), 2);
    }

    #[test]
    fn test_block_shift_counts_as_one_edit() {
        // Moving "d e" to the front fixes everything: 1 shift
        let hyp = w("a b c d e");
        let reference = w("d e a b c");
        assert_eq!(edit_distance(&hyp, &reference).0, 4);
        assert_eq!(sentence_edits(&hyp, &reference), 1);
    }

    #[test]
    fn test_perform_shift_moves_block() {
        let words = w("a b c d e");
        assert_eq!(perform_shift(&words, 3, 2, 0), w("d e a b c"));
        assert_eq!(perform_shift(&words, 0, 2, 5), w("c d e a b"));
    }

    #[test]
    fn test_corpus_ter_uses_average_reference_length() {
        let score = corpus_ter(&s(&["a b x"]), &[s(&["a b c", "a b c d e"])]);
        // best edits = 1, average length = 4
        assert!((score - 25.0).abs() < 1e-9);
    }
}
