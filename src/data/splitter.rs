// ============================================================
// Layer 4 — Train/Valid/Test Splitter
// ============================================================
// Shuffles the fetched corpus and partitions it into three
// disjoint sets:
//   - Training set:   used to update model weights
//   - Validation set: monitored after every epoch
//   - Test set:       scored once by the evaluation loop
//
// The shuffle is seeded, so the same corpus and seed always
// produce the same partition.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// The three partitions produced by `split_corpus`
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<T> {
    pub train: Vec<T>,
    pub valid: Vec<T>,
    pub test:  Vec<T>,
}

/// Shuffle `samples` with `seed` and split into (train, valid, test).
///
/// # Arguments
/// * `samples`        - All available samples (consumed by this function)
/// * `valid_fraction` - Proportion for validation, e.g. 0.05 = 5%
/// * `test_fraction`  - Proportion for test, e.g. 0.05 = 5%
/// * `seed`           - Shuffle seed
///
/// Training receives whatever is left after validation and test.
pub fn split_corpus<T>(
    mut samples:    Vec<T>,
    valid_fraction: f64,
    test_fraction:  f64,
    seed:           u64,
) -> Partition<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total   = samples.len();
    let n_test  = ((total as f64) * test_fraction).round() as usize;
    let n_valid = ((total as f64) * valid_fraction).round() as usize;

    // Clamp to valid range to avoid panics on tiny datasets
    let n_test  = n_test.min(total);
    let n_valid = n_valid.min(total - n_test);

    // split_off(n) removes elements [n..] from the Vec and returns them
    let test  = samples.split_off(total - n_test);
    let valid = samples.split_off(samples.len() - n_valid);

    tracing::debug!(
        "Corpus split: {} train, {} valid, {} test",
        samples.len(),
        valid.len(),
        test.len(),
    );

    Partition { train: samples, valid, test }
}
