// ============================================================
// Layer 4 — Batch Supplier
// ============================================================
// Groups the encoded examples of ONE split into batches.
//
//   shuffle = true   (train)       → a fresh permutation per pass
//   shuffle = false  (valid/test)  → always file order
//
// Each call to `pass()` returns a lazy, finite iterator; the
// supplier can be asked for as many independent passes as the
// caller needs (one per epoch). Every batch is full except
// possibly the last.
//
// The permutations come from a seeded StdRng owned by the
// supplier, so a whole run is reproducible from its seed while
// consecutive passes still differ.

use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::encoded::{Batch, EncodedExample};

pub struct BatchSupplier<'a, D: Dataset<EncodedExample>> {
    dataset:    &'a D,
    batch_size: usize,
    shuffle:    bool,
    rng:        StdRng,
}

impl<'a, D: Dataset<EncodedExample>> BatchSupplier<'a, D> {
    /// `batch_size` must be at least 1 (checked by RunConfig::validate)
    pub fn new(dataset: &'a D, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        Self {
            dataset,
            batch_size: batch_size.max(1),
            shuffle,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Number of batches in one full pass
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Start a new full pass over the split.
    pub fn pass(&mut self) -> impl Iterator<Item = Batch> + '_ {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }

        let dataset    = &*self.dataset;
        let batch_size = self.batch_size;

        (0..order.len())
            .step_by(batch_size)
            .map(move |start| {
                let end     = (start + batch_size).min(order.len());
                let indices = order[start..end].to_vec();
                let examples = indices
                    .iter()
                    .filter_map(|&i| dataset.get(i))
                    .collect();
                Batch { indices, examples }
            })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::TranslationDataset;
    use crate::domain::sentence_pair::Split;

    fn dataset(n: usize) -> TranslationDataset {
        // Each example carries its row number so order can be checked
        let examples = (0..n as u32)
            .map(|i| EncodedExample {
                input_ids:      vec![i, 1, 0],
                attention_mask: vec![1, 1, 0],
                labels:         vec![i, 1, 0],
            })
            .collect();
        TranslationDataset::new(Split::Train, examples)
    }

    #[test]
    fn test_unshuffled_pass_reproduces_file_order() {
        let ds = dataset(10);
        let mut supplier = BatchSupplier::new(&ds, 3, false, 42);

        let batches: Vec<Batch> = supplier.pass().collect();
        let sizes: Vec<usize>   = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, [3, 3, 3, 1]);

        let rows: Vec<u32> = batches
            .iter()
            .flat_map(|b| b.examples.iter().map(|e| e.input_ids[0]))
            .collect();
        assert_eq!(rows, (0..10).collect::<Vec<u32>>());

        // A second pass is identical
        let again: Vec<usize> = supplier.pass().flat_map(|b| b.indices).collect();
        assert_eq!(again, (0..10).collect::<Vec<usize>>());
    }

    #[test]
    fn test_shuffled_passes_keep_multiset_but_change_order() {
        let ds = dataset(64);
        let mut supplier = BatchSupplier::new(&ds, 8, true, 7);

        let first: Vec<usize>  = supplier.pass().flat_map(|b| b.indices).collect();
        let second: Vec<usize> = supplier.pass().flat_map(|b| b.indices).collect();

        let mut a = first.clone();
        let mut b = second.clone();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, (0..64).collect::<Vec<_>>());
        assert_eq!(a, b);
        assert_ne!(first, second);
    }

    #[test]
    fn test_batches_hold_the_indexed_examples() {
        let ds = dataset(12);
        let mut supplier = BatchSupplier::new(&ds, 5, true, 3);

        for batch in supplier.pass() {
            for (idx, ex) in batch.indices.iter().zip(&batch.examples) {
                assert_eq!(ex.input_ids[0] as usize, *idx);
            }
        }
    }

    #[test]
    fn test_empty_split_yields_no_batches() {
        let ds = dataset(0);
        let mut supplier = BatchSupplier::new(&ds, 4, true, 1);
        assert_eq!(supplier.num_batches(), 0);
        assert_eq!(supplier.pass().count(), 0);
    }
}
