// ============================================================
// Layer 4 — Translation Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<EncodedExample>
// into backend tensors for the seq2seq model.
//
//   Input:  N EncodedExamples, every sequence of length S
//   Output: TranslationBatch with tensors of shape [N, S]
//
// Teacher forcing needs the decoder to see the labels shifted
// one position to the right, led by the decoder start token:
//
//   labels:             [kor_Hang] 고 양 이 </s> <pad>
//   decoder_input_ids:  </s> [kor_Hang] 고 양 이 </s>
//
// The shift is done on the host before the tensors are built,
// so the same batcher works on both the autodiff backend
// (training) and the inner backend (validation, generation).

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::encoder::TokenIds;
use crate::domain::encoded::{Batch, EncodedExample};

// ─── TranslationBatch ─────────────────────────────────────────────────────────
/// A batch of encoded pairs ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    /// Source token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Supervision targets — shape: [batch_size, seq_len]
    pub labels: Tensor<B, 2, Int>,

    /// Labels shifted right by one — shape: [batch_size, seq_len]
    pub decoder_input_ids: Tensor<B, 2, Int>,
}

// ─── TranslationBatcher ───────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct TranslationBatcher<B: Backend> {
    device:        B::Device,
    pad:           u32,
    decoder_start: u32,
}

impl<B: Backend> TranslationBatcher<B> {
    pub fn new(device: B::Device, ids: TokenIds) -> Self {
        Self {
            device,
            pad:           ids.pad,
            decoder_start: ids.decoder_start,
        }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Stack a supplier batch
    pub fn from_batch(&self, batch: &Batch) -> TranslationBatch<B> {
        self.batch(batch.examples.clone())
    }

    /// Source ids and attention mask only, for generation
    pub fn source_tensors(&self, examples: &[EncodedExample]) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
        let rows    = examples.len();
        let seq_len = examples.first().map_or(0, |e| e.input_ids.len());

        let input_ids = self.stack(examples.iter().map(|e| e.input_ids.as_slice()), rows, seq_len);
        let attention_mask =
            self.stack(examples.iter().map(|e| e.attention_mask.as_slice()), rows, seq_len);
        (input_ids, attention_mask)
    }

    /// Build a [rows, seq_len] Int tensor from equally long rows of ids
    pub fn stack<'a>(
        &self,
        rows_iter: impl Iterator<Item = &'a [u32]>,
        rows:      usize,
        seq_len:   usize,
    ) -> Tensor<B, 2, Int> {
        let flat: Vec<i32> = rows_iter
            .flat_map(|row| row.iter().map(|&x| x as i32))
            .collect();

        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([rows, seq_len])
    }
}

/// `[start, l0, l1, …, l(n-2)]` for labels `[l0, …, l(n-1)]`
pub fn shift_right(labels: &[u32], decoder_start: u32) -> Vec<u32> {
    let mut shifted = Vec::with_capacity(labels.len());
    if labels.is_empty() {
        return shifted;
    }
    shifted.push(decoder_start);
    shifted.extend_from_slice(&labels[..labels.len() - 1]);
    shifted
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<EncodedExample, TranslationBatch<B>> for TranslationBatcher<B> {
    fn batch(&self, items: Vec<EncodedExample>) -> TranslationBatch<B> {
        let rows    = items.len();
        let seq_len = items.first().map_or(0, |e| e.input_ids.len());

        let (input_ids, attention_mask) = self.source_tensors(&items);

        let labels = self.stack(items.iter().map(|e| e.labels.as_slice()), rows, seq_len);

        // Pad labels stay pad in the shifted copy; the loss ignores them anyway
        let shifted: Vec<Vec<u32>> = items
            .iter()
            .map(|e| shift_right(&e.labels, self.decoder_start))
            .collect();
        let decoder_input_ids = self.stack(shifted.iter().map(Vec::as_slice), rows, seq_len);

        tracing::trace!("Batched {} examples of length {} (pad={})", rows, seq_len, self.pad);

        TranslationBatch {
            input_ids,
            attention_mask,
            labels,
            decoder_input_ids,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn ids() -> TokenIds {
        TokenIds { pad: 0, eos: 1, decoder_start: 1, source_tag: Some(3), target_tag: Some(4) }
    }

    fn example(tokens: &[u32]) -> EncodedExample {
        EncodedExample {
            input_ids:      vec![3, 7, 8, 1, 0],
            attention_mask: vec![1, 1, 1, 1, 0],
            labels:         tokens.to_vec(),
        }
    }

    fn to_vec(t: Tensor<TestBackend, 2, Int>) -> Vec<i64> {
        t.into_data().iter::<i64>().collect()
    }

    #[test]
    fn test_shift_right_prepends_start_and_drops_last() {
        assert_eq!(shift_right(&[4, 9, 9, 1, 0], 1), vec![1, 4, 9, 9, 1]);
        assert!(shift_right(&[], 1).is_empty());
    }

    #[test]
    fn test_batch_shapes_match_examples() {
        let batcher = TranslationBatcher::<TestBackend>::new(Default::default(), ids());
        let batch   = batcher.batch(vec![example(&[4, 9, 1, 0, 0]), example(&[4, 5, 6, 1, 0])]);

        assert_eq!(batch.input_ids.dims(), [2, 5]);
        assert_eq!(batch.attention_mask.dims(), [2, 5]);
        assert_eq!(batch.labels.dims(), [2, 5]);
        assert_eq!(batch.decoder_input_ids.dims(), [2, 5]);
    }

    #[test]
    fn test_decoder_inputs_are_shifted_labels() {
        let batcher = TranslationBatcher::<TestBackend>::new(Default::default(), ids());
        let batch   = batcher.batch(vec![example(&[4, 9, 1, 0, 0])]);

        assert_eq!(to_vec(batch.labels), vec![4, 9, 1, 0, 0]);
        assert_eq!(to_vec(batch.decoder_input_ids), vec![1, 4, 9, 1, 0]);
    }
}
