// ============================================================
// Layer 3 — Encoded Examples and Batches
// ============================================================
// Plain token-id containers shared by the data and ML layers.
// No tensors here: converting a Batch into backend tensors is
// the job of the burn Batcher in Layer 4.

use serde::{Deserialize, Serialize};

/// One SentencePair after tokenisation.
///
/// All three sequences have exactly the configured max length.
/// Deriving it is pure: same pair + same tokenizer + same
/// max length always gives the same example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedExample {
    /// Source token ids: `[src_tag?] tokens… eos [pad]…`
    pub input_ids: Vec<u32>,

    /// 1 = real token, 0 = padding
    pub attention_mask: Vec<u32>,

    /// Target token ids used as supervision: `[tgt_tag?] tokens… eos [pad]…`
    /// Empty for inference-only examples.
    pub labels: Vec<u32>,
}

/// A group of encoded examples drawn from a single split.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Row positions of the examples inside their split
    pub indices: Vec<usize>,

    /// The examples themselves, in the same order as `indices`
    pub examples: Vec<EncodedExample>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}
