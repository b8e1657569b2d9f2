// ============================================================
// Layer 3 — SentencePair and Split Domain Types
// ============================================================
// A SentencePair is one row of a parallel corpus: a sentence
// in the source language and its translation in the target
// language. Rows are identified only by their position in
// the split file they were read from.
//
// A Split names one of the three disjoint partitions of the
// corpus:
//   - Train: used to update model weights
//   - Valid: monitored after each epoch (never trained on)
//   - Test:  scored once by the evaluation loop

use serde::{Deserialize, Serialize};
use std::fmt;

/// One parallel example. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    /// Sentence in the source language (e.g. Japanese)
    pub source_text: String,

    /// Reference translation in the target language (e.g. Korean)
    pub target_text: String,
}

impl SentencePair {
    pub fn new(source_text: impl Into<String>, target_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            target_text: target_text.into(),
        }
    }

    /// A pair is usable only when both sides carry text
    pub fn is_complete(&self) -> bool {
        !self.source_text.trim().is_empty() && !self.target_text.trim().is_empty()
    }
}

/// The three named partitions of a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    Train,
    Valid,
    Test,
}

impl Split {
    /// Every split, in the order they are written to disk
    pub const ALL: [Split; 3] = [Split::Train, Split::Valid, Split::Test];

    /// File name of the persisted split inside the data directory
    pub fn file_name(self) -> &'static str {
        match self {
            Split::Train => "train.tsv",
            Split::Valid => "valid.tsv",
            Split::Test  => "test.tsv",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test  => "test",
        };
        f.write_str(name)
    }
}
