use anyhow::{Context, Result};
use burn::data::dataset::Dataset;

use crate::data::encoder::PairEncoder;
use crate::domain::encoded::EncodedExample;
use crate::domain::sentence_pair::{SentencePair, Split};

/// The encoded examples of one split, in file order.
pub struct TranslationDataset {
    examples: Vec<EncodedExample>,
}

impl TranslationDataset {
    pub fn new(split: Split, examples: Vec<EncodedExample>) -> Self {
        tracing::debug!("{} dataset holds {} examples", split, examples.len());
        Self { examples }
    }

    /// Encode every pair of `split` with `encoder`
    pub fn encode(split: Split, pairs: &[SentencePair], encoder: &PairEncoder) -> Result<Self> {
        let examples = pairs
            .iter()
            .enumerate()
            .map(|(row, pair)| {
                encoder
                    .encode_pair(pair)
                    .with_context(|| format!("Cannot encode {split} row {row}"))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!("Encoded {} {} examples", examples.len(), split);
        Ok(Self { examples })
    }
}

impl Dataset<EncodedExample> for TranslationDataset {
    fn get(&self, index: usize) -> Option<EncodedExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}
