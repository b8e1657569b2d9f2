// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer takes a parallel corpus from its source all the
// way to tensor batches.
//
// The pipeline flows in this order:
//
//   CorpusSource (TSV file / datasets-server)
//       │
//       ▼
//   CorpusProvider    → cleans, splits, persists train/valid/test
//       │
//       ▼
//   PairEncoder       → token ids + attention mask + labels
//       │
//       ▼
//   TranslationDataset → implements Burn's Dataset trait
//       │
//       ▼
//   BatchSupplier     → shuffled (train) or ordered batches
//       │
//       ▼
//   TranslationBatcher → stacks a batch into backend tensors
//
// Each module is responsible for exactly one step.

/// Cleans and normalises raw sentence text
pub mod preprocessor;

/// Tab-separated split files with a header row
pub mod split_file;

/// Seeded train/valid/test partition
pub mod splitter;

/// Downloads and persists the corpus splits on demand
pub mod corpus;

/// Fixed-length encoding over a pretrained tokenizer
pub mod encoder;

/// Implements Burn's Dataset trait for encoded examples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Groups one split into shuffled or ordered batches
pub mod supplier;
