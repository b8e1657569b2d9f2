// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that talks to the filesystem or the network on
// behalf of the other layers:
//
//   checkpoint.rs      — run directories, atomic per-epoch
//                        checkpoint publishing, resolving a
//                        checkpoint path back to an epoch dir
//
//   tokenizer_store.rs — tokenizer.json persistence and the
//                        character-level vocabulary builder
//
//   hub.rs             — pretrained artifacts: a local dir or
//                        a Hugging Face Hub download (hf-hub)
//
//   remote_corpus.rs   — CorpusSource over the HF
//                        datasets-server rows API (reqwest)
//
//   metrics.rs         — per-epoch loss rows in metrics.csv
//
//   translators.rs     — DeepL and OpenAI Translator clients
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Run directories and epoch checkpoints
pub mod checkpoint;

/// Tokenizer saving, loading and building
pub mod tokenizer_store;

/// Pretrained model artifacts
pub mod hub;

/// HF datasets-server corpus source
pub mod remote_corpus;

/// Epoch metrics CSV logger
pub mod metrics;

/// Remote translation services
pub mod translators;
