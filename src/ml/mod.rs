// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches burn tensors lives here, together
// with the two loops that drive a model through the
// TranslationModel trait.
//
//   model.rs      — encoder-decoder transformer: shared token
//                   embeddings, learned positions, pre-norm
//                   encoder/decoder stacks, LM head, greedy
//                   generation with a forced first token
//
//   seq2seq.rs    — BurnSeq2Seq: the burn model plus its Adam
//                   optimiser behind TranslationModel; loading
//                   from pretrained artifacts on CPU or GPU
//
//   trainer.rs    — fine-tuning loop: train / validate per
//                   epoch, checkpoint and metrics row after each
//
//   evaluator.rs  — evaluation loop: generate over the test
//                   split, decode, corpus BLEU / chrF / TER
//
//   inferencer.rs — the fine-tuned model as a Translator
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Encoder-decoder transformer architecture
pub mod model;

/// Burn model and optimiser behind the capability trait
pub mod seq2seq;

/// Epoch loop with validation and checkpointing
pub mod trainer;

/// Test-split generation and corpus scoring
pub mod evaluator;

/// Checkpoint-backed Translator
pub mod inferencer;
