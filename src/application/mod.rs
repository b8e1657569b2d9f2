// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one goal per CLI subcommand (fetch, init, train, evaluate,
// translate).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - No direct file formats or HTTP (that's Layers 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Every run setting, validated up front
pub mod config;

// Tokenizer + encoder + model from a pretrained or checkpoint dir
pub mod pretrained;

// Fetch and partition the corpus into split files
pub mod corpus_use_case;

// Build a fresh character-level starting model
pub mod init_use_case;

// The fine-tuning workflow
pub mod train_use_case;

// Test-split scoring of the model or a remote translator
pub mod evaluate_use_case;

// Ad-hoc translation with any translator
pub mod translate_use_case;
