// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits that define the core
// concepts of the translation pipeline.
//
// Rules for this layer:
//   - NO burn framework types
//   - NO file I/O or network calls
//   - Only plain data, error categories and capability traits

// A parallel sentence pair and the split it belongs to
pub mod sentence_pair;

// Token-id containers produced by the encoding layer
pub mod encoded;

// Fatal error categories shared by every layer
pub mod errors;

// Core abstractions (traits) that other layers implement
pub mod traits;

// In-memory doubles for the capability traits
#[cfg(test)]
pub mod fakes;
