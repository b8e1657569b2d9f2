// ============================================================
// Layer 3 — Error Categories
// ============================================================
// Every fatal condition in the pipeline falls into one of a
// small number of categories. Components raise these typed
// errors and the upper layers carry them inside anyhow::Error
// with extra context, so callers (and tests) can still
// downcast to find out what kind of failure stopped the run.

use thiserror::Error;

/// Fatal pipeline failures. None of these are retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A corpus or pretrained artifact could not be downloaded
    #[error("retrieval failed for {what}: {message}")]
    Retrieval { what: String, message: String },

    /// A required setting is missing or inconsistent; raised before
    /// any batch is processed
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The forward/backward computation could not proceed
    #[error("computation error: {0}")]
    Computation(String),

    /// Corpus-level metrics are undefined for the given input
    #[error("metric computation error: {0}")]
    Metric(String),
}

impl PipelineError {
    pub fn retrieval(what: impl Into<String>, message: impl std::fmt::Display) -> Self {
        PipelineError::Retrieval {
            what:    what.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }
}

/// Failures raised by a `Translator` implementation.
#[derive(Debug, Error)]
pub enum TranslationServiceError {
    /// The service needs an API key that was not provided
    #[error("missing credentials: set {env_var}")]
    MissingCredentials { env_var: &'static str },

    /// The translator cannot serve this language pair
    #[error("unsupported language pair {source_lang} → {target_lang}")]
    UnsupportedLanguagePair { source_lang: String, target_lang: String },

    /// Transport failure or non-success HTTP status
    #[error("{service} request failed: {message}")]
    Request { service: &'static str, message: String },

    /// The service answered but the body had no translation
    #[error("{service} returned an unusable response: {message}")]
    InvalidResponse { service: &'static str, message: String },

    /// The local model failed while translating
    #[error("model translation failed: {0}")]
    Model(String),
}
