// ============================================================
// Layer 6 — Pretrained Artifact Hub
// ============================================================
// Resolves a pretrained model identifier to the files needed
// to rebuild the model:
//
//   tokenizer.json      (required)
//   model_config.json   (required)
//   model.mpk           (optional; fresh init when absent)
//
// An identifier is either a local directory (a previous `init`
// or a checkpoint epoch directory) or a Hugging Face Hub repo
// id in "org/name" form, downloaded with hf-hub's sync API.

use anyhow::Result;
use hf_hub::api::sync::{ApiBuilder, ApiError};
use std::path::{Path, PathBuf};

use crate::domain::errors::PipelineError;
use crate::infra::tokenizer_store::TOKENIZER_FILE;
use crate::ml::seq2seq::{MODEL_CONFIG_FILE, WEIGHTS_FILE};

/// Local paths of everything a pretrained model consists of
#[derive(Debug, Clone)]
pub struct PretrainedArtifacts {
    pub identifier: String,
    pub tokenizer:  PathBuf,
    pub config:     PathBuf,
    pub weights:    Option<PathBuf>,
}

impl PretrainedArtifacts {
    /// Collect the artifacts stored in a local directory
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let identifier = dir.display().to_string();
        let required = |file: &str| -> Result<PathBuf> {
            let path = dir.join(file);
            if path.is_file() {
                Ok(path)
            } else {
                Err(PipelineError::retrieval(identifier.clone(), format!("missing {file}")).into())
            }
        };

        let tokenizer = required(TOKENIZER_FILE)?;
        let config    = required(MODEL_CONFIG_FILE)?;
        let weights   = Some(dir.join(WEIGHTS_FILE)).filter(|p| p.is_file());

        Ok(Self { identifier, tokenizer, config, weights })
    }
}

/// Split "org/name" into its parts
pub fn parse_repo_id(repo_id: &str) -> Result<(&str, &str)> {
    match repo_id.split_once('/') {
        Some((org, name)) if !org.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((org, name))
        }
        _ => Err(PipelineError::config(format!(
            "'{repo_id}' is neither a local directory nor an 'org/name' model id"
        ))
        .into()),
    }
}

pub struct ModelHub {
    cache_dir: Option<PathBuf>,
    token:     Option<String>,
}

impl ModelHub {
    pub fn new(cache_dir: Option<PathBuf>, token: Option<String>) -> Self {
        Self { cache_dir, token }
    }

    /// Hub client configured from HF_TOKEN and HF_HOME
    pub fn from_env() -> Self {
        let token     = std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty());
        let cache_dir = std::env::var("HF_HOME").ok().map(|h| PathBuf::from(h).join("hub"));
        Self::new(cache_dir, token)
    }

    /// Resolve `identifier` to local artifact paths, downloading if needed
    pub fn resolve(&self, identifier: &str) -> Result<PretrainedArtifacts> {
        let local = Path::new(identifier);
        if local.is_dir() {
            tracing::info!("Using local pretrained directory '{}'", local.display());
            return PretrainedArtifacts::from_dir(local);
        }

        parse_repo_id(identifier)?;
        tracing::info!("Fetching '{}' from the Hugging Face Hub", identifier);

        let mut builder = ApiBuilder::new();
        if let Some(dir) = &self.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        if let Some(token) = &self.token {
            builder = builder.with_token(Some(token.clone()));
        }
        let api = builder
            .build()
            .map_err(|e| PipelineError::retrieval(identifier, format!("cannot initialise hub client: {e}")))?;
        let repo = api.model(identifier.to_string());

        let fetch = |file: &str| -> std::result::Result<PathBuf, ApiError> { repo.get(file) };

        let tokenizer = fetch(TOKENIZER_FILE)
            .map_err(|e| PipelineError::retrieval(identifier, format!("{TOKENIZER_FILE}: {e}")))?;
        let config = fetch(MODEL_CONFIG_FILE)
            .map_err(|e| PipelineError::retrieval(identifier, format!("{MODEL_CONFIG_FILE}: {e}")))?;
        let weights = match fetch(WEIGHTS_FILE) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::debug!("No {} in '{}': {}", WEIGHTS_FILE, identifier, e);
                None
            }
        };

        Ok(PretrainedArtifacts {
            identifier: identifier.to_string(),
            tokenizer,
            config,
            weights,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_repo_id() {
        assert_eq!(parse_repo_id("facebook/nllb-200-distilled-1.3B").unwrap(),
                   ("facebook", "nllb-200-distilled-1.3B"));
        assert!(parse_repo_id("nllb").is_err());
        assert!(parse_repo_id("/nllb").is_err());
        assert!(parse_repo_id("a/b/c").is_err());
    }

    #[test]
    fn test_malformed_identifier_is_configuration_error() {
        let err = ModelHub::new(None, None).resolve("not-a-model").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_local_directory_without_weights() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TOKENIZER_FILE), "{}").unwrap();
        fs::write(dir.path().join(MODEL_CONFIG_FILE), "{}").unwrap();

        let hub = ModelHub::new(None, None);
        let artifacts = hub.resolve(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(artifacts.tokenizer, dir.path().join(TOKENIZER_FILE));
        assert!(artifacts.weights.is_none());
    }

    #[test]
    fn test_local_directory_missing_tokenizer_is_retrieval_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MODEL_CONFIG_FILE), "{}").unwrap();

        let err = PretrainedArtifacts::from_dir(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Retrieval { .. })
        ));
    }
}
