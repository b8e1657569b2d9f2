// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Publishes one immutable checkpoint directory per epoch.
//
// What gets saved per checkpoint:
//   1. Model weights + model_config.json (TranslationModel::save)
//   2. tokenizer.json                    (same vocabulary the
//                                         model was trained with)
//   3. run_config.json                   (the RunConfig of the run)
//
// File layout:
//   checkpoints/
//     run-20261018-142501-3fa2/
//       epoch-001/            ← a complete pretrained directory
//       epoch-002/
//       latest_epoch.json     ← number of the last published epoch
//       metrics.csv           ← one row per epoch
//
// Every run gets its own directory, created with create_dir so
// two runs can never share one. An epoch is written into a
// hidden ".epoch-NNN.partial" directory and renamed into place
// only once all of its files are on disk. An existing epoch
// directory is never replaced.

use anyhow::{Context, Result};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::domain::errors::PipelineError;
use crate::domain::traits::{Persistable, TranslationModel};
use crate::infra::tokenizer_store::{TokenizerStore, TOKENIZER_FILE};

pub const RUN_CONFIG_FILE: &str = "run_config.json";
const LATEST_EPOCH_FILE: &str = "latest_epoch.json";
const RUN_PREFIX: &str = "run-";

/// Owns the directory of one training run.
pub struct CheckpointManager {
    run_dir: PathBuf,
}

impl CheckpointManager {
    /// Create a fresh, uniquely named run directory under `root`.
    pub fn start_run(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("Cannot create checkpoint root '{}'", root.display()))?;

        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        for _ in 0..16 {
            let run_id  = format!("{RUN_PREFIX}{stamp}-{:04x}", rand::random::<u16>());
            let run_dir = root.join(&run_id);
            match fs::create_dir(&run_dir) {
                Ok(()) => {
                    tracing::info!("Checkpoints for this run go to '{}'", run_dir.display());
                    return Ok(Self { run_dir });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("Cannot create '{}'", run_dir.display()))
                }
            }
        }
        anyhow::bail!("Could not find a free run directory under '{}'", root.display())
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn epoch_dir(&self, epoch: usize) -> PathBuf {
        self.run_dir.join(format!("epoch-{epoch:03}"))
    }

    /// Publish the checkpoint for `epoch` and return its directory.
    ///
    /// Fails without touching anything if that epoch was already published.
    pub fn save_epoch(
        &self,
        epoch:      usize,
        model:      &dyn TranslationModel,
        tokenizer:  &Tokenizer,
        run_config: &dyn Persistable,
    ) -> Result<PathBuf> {
        let target = self.epoch_dir(epoch);
        if target.exists() {
            anyhow::bail!(
                "Checkpoint '{}' already exists and will not be overwritten",
                target.display()
            );
        }

        let staging = self.run_dir.join(format!(".epoch-{epoch:03}.partial"));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir(&staging)
            .with_context(|| format!("Cannot create '{}'", staging.display()))?;

        let written = model
            .save(&staging)
            .and_then(|()| TokenizerStore::new(&staging).save(tokenizer))
            .and_then(|()| run_config.save(&staging.join(RUN_CONFIG_FILE)));
        if let Err(e) = written {
            fs::remove_dir_all(&staging).ok();
            return Err(e.context(format!("Failed to write checkpoint for epoch {epoch}")));
        }

        fs::rename(&staging, &target)
            .with_context(|| format!("Cannot publish '{}'", target.display()))?;

        // Update the latest epoch pointer
        let latest_path = self.run_dir.join(LATEST_EPOCH_FILE);
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(target)
    }
}

/// Read a run directory's latest_epoch.json
pub fn latest_epoch(run_dir: &Path) -> Result<usize> {
    let path = run_dir.join(LATEST_EPOCH_FILE);
    let s = fs::read_to_string(&path)
        .with_context(|| format!("Cannot read '{}'. Has this run finished an epoch?", path.display()))?;
    Ok(serde_json::from_str::<usize>(&s)?)
}

/// Turn a checkpoint reference into an epoch directory.
///
/// Accepts an epoch directory itself, a run directory (its latest epoch)
/// or a checkpoint root (the latest epoch of the newest run).
pub fn resolve_checkpoint(path: &Path) -> Result<PathBuf> {
    if path.join(TOKENIZER_FILE).is_file() {
        return Ok(path.to_path_buf());
    }
    if path.join(LATEST_EPOCH_FILE).is_file() {
        let epoch = latest_epoch(path)?;
        return Ok(path.join(format!("epoch-{epoch:03}")));
    }

    let newest_run = fs::read_dir(path)
        .with_context(|| format!("Cannot read checkpoint directory '{}'", path.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.is_dir()
                && p.join(LATEST_EPOCH_FILE).is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(RUN_PREFIX))
        })
        .max();

    match newest_run {
        Some(run_dir) => resolve_checkpoint(&run_dir),
        None => Err(PipelineError::config(format!(
            "'{}' holds no finished checkpoint; run 'train' first",
            path.display()
        ))
        .into()),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fakes::{EchoModel, MarkerConfig};
    use crate::infra::tokenizer_store::build_char_tokenizer;

    fn tokenizer() -> Tokenizer {
        build_char_tokenizer(&["감사합니다".to_string()], &[]).unwrap()
    }

    #[test]
    fn test_each_epoch_gets_its_own_directory() {
        let root = tempfile::tempdir().unwrap();
        let mgr  = CheckpointManager::start_run(root.path()).unwrap();
        let model = EchoModel::new(0, 1);

        let one = mgr.save_epoch(1, &model, &tokenizer(), &MarkerConfig).unwrap();
        let two = mgr.save_epoch(2, &model, &tokenizer(), &MarkerConfig).unwrap();

        assert_ne!(one, two);
        for dir in [&one, &two] {
            assert!(dir.join("weights.txt").is_file());
            assert!(dir.join(TOKENIZER_FILE).is_file());
            assert!(dir.join(RUN_CONFIG_FILE).is_file());
        }
        assert_eq!(latest_epoch(mgr.run_dir()).unwrap(), 2);
    }

    #[test]
    fn test_existing_epoch_is_never_overwritten() {
        let root  = tempfile::tempdir().unwrap();
        let mgr   = CheckpointManager::start_run(root.path()).unwrap();
        let mut model = EchoModel::new(0, 1);

        let dir = mgr.save_epoch(1, &model, &tokenizer(), &MarkerConfig).unwrap();
        model.steps = 99;
        assert!(mgr.save_epoch(1, &model, &tokenizer(), &MarkerConfig).is_err());
        assert_eq!(fs::read_to_string(dir.join("weights.txt")).unwrap(), "0");
    }

    #[test]
    fn test_runs_never_share_a_directory() {
        let root = tempfile::tempdir().unwrap();
        let a = CheckpointManager::start_run(root.path()).unwrap();
        let b = CheckpointManager::start_run(root.path()).unwrap();
        assert_ne!(a.run_dir(), b.run_dir());
    }

    #[test]
    fn test_failed_save_leaves_no_checkpoint() {
        struct BrokenModel;
        impl TranslationModel for BrokenModel {
            fn train_step(&mut self, _: &crate::domain::encoded::Batch) -> Result<f64> { Ok(0.0) }
            fn validation_loss(&self, _: &crate::domain::encoded::Batch) -> Result<f64> { Ok(0.0) }
            fn generate(&self, _: &crate::domain::encoded::Batch, _: usize, _: Option<u32>) -> Result<Vec<Vec<u32>>> {
                Ok(Vec::new())
            }
            fn save(&self, _: &Path) -> Result<()> {
                anyhow::bail!("disk full")
            }
        }

        let root = tempfile::tempdir().unwrap();
        let mgr  = CheckpointManager::start_run(root.path()).unwrap();
        assert!(mgr.save_epoch(1, &BrokenModel, &tokenizer(), &MarkerConfig).is_err());

        let leftovers: Vec<_> = fs::read_dir(mgr.run_dir()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_resolve_checkpoint_from_root_run_or_epoch() {
        let root  = tempfile::tempdir().unwrap();
        let mgr   = CheckpointManager::start_run(root.path()).unwrap();
        let model = EchoModel::new(0, 1);
        mgr.save_epoch(1, &model, &tokenizer(), &MarkerConfig).unwrap();
        let last = mgr.save_epoch(2, &model, &tokenizer(), &MarkerConfig).unwrap();

        assert_eq!(resolve_checkpoint(&last).unwrap(), last);
        assert_eq!(resolve_checkpoint(mgr.run_dir()).unwrap(), last);
        assert_eq!(resolve_checkpoint(root.path()).unwrap(), last);
    }

    #[test]
    fn test_resolve_checkpoint_without_runs_is_configuration_error() {
        let root = tempfile::tempdir().unwrap();
        let err  = resolve_checkpoint(root.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Configuration(_))
        ));
    }
}
