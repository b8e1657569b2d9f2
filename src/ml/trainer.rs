// ============================================================
// Layer 5 — Fine-Tuning Loop
// ============================================================
// Epoch loop over any TranslationModel:
//
//   Idle → (TrainingEpoch → ValidatingEpoch) × epochs → Idle
//
//   TrainingEpoch    one train_step per shuffled batch; each step
//                    applies its optimiser update before the next
//                    batch is drawn
//   ValidatingEpoch  validation_loss over the ordered valid split;
//                    reported only, never fed back into training
//
// After each validation phase a checkpoint directory is
// published and the epoch row goes to metrics.csv. Any error
// from the model aborts the run; there is no resumption.

use anyhow::{Context, Result};
use std::{fmt, path::PathBuf};
use tokenizers::Tokenizer;

use crate::data::dataset::TranslationDataset;
use crate::data::supplier::BatchSupplier;
use crate::domain::errors::PipelineError;
use crate::domain::traits::{Persistable, TranslationModel};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};

#[derive(Debug, Clone, Copy)]
pub struct TrainOptions {
    pub epochs:     usize,
    pub batch_size: usize,
    pub seed:       u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingPhase {
    Idle,
    TrainingEpoch(usize),
    ValidatingEpoch(usize),
}

impl fmt::Display for TrainingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingPhase::Idle               => write!(f, "idle"),
            TrainingPhase::TrainingEpoch(e)   => write!(f, "training epoch {e}"),
            TrainingPhase::ValidatingEpoch(e) => write!(f, "validating epoch {e}"),
        }
    }
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub epochs:      Vec<EpochMetrics>,
    pub checkpoints: Vec<PathBuf>,
}

impl TrainingSummary {
    pub fn final_checkpoint(&self) -> Option<&PathBuf> {
        self.checkpoints.last()
    }
}

pub struct FineTuner<'a> {
    options:     TrainOptions,
    checkpoints: &'a CheckpointManager,
    run_config:  &'a dyn Persistable,
}

impl<'a> FineTuner<'a> {
    pub fn new(
        options:     TrainOptions,
        checkpoints: &'a CheckpointManager,
        run_config:  &'a dyn Persistable,
    ) -> Self {
        Self { options, checkpoints, run_config }
    }

    pub fn run(
        &self,
        model:     &mut dyn TranslationModel,
        tokenizer: &Tokenizer,
        train:     &TranslationDataset,
        valid:     &TranslationDataset,
    ) -> Result<TrainingSummary> {
        use burn::data::dataset::Dataset;

        let opts = self.options;
        if train.is_empty() {
            return Err(PipelineError::config("the training split is empty").into());
        }
        if opts.epochs == 0 || opts.batch_size == 0 {
            return Err(PipelineError::config("epochs and batch_size must be at least 1").into());
        }

        let metrics = MetricsLogger::new(self.checkpoints.run_dir())?;
        let mut train_batches = BatchSupplier::new(train, opts.batch_size, true, opts.seed);
        let mut valid_batches = BatchSupplier::new(valid, opts.batch_size, false, opts.seed);

        tracing::info!(
            "Fine-tuning for {} epochs: {} train batches, {} valid batches",
            opts.epochs,
            train_batches.num_batches(),
            valid_batches.num_batches(),
        );

        let mut summary = TrainingSummary { epochs: Vec::new(), checkpoints: Vec::new() };

        for epoch in 1..=opts.epochs {
            // ── Training phase ────────────────────────────────────────────────
            tracing::info!("Phase: {}", TrainingPhase::TrainingEpoch(epoch));
            let mut train_loss_sum = 0.0f64;
            let mut train_steps    = 0usize;

            for batch in train_batches.pass() {
                let loss = model
                    .train_step(&batch)
                    .with_context(|| format!("Training step {} of epoch {epoch} failed", train_steps + 1))?;
                train_loss_sum += loss;
                train_steps    += 1;
                tracing::debug!("epoch {} step {} loss={:.4}", epoch, train_steps, loss);
            }
            let avg_train_loss = train_loss_sum / train_steps as f64;

            // ── Validation phase ──────────────────────────────────────────────
            tracing::info!("Phase: {}", TrainingPhase::ValidatingEpoch(epoch));
            let mut val_loss_sum = 0.0f64;
            let mut val_steps    = 0usize;

            for batch in valid_batches.pass() {
                val_loss_sum += model
                    .validation_loss(&batch)
                    .with_context(|| format!("Validation of epoch {epoch} failed"))?;
                val_steps += 1;
            }
            let avg_val_loss = (val_steps > 0).then(|| val_loss_sum / val_steps as f64);

            let row = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss);
            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={}",
                epoch,
                opts.epochs,
                avg_train_loss,
                avg_val_loss.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}")),
            );

            // ── Checkpoint ────────────────────────────────────────────────────
            let dir = self.checkpoints.save_epoch(epoch, &*model, tokenizer, self.run_config)?;
            metrics.log(&row)?;
            tracing::info!("Checkpoint saved for epoch {} at '{}'", epoch, dir.display());

            summary.epochs.push(row);
            summary.checkpoints.push(dir);
        }

        tracing::info!("Phase: {}", TrainingPhase::Idle);
        tracing::info!("Training complete!");
        Ok(summary)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::encoded::EncodedExample;
    use crate::domain::fakes::{EchoModel, MarkerConfig};
    use crate::domain::sentence_pair::Split;
    use crate::infra::tokenizer_store::build_char_tokenizer;
    use std::fs;

    fn dataset(split: Split, n: usize) -> TranslationDataset {
        let examples = (0..n as u32)
            .map(|i| EncodedExample {
                input_ids:      vec![5 + i, 1, 0],
                attention_mask: vec![1, 1, 0],
                labels:         vec![6 + i, 1, 0],
            })
            .collect();
        TranslationDataset::new(split, examples)
    }

    fn tokenizer() -> Tokenizer {
        build_char_tokenizer(&["고양이".to_string()], &[]).unwrap()
    }

    fn options(epochs: usize) -> TrainOptions {
        TrainOptions { epochs, batch_size: 4, seed: 42 }
    }

    #[test]
    fn test_two_epochs_publish_two_distinct_checkpoints() {
        let root  = tempfile::tempdir().unwrap();
        let mgr   = CheckpointManager::start_run(root.path()).unwrap();
        let tuner = FineTuner::new(options(2), &mgr, &MarkerConfig);
        let mut model = EchoModel::new(0, 1);

        let summary = tuner
            .run(&mut model, &tokenizer(), &dataset(Split::Train, 10), &dataset(Split::Valid, 3))
            .unwrap();

        assert_eq!(summary.checkpoints.len(), 2);
        assert_ne!(summary.checkpoints[0], summary.checkpoints[1]);
        assert!(summary.checkpoints.iter().all(|d| d.is_dir()));

        // 3 batches per epoch
        assert_eq!(model.steps, 6);
        assert_eq!(summary.epochs[1].val_loss, Some(0.5));

        let csv = fs::read_to_string(mgr.run_dir().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_empty_training_split_is_configuration_error() {
        let root  = tempfile::tempdir().unwrap();
        let mgr   = CheckpointManager::start_run(root.path()).unwrap();
        let tuner = FineTuner::new(options(1), &mgr, &MarkerConfig);

        let err = tuner
            .run(&mut EchoModel::new(0, 1), &tokenizer(), &dataset(Split::Train, 0), &dataset(Split::Valid, 2))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_step_error_aborts_before_checkpoint() {
        let root  = tempfile::tempdir().unwrap();
        let mgr   = CheckpointManager::start_run(root.path()).unwrap();
        let tuner = FineTuner::new(options(3), &mgr, &MarkerConfig);

        let mut model = EchoModel::new(0, 1);
        model.fail_on_step = Some(5);

        let err = tuner
            .run(&mut model, &tokenizer(), &dataset(Split::Train, 10), &dataset(Split::Valid, 0))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Computation(_))
        ));

        // Epoch 1 finished, epoch 2 failed on its second step
        assert!(mgr.epoch_dir(1).is_dir());
        assert!(!mgr.epoch_dir(2).exists());
    }

    #[test]
    fn test_empty_validation_split_reports_no_val_loss() {
        let root  = tempfile::tempdir().unwrap();
        let mgr   = CheckpointManager::start_run(root.path()).unwrap();
        let tuner = FineTuner::new(options(1), &mgr, &MarkerConfig);

        let summary = tuner
            .run(&mut EchoModel::new(0, 1), &tokenizer(), &dataset(Split::Train, 2), &dataset(Split::Valid, 0))
            .unwrap();
        assert_eq!(summary.epochs[0].val_loss, None);
    }
}
