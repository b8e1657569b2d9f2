// ============================================================
// Layer 5 — Burn-backed TranslationModel
// ============================================================
// Adapts Seq2SeqTransformer to the TranslationModel capability
// the fine-tuning and evaluation loops are written against.
//
// Key Burn insight (same split as any burn training loop):
//   - train_step runs on B (an AutodiffBackend) so loss.backward()
//     has a graph to walk
//   - validation_loss and generate call model.valid(), which
//     returns the model on B::InnerBackend: no autodiff overhead
//     and dropout disabled
//   - the optimiser consumes the gradients on every step, so
//     nothing carries over into the next batch
//
// Every batch is checked against the model configuration before
// the forward pass. A mismatch there would otherwise surface as
// a panic deep inside a tensor op.

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::batcher::TranslationBatcher;
use crate::data::encoder::{PairEncoder, TokenIds};
use crate::domain::encoded::Batch;
use crate::domain::errors::PipelineError;
use crate::domain::traits::TranslationModel;
use crate::infra::hub::PretrainedArtifacts;
use crate::ml::model::{Seq2SeqConfig, Seq2SeqTransformer};

pub const MODEL_CONFIG_FILE: &str = "model_config.json";

/// CompactRecorder appends its own extension to this stem
pub const WEIGHTS_STEM: &str = "model";
pub const WEIGHTS_FILE: &str = "model.mpk";

/// Where the model runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    /// Autodiff<NdArray> on the CPU
    Cpu,
    /// Autodiff<Wgpu> on the default GPU adapter
    Gpu,
}

impl std::fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComputeDevice::Cpu => write!(f, "cpu"),
            ComputeDevice::Gpu => write!(f, "gpu"),
        }
    }
}

// ─── BurnSeq2Seq ──────────────────────────────────────────────────────────────
pub struct BurnSeq2Seq<B: AutodiffBackend, O> {
    model:         Seq2SeqTransformer<B>,
    optim:         O,
    config:        Seq2SeqConfig,
    ids:           TokenIds,
    learning_rate: f64,
    device:        B::Device,
}

impl<B, O> BurnSeq2Seq<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2SeqTransformer<B>, B>,
{
    pub fn new(
        model:         Seq2SeqTransformer<B>,
        optim:         O,
        config:        Seq2SeqConfig,
        ids:           TokenIds,
        learning_rate: f64,
        device:        B::Device,
    ) -> Self {
        Self { model, optim, config, ids, learning_rate, device }
    }

    pub fn config(&self) -> &Seq2SeqConfig {
        &self.config
    }

    /// Reject batches the model cannot process
    fn check_batch(&self, batch: &Batch, with_labels: bool) -> Result<()> {
        let computation = |msg: String| -> anyhow::Error { PipelineError::Computation(msg).into() };

        let Some(first) = batch.examples.first() else {
            return Err(computation("received an empty batch".into()));
        };
        let seq_len = first.input_ids.len();

        if seq_len == 0 || seq_len > self.config.max_positions {
            return Err(computation(format!(
                "sequence length {seq_len} is outside the model's 1..={} positions; \
                 check max_length",
                self.config.max_positions
            )));
        }

        for (row, ex) in batch.indices.iter().zip(&batch.examples) {
            let labels_ok = !with_labels || ex.labels.len() == seq_len;
            if ex.input_ids.len() != seq_len || ex.attention_mask.len() != seq_len || !labels_ok {
                return Err(computation(format!(
                    "row {row} does not match the batch shape [{}, {seq_len}]",
                    batch.len()
                )));
            }

            let labels: &[u32] = if with_labels { &ex.labels } else { &[] };
            if let Some(&bad) = ex.input_ids.iter().chain(labels).find(|&&t| t as usize >= self.config.vocab_size) {
                return Err(computation(format!(
                    "row {row} holds token id {bad}, outside the model vocabulary of {}",
                    self.config.vocab_size
                )));
            }
        }
        Ok(())
    }
}

impl<B, O> TranslationModel for BurnSeq2Seq<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2SeqTransformer<B>, B>,
{
    fn train_step(&mut self, batch: &Batch) -> Result<f64> {
        self.check_batch(batch, true)?;

        let batcher = TranslationBatcher::<B>::new(self.device.clone(), self.ids);
        let tensors = batcher.from_batch(batch);

        let loss = self.model.forward_loss(&tensors, self.ids.pad);
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        if !loss_val.is_finite() {
            return Err(PipelineError::Computation(format!("training loss became {loss_val}")).into());
        }

        // Backward pass + Adam update
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.learning_rate, self.model.clone(), grads);

        Ok(loss_val)
    }

    fn validation_loss(&self, batch: &Batch) -> Result<f64> {
        self.check_batch(batch, true)?;

        // model.valid() → Seq2SeqTransformer<B::InnerBackend>
        let model   = self.model.valid();
        let batcher = TranslationBatcher::<B::InnerBackend>::new(self.device.clone(), self.ids);
        let tensors = batcher.from_batch(batch);

        let loss_val: f64 = model
            .forward_loss(&tensors, self.ids.pad)
            .into_scalar()
            .elem::<f64>();
        if !loss_val.is_finite() {
            return Err(PipelineError::Computation(format!("validation loss became {loss_val}")).into());
        }
        Ok(loss_val)
    }

    fn generate(
        &self,
        batch:          &Batch,
        max_new_tokens: usize,
        forced_bos:     Option<u32>,
    ) -> Result<Vec<Vec<u32>>> {
        self.check_batch(batch, false)?;
        if let Some(tag) = forced_bos.filter(|&t| t as usize >= self.config.vocab_size) {
            return Err(PipelineError::Computation(format!(
                "forced token id {tag} is outside the model vocabulary"
            ))
            .into());
        }

        let model   = self.model.valid();
        let batcher = TranslationBatcher::<B::InnerBackend>::new(self.device.clone(), self.ids);
        let (input_ids, attention_mask) = batcher.source_tensors(&batch.examples);

        Ok(model.generate_greedy(
            input_ids,
            attention_mask,
            self.ids.decoder_start,
            self.ids.eos,
            forced_bos,
            max_new_tokens,
        ))
    }

    fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(WEIGHTS_STEM);
        CompactRecorder::new()
            .record(self.model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model weights to '{}'", path.display()))?;

        let config_path = dir.join(MODEL_CONFIG_FILE);
        self.config
            .save(&config_path)
            .with_context(|| format!("Cannot write '{}'", config_path.display()))?;

        tracing::debug!("Saved model to '{}'", dir.display());
        Ok(())
    }
}

// ─── Loading ──────────────────────────────────────────────────────────────────
/// Read model_config.json from a pretrained directory
pub fn load_model_config(path: &Path) -> Result<Seq2SeqConfig> {
    Seq2SeqConfig::load(path).map_err(|e| {
        PipelineError::config(format!("cannot read model config '{}': {e}", path.display())).into()
    })
}

/// Rebuild the model described by `artifacts` on backend `B`.
///
/// Missing weights are not an error: the model starts from a fresh
/// initialisation and a warning is logged.
pub fn load_seq2seq<B: AutodiffBackend>(
    artifacts:     &PretrainedArtifacts,
    encoder:       &PairEncoder,
    learning_rate: f64,
    device:        B::Device,
) -> Result<BurnSeq2Seq<B, impl Optimizer<Seq2SeqTransformer<B>, B>>> {
    let config = load_model_config(&artifacts.config)?;

    let tokenizer_vocab = encoder.tokenizer().get_vocab_size(true);
    if tokenizer_vocab > config.vocab_size {
        return Err(PipelineError::config(format!(
            "tokenizer has {tokenizer_vocab} entries but the model only embeds {}",
            config.vocab_size
        ))
        .into());
    }
    if encoder.max_length() > config.max_positions {
        return Err(PipelineError::config(format!(
            "max_length {} exceeds the model's {} positions",
            encoder.max_length(),
            config.max_positions
        ))
        .into());
    }

    let mut model: Seq2SeqTransformer<B> = config.init(&device);
    match &artifacts.weights {
        Some(path) => {
            // The recorder adds the extension back itself
            let stem   = path.with_extension("");
            let record = CompactRecorder::new()
                .load(stem, &device)
                .with_context(|| format!("Cannot load weights '{}'", path.display()))?;
            model = model.load_record(record);
            tracing::info!("Loaded weights from '{}'", path.display());
        }
        None => {
            tracing::warn!(
                "No weights found for '{}', starting from a fresh initialisation",
                artifacts.identifier
            );
        }
    }

    // θ = θ - lr * m / (√v + ε)
    let optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .init::<B, Seq2SeqTransformer<B>>();

    Ok(BurnSeq2Seq::new(model, optim, config, encoder.token_ids(), learning_rate, device))
}

/// Load the model on the requested device behind the capability trait
pub fn load_model(
    device:        ComputeDevice,
    artifacts:     &PretrainedArtifacts,
    encoder:       &PairEncoder,
    learning_rate: f64,
) -> Result<Box<dyn TranslationModel>> {
    match device {
        ComputeDevice::Cpu => {
            tracing::info!("Using NdArray CPU backend");
            let model = load_seq2seq::<Autodiff<NdArray>>(
                artifacts, encoder, learning_rate, NdArrayDevice::Cpu,
            )?;
            Ok(Box::new(model))
        }
        ComputeDevice::Gpu => {
            let device = WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            let model = load_seq2seq::<Autodiff<Wgpu>>(artifacts, encoder, learning_rate, device)?;
            Ok(Box::new(model))
        }
    }
}

/// Write `config` and freshly initialised weights into `dir`
pub fn write_initial_model(config: &Seq2SeqConfig, dir: &Path) -> Result<()> {
    let model: Seq2SeqTransformer<NdArray> = config.init(&NdArrayDevice::Cpu);

    let path = dir.join(WEIGHTS_STEM);
    CompactRecorder::new()
        .record(model.into_record(), path.clone())
        .with_context(|| format!("Failed to save model weights to '{}'", path.display()))?;

    let config_path = dir.join(MODEL_CONFIG_FILE);
    config
        .save(&config_path)
        .with_context(|| format!("Cannot write '{}'", config_path.display()))?;
    Ok(())
}
