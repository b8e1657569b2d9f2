// Test doubles for the capability traits. The loops are driven
// through these so their tests need neither weights nor a GPU.

use anyhow::Result;
use std::{cell::Cell, fs, path::Path};

use crate::domain::encoded::Batch;
use crate::domain::errors::PipelineError;
use crate::domain::traits::{Persistable, TranslationModel};

/// Copies its supervision into its output.
///
/// `generate` returns the non-special label tokens (or the source tokens
/// when a batch has no labels), so a perfect score is expected whenever
/// it is evaluated against its own references.
pub struct EchoModel {
    pub pad:          u32,
    pub eos:          u32,
    /// `train_step` fails on this call number (1-based)
    pub fail_on_step: Option<usize>,
    pub steps:        usize,
    pub last_forced:  Cell<Option<u32>>,
}

impl EchoModel {
    pub fn new(pad: u32, eos: u32) -> Self {
        Self { pad, eos, fail_on_step: None, steps: 0, last_forced: Cell::new(None) }
    }

    fn strip(&self, ids: &[u32]) -> Vec<u32> {
        ids.iter()
            .copied()
            .take_while(|&t| t != self.eos)
            .filter(|&t| t != self.pad)
            .collect()
    }
}

impl TranslationModel for EchoModel {
    fn train_step(&mut self, _batch: &Batch) -> Result<f64> {
        self.steps += 1;
        if self.fail_on_step == Some(self.steps) {
            return Err(PipelineError::Computation("shape mismatch".into()).into());
        }
        Ok(1.0 / self.steps as f64)
    }

    fn validation_loss(&self, _batch: &Batch) -> Result<f64> {
        Ok(0.5)
    }

    fn generate(
        &self,
        batch:          &Batch,
        max_new_tokens: usize,
        forced_bos:     Option<u32>,
    ) -> Result<Vec<Vec<u32>>> {
        self.last_forced.set(forced_bos);
        Ok(batch
            .examples
            .iter()
            .map(|ex| {
                let source = if ex.labels.is_empty() { &ex.input_ids } else { &ex.labels };
                let mut out = self.strip(source);
                out.truncate(max_new_tokens);
                out
            })
            .collect())
    }

    fn save(&self, dir: &Path) -> Result<()> {
        fs::write(dir.join("weights.txt"), self.steps.to_string())?;
        Ok(())
    }
}

/// A config that only knows how to write a marker file
pub struct MarkerConfig;

impl Persistable for MarkerConfig {
    fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, "{}")?;
        Ok(())
    }

    fn load(_path: &Path) -> Result<Self> {
        Ok(MarkerConfig)
    }
}
