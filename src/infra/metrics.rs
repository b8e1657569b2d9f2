// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records the loss curve of a run to a CSV file after each
// epoch, next to that run's checkpoints.
//
// Example CSV output:
//   epoch,train_loss,val_loss
//   1,3.124500,3.089200
//   2,2.890100,2.854300
//
// val_loss is left empty when the validation split is empty.
//
// Output file: <run_dir>/metrics.csv

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean loss over all training batches
    pub train_loss: f64,

    /// Mean loss over the validation split, if it has any rows
    pub val_loss: Option<f64>,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: Option<f64>) -> Self {
        Self { epoch, train_loss, val_loss }
    }
}

/// Appends epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss,val_loss")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        let val = m.val_loss.map(|v| format!("{v:.6}")).unwrap_or_default();
        writeln!(f, "{},{:.6},{}", m.epoch, m.train_loss, val)?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:?}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_appended_under_one_header() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 3.1245, Some(3.0892))).unwrap();
        logger.log(&EpochMetrics::new(2, 2.8901, None)).unwrap();

        let csv = fs::read_to_string(&logger.csv_path).unwrap();
        assert_eq!(
            csv,
            "epoch,train_loss,val_loss\n1,3.124500,3.089200\n2,2.890100,\n"
        );
    }
}
