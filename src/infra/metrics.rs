// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:            the epoch number (1, 2, 3, ...)
//   - train_loss:       mean BCE loss over the training batches
//   - val_balanced_acc: balanced accuracy on the validation set
//   - lr:               learning rate after the last batch
//   - elapsed_secs:     wall time of the epoch
//
// Output file: <model_dir>/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_balanced_acc,lr,elapsed_secs
//   1,0.693100,0.500000,0.000976,12.40
//   2,0.654300,0.625000,0.000905,12.10
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

pub const METRICS_FILE: &str = "metrics.csv";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Starts at 1
    pub epoch: usize,

    pub train_loss: f64,

    /// Range: [0.0, 1.0]; 0.5 is chance for a balanced set
    pub val_balanced_acc: f64,

    pub lr: f64,

    pub elapsed_secs: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:            usize,
        train_loss:       f64,
        val_balanced_acc: f64,
        lr:               f64,
        elapsed_secs:     f64,
    ) -> Self {
        Self { epoch, train_loss, val_balanced_acc, lr, elapsed_secs }
    }

    /// Strictly better than the best so far; a tie keeps the earlier epoch.
    pub fn is_improvement(&self, best_val_balanced_acc: Option<f64>) -> bool {
        match best_val_balanced_acc {
            None       => true,
            Some(best) => self.val_balanced_acc > best,
        }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so runs
    /// into the same directory append to one log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join(METRICS_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss,val_balanced_acc,lr,elapsed_secs")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.8},{:.2}",
            m.epoch,
            m.train_loss,
            m.val_balanced_acc,
            m.lr,
            m.elapsed_secs,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_acc={:.4}",
            m.epoch,
            m.train_loss,
            m.val_balanced_acc,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 0.6, 0.75, 1e-4, 3.0);
        assert!(m.is_improvement(None));
        assert!(m.is_improvement(Some(0.5)));
        // ties keep the earlier epoch
        assert!(!m.is_improvement(Some(0.75)));
        assert!(!m.is_improvement(Some(0.9)));
    }

    #[test]
    fn test_rows_are_appended_under_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.69, 0.5, 1e-3, 1.0)).unwrap();
        logger.log(&EpochMetrics::new(2, 0.65, 0.625, 5e-4, 1.0)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,val_balanced_acc,lr,elapsed_secs");
        assert!(lines[2].starts_with("2,0.650000,0.625000,"));
    }
}
