// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights as gzipped named MessagePack
// records (Burn's file recorder, full precision).
//
// What gets saved:
//   1. Best model weights (.mpk.gz) — named after the test metrics
//   2. best_checkpoint.json         — name of the weights file
//   3. finetune_config.json         — run configuration
//
// The configuration carries the model dimensions, channel list and
// seed, so `evaluate` can rebuild the same model and the same
// partitions before loading the weights.
//
// File naming convention:
//   model_dir/
//     epoch{E}_acc_{A}_pr_{P}_roc_{R}.mpk.gz
//     best_checkpoint.json
//     finetune_config.json
//     metrics.csv
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::application::finetune_use_case::FinetuneConfig;
use crate::domain::metrics::BinaryMetrics;
use crate::ml::model::{EegClassifier, PatchBackbone};

pub const CONFIG_FILE:  &str = "finetune_config.json";
pub const POINTER_FILE: &str = "best_checkpoint.json";
const RECORD_SUFFIX:    &str = ".mpk.gz";

/// Same container as CompactRecorder, without the f16 rounding, so a
/// reloaded model scores exactly as it did when saved.
pub type WeightsRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// `epoch{E}_acc_{A}_pr_{P}_roc_{R}`, undefined AUCs printed as NaN.
pub fn checkpoint_name(best_epoch: usize, test: &BinaryMetrics) -> String {
    format!(
        "epoch{}_acc_{:.5}_pr_{:.5}_roc_{:.5}",
        best_epoch,
        test.balanced_accuracy,
        test.pr_auc_or_nan(),
        test.roc_auc_or_nan(),
    )
}

/// Path to hand to the recorder for a record stored at `path`.
///
/// The recorder swaps the last extension for "mpk.gz", and the
/// metric values in checkpoint names contain dots, so a throwaway
/// ".mpk" extension is appended for it to replace.
pub fn recorder_path(path: &Path) -> PathBuf {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file.strip_suffix(RECORD_SUFFIX).unwrap_or(&file);
    path.with_file_name(format!("{stem}.mpk"))
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create model directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save weights as `{name}.mpk.gz` and point best_checkpoint.json at it.
    pub fn save_model<B: Backend>(&self, model: &EegClassifier<B>, name: &str) -> Result<PathBuf> {
        let path = self.dir.join(format!("{name}{RECORD_SUFFIX}"));

        WeightsRecorder::new()
            .record(model.clone().into_record(), recorder_path(&path))
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let pointer = self.dir.join(POINTER_FILE);
        fs::write(&pointer, serde_json::to_string(name)?)
            .with_context(|| format!("Failed to write '{}'", pointer.display()))?;

        tracing::debug!("Saved checkpoint '{}'", path.display());
        Ok(path)
    }

    /// Load weights from `path`, or from the best checkpoint when `None`.
    ///
    /// `model` must have the architecture the record was saved with.
    pub fn load_model<B: Backend>(
        &self,
        model:  EegClassifier<B>,
        path:   Option<&Path>,
        device: &B::Device,
    ) -> Result<EegClassifier<B>> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None    => self.dir.join(format!("{}{RECORD_SUFFIX}", self.best_name()?)),
        };
        tracing::info!("Loading checkpoint '{}'", path.display());

        let record = WeightsRecorder::new()
            .load(recorder_path(&path), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;
        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &FinetuneConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<FinetuneConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'evaluate'.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    fn best_name(&self) -> Result<String> {
        let path = self.dir.join(POINTER_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str::<String>(&s)?)
    }
}

/// Load pretrained backbone weights saved with [`WeightsRecorder`].
pub fn load_backbone<B: Backend>(
    backbone: PatchBackbone<B>,
    path:     &Path,
    device:   &B::Device,
) -> Result<PatchBackbone<B>> {
    let record = WeightsRecorder::new()
        .load(recorder_path(path), device)
        .with_context(|| format!("Cannot load pretrained backbone '{}'", path.display()))?;
    tracing::info!("Loaded pretrained backbone from '{}'", path.display());
    Ok(backbone.load_record(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::ConfusionMatrix;
    use crate::ml::model::tests::tiny_config;
    use burn::backend::NdArray;

    type B = NdArray;

    /// Write backbone weights alone, in the format `load_backbone` reads.
    fn save_backbone<B: Backend>(backbone: &PatchBackbone<B>, path: &Path) {
        WeightsRecorder::new()
            .record(backbone.clone().into_record(), recorder_path(path))
            .unwrap();
    }

    #[test]
    fn test_checkpoint_name_format() {
        let m = BinaryMetrics {
            balanced_accuracy: 0.75,
            pr_auc:            Some(0.8),
            roc_auc:           None,
            confusion:         ConfusionMatrix::default(),
        };
        assert_eq!(checkpoint_name(3, &m), "epoch3_acc_0.75000_pr_0.80000_roc_NaN");
    }

    #[test]
    fn test_recorder_path_keeps_metric_digits() {
        let p = recorder_path(Path::new("/m/epoch3_acc_0.75000_pr_0.80000_roc_0.81250.mpk.gz"));
        assert_eq!(p, PathBuf::from("/m/epoch3_acc_0.75000_pr_0.80000_roc_0.81250.mpk"));
        let p = recorder_path(Path::new("/m/backbone"));
        assert_eq!(p, PathBuf::from("/m/backbone.mpk"));
    }

    #[test]
    fn test_save_and_reload_best_model() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let model: EegClassifier<B> = tiny_config(2, 2, 5).init(&device);
        let saved = ckpt.save_model(&model, "epoch1_acc_0.50000_pr_NaN_roc_NaN").unwrap();
        assert!(saved.exists());

        let signals = Tensor::<B, 4>::ones([1, 2, 2, 5], &device);
        let before: f32 = model.forward(signals.clone()).into_scalar();

        let fresh: EegClassifier<B> = tiny_config(2, 2, 5).init(&device);
        let loaded = ckpt.load_model(fresh, None, &device).unwrap();
        let after: f32 = loaded.forward(signals).into_scalar();
        assert!((before - after).abs() < 1e-6);
    }

    #[test]
    fn test_backbone_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backbone.mpk.gz");
        let device = Default::default();

        let model: EegClassifier<B> = tiny_config(2, 2, 5).init(&device);
        save_backbone(&model.backbone, &path);
        assert!(path.exists());

        let fresh = tiny_config(2, 2, 5).init_backbone::<B>(&device);
        let loaded = load_backbone(fresh, &path, &device).unwrap();

        let signals = Tensor::<B, 4>::ones([1, 2, 2, 5], &device);
        let diff = (model.backbone.forward(signals.clone()) - loaded.forward(signals))
            .abs()
            .max()
            .into_scalar();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_missing_pointer_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let fresh: EegClassifier<B> = tiny_config(2, 2, 5).init(&Default::default());
        let err = ckpt.load_model(fresh, None, &Default::default()).unwrap_err();
        assert!(err.to_string().contains("Have you run 'train' first?"));
    }
}
