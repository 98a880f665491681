// ============================================================
// Layer 2 — FinetuneUseCase
// ============================================================
// Orchestrates the full fine-tuning run in order:
//
//   Step 1: Validate the configuration      (Layer 2)
//   Step 2: Save config next to checkpoints (Layer 6 - infra)
//   Step 3: Build the segment pool          (Layer 4 - data)
//   Step 4: Cut train / val / test          (Layer 4 - data)
//   Step 5: Run the training loop           (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};

use crate::data::{
    dataloader::LoaderConfig,
    dataset::{PoolConfig, SegmentPool},
    loader::DirectoryLoader,
    segmenter::{SegmentShape, DEFAULT_PATCH_SIZE},
};
use crate::domain::{error::PipelineError, task::DownstreamTask};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    model::EegClassifierConfig,
    trainer::{run_finetune, FinetuneReport},
};

pub const DEFAULT_CHANNELS: [&str; 8] = ["O1", "O2", "F1", "F2", "C1", "C2", "P1", "P2"];

// ─── Device / optimizer choices ───────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// ndarray backend on the host
    Cpu,
    Wgpu,
}

impl FromStr for DeviceKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" | "ndarray" => Ok(DeviceKind::Cpu),
            "wgpu" | "gpu"    => Ok(DeviceKind::Wgpu),
            _ => Err(PipelineError::UnknownDevice(s.to_string())),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceKind::Cpu  => "cpu",
            DeviceKind::Wgpu => "wgpu",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// decoupled weight decay
    AdamW,
    /// momentum 0.9
    Sgd,
}

impl FromStr for OptimizerKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "adamw" => Ok(OptimizerKind::AdamW),
            "sgd"   => Ok(OptimizerKind::Sgd),
            _ => Err(PipelineError::UnknownOptimizer(s.to_string())),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptimizerKind::AdamW => "adamw",
            OptimizerKind::Sgd   => "sgd",
        })
    }
}

// ─── Fine-tuning Configuration ────────────────────────────────────────────────
// All settings for one run. Serialisable so `evaluate` can reload
// it and rebuild the same model and the same partitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinetuneConfig {
    pub data_dir:        PathBuf,
    pub model_dir:       PathBuf,
    pub device:          DeviceKind,
    pub seed:            u64,
    pub num_workers:     usize,

    // ── dataset ──
    pub channels:        Vec<String>,
    pub downstream_task: DownstreamTask,
    /// High-pass cutoff in Hz; `None` disables filtering
    pub highpass_cutoff: Option<f64>,
    pub segment_size:    usize,
    pub patch_size:      usize,
    /// Overrides the sampling rate stored in the recordings file
    pub sfreq:           Option<f64>,

    // ── optimisation ──
    pub batch_size:      usize,
    pub optimizer:       OptimizerKind,
    pub lr:              f64,
    pub weight_decay:    f64,
    /// Gradient-norm clip; 0 disables clipping
    pub clip_value:      f64,
    pub epochs:          usize,
    pub frozen:          bool,
    /// Head parameters at 5 × lr, backbone at lr
    pub multi_lr:        bool,
    pub label_smoothing: f64,

    // ── model ──
    pub pretrained:      Option<PathBuf>,
    pub d_model:         usize,
    pub num_heads:       usize,
    pub num_layers:      usize,
    pub d_ff:            usize,
    pub dropout:         f64,
}

impl Default for FinetuneConfig {
    fn default() -> Self {
        Self {
            data_dir:        PathBuf::from("data/LEMON"),
            model_dir:       PathBuf::from("checkpoints"),
            device:          DeviceKind::Cpu,
            seed:            3407,
            num_workers:     1,

            channels:        DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
            downstream_task: DownstreamTask::Age,
            highpass_cutoff: Some(0.5),
            segment_size:    512,
            patch_size:      DEFAULT_PATCH_SIZE,
            sfreq:           None,

            batch_size:      32,
            optimizer:       OptimizerKind::AdamW,
            lr:              1e-4,
            weight_decay:    5e-2,
            clip_value:      1.0,
            epochs:          50,
            frozen:          false,
            multi_lr:        false,
            label_smoothing: 0.1,

            pretrained:      None,
            d_model:         200,
            num_heads:       8,
            num_layers:      4,
            d_ff:            800,
            dropout:         0.1,
        }
    }
}

impl FinetuneConfig {
    /// Reject settings no run could succeed with, before any I/O.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let bad = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if self.channels.is_empty() {
            return bad("at least one channel is required".into());
        }
        if self.patch_size == 0 || self.segment_size < self.patch_size {
            return Err(PipelineError::SegmentShorterThanPatch {
                segment_size: self.segment_size,
                patch_size:   self.patch_size,
            });
        }
        if let Some(cutoff) = self.highpass_cutoff {
            if !(cutoff > 0.0) {
                return bad(format!("high-pass cutoff must be positive, got {cutoff}"));
            }
        }
        if self.batch_size == 0 {
            return bad("batch size must be at least 1".into());
        }
        if self.epochs == 0 {
            return bad("epochs must be at least 1".into());
        }
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            return bad(format!("learning rate must be positive, got {}", self.lr));
        }
        if self.weight_decay < 0.0 || self.clip_value < 0.0 {
            return bad("weight decay and clip value must be non-negative".into());
        }
        if !(0.0..1.0).contains(&self.label_smoothing) {
            return bad(format!("label smoothing must be in [0, 1), got {}", self.label_smoothing));
        }
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            return bad(format!(
                "d_model ({}) must be divisible by num_heads ({})",
                self.d_model, self.num_heads
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return bad(format!("dropout must be in [0, 1), got {}", self.dropout));
        }
        Ok(())
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            channels:     self.channels.clone(),
            task:         self.downstream_task,
            highpass:     self.highpass_cutoff,
            segment_size: self.segment_size,
            patch_size:   self.patch_size,
            sfreq:        self.sfreq,
            seed:         self.seed,
        }
    }

    /// Global gradient-norm bound, `None` when clipping is off.
    pub fn clip_norm(&self) -> Option<f64> {
        (self.clip_value > 0.0).then_some(self.clip_value)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size:  self.batch_size,
            num_workers: self.num_workers,
            seed:        self.seed,
        }
    }

    pub fn model_config(&self, shape: SegmentShape) -> EegClassifierConfig {
        EegClassifierConfig::new(
            shape.channels, shape.patches, shape.patch_size,
            self.d_model, self.num_heads, self.num_layers, self.d_ff, self.dropout,
        )
    }
}

// ─── FinetuneUseCase ──────────────────────────────────────────────────────────
pub struct FinetuneUseCase {
    config: FinetuneConfig,
}

impl FinetuneUseCase {
    pub fn new(config: FinetuneConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<FinetuneReport> {
        let cfg = &self.config;

        // ── Step 1: Fail fast on impossible settings ──────────────────────────
        cfg.validate()?;

        // ── Step 2: Save config so `evaluate` can rebuild the run ────────────
        let ckpt = CheckpointManager::new(&cfg.model_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 3: Build the segment pool (eager, once) ──────────────────────
        tracing::info!(
            "Building {} dataset from '{}'",
            cfg.downstream_task,
            cfg.data_dir.display()
        );
        let loader = DirectoryLoader::new(&cfg.data_dir);
        let pool   = SegmentPool::from_sources(&loader, &loader, &cfg.pool_config())?;

        // ── Step 4: Train / val / test ────────────────────────────────────────
        let splits = pool.into_splits()?;
        tracing::info!(
            "Split: {} train, {} validation, {} test",
            burn::data::dataset::Dataset::len(&splits.train),
            burn::data::dataset::Dataset::len(&splits.val),
            burn::data::dataset::Dataset::len(&splits.test),
        );

        // ── Step 5: Training loop (Layer 5) ───────────────────────────────────
        let report = match cfg.device {
            DeviceKind::Cpu => {
                let device = NdArrayDevice::default();
                tracing::info!("Using ndarray device: {:?}", device);
                run_finetune::<Autodiff<NdArray>>(cfg, splits, &ckpt, &device)?
            }
            DeviceKind::Wgpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                run_finetune::<Autodiff<Wgpu>>(cfg, splits, &ckpt, &device)?
            }
        };

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(FinetuneConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_geometry_and_heads() {
        let cfg = FinetuneConfig { segment_size: 100, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(PipelineError::SegmentShorterThanPatch { .. })));

        let cfg = FinetuneConfig { num_heads: 7, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(PipelineError::InvalidConfig(_))));

        let cfg = FinetuneConfig { label_smoothing: 1.0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg = FinetuneConfig {
            downstream_task: DownstreamTask::Upps,
            optimizer:       OptimizerKind::Sgd,
            highpass_cutoff: None,
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        assert!(json.contains("\"optimizer\": \"sgd\""));
        assert!(json.contains("\"downstream_task\": \"upps\""));
        let back: FinetuneConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_parse_choices() {
        assert_eq!("AdamW".parse::<OptimizerKind>().unwrap(), OptimizerKind::AdamW);
        assert_eq!("ndarray".parse::<DeviceKind>().unwrap(), DeviceKind::Cpu);
        assert_eq!(
            "rmsprop".parse::<OptimizerKind>().unwrap_err(),
            PipelineError::UnknownOptimizer("rmsprop".into())
        );
        assert_eq!("tpu".parse::<DeviceKind>().unwrap_err(), PipelineError::UnknownDevice("tpu".into()));
    }
}
