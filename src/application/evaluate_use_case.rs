// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Re-scores a saved model on one partition:
//
//   Step 1: Load finetune_config.json   (Layer 6 - infra)
//   Step 2: Rebuild the segment pool    (Layer 4 - data)
//           same seed → same partitions as training
//   Step 3: Rebuild the model, load its weights
//   Step 4: Run the evaluator           (Layer 5 - ml)

use anyhow::Result;
use std::path::PathBuf;

use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};

use crate::application::finetune_use_case::{DeviceKind, FinetuneConfig};
use crate::data::{
    dataloader::eval_loader,
    dataset::{EegDataset, SegmentPool},
    loader::DirectoryLoader,
};
use crate::domain::{metrics::BinaryMetrics, partition::Partition};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{evaluator::evaluate, model::EegClassifier};

#[derive(Debug, Clone)]
pub struct EvaluateRequest {
    pub model_dir:  PathBuf,
    /// Weights file; the run's best checkpoint when `None`
    pub checkpoint: Option<PathBuf>,
    pub partition:  Partition,
    /// Overrides the data directory stored in the run config
    pub data_dir:   Option<PathBuf>,
    /// Overrides the device stored in the run config
    pub device:     Option<DeviceKind>,
}

pub struct EvaluateUseCase {
    request: EvaluateRequest,
}

impl EvaluateUseCase {
    pub fn new(request: EvaluateRequest) -> Self {
        Self { request }
    }

    pub fn execute(&self) -> Result<BinaryMetrics> {
        let req  = &self.request;
        let ckpt = CheckpointManager::new(&req.model_dir)?;

        // ── Step 1: The run's own configuration ───────────────────────────────
        let mut cfg = ckpt.load_config()?;
        if let Some(dir) = &req.data_dir {
            cfg.data_dir = dir.clone();
        }
        let device = req.device.unwrap_or(cfg.device);

        // ── Step 2: Same pool, same partitions ────────────────────────────────
        let loader  = DirectoryLoader::new(&cfg.data_dir);
        let pool    = SegmentPool::from_sources(&loader, &loader, &cfg.pool_config())?;
        let dataset = pool.partition(req.partition)?;
        tracing::info!(
            "Evaluating {} segments of the {} partition",
            burn::data::dataset::Dataset::len(&dataset),
            req.partition
        );

        // ── Steps 3-4 ─────────────────────────────────────────────────────────
        match device {
            DeviceKind::Cpu  => score_partition::<NdArray>(&cfg, &ckpt, req, dataset, &NdArrayDevice::default()),
            DeviceKind::Wgpu => score_partition::<Wgpu>(&cfg, &ckpt, req, dataset, &WgpuDevice::default()),
        }
    }
}

fn score_partition<B: Backend>(
    cfg:     &FinetuneConfig,
    ckpt:    &CheckpointManager,
    req:     &EvaluateRequest,
    dataset: EegDataset,
    device:  &B::Device,
) -> Result<BinaryMetrics> {
    let model: EegClassifier<B> = cfg.model_config(dataset.shape()).init(device);
    let model = ckpt.load_model(model, req.checkpoint.as_deref(), device)?;

    let loader = eval_loader::<B>(dataset, device, cfg.loader_config());
    evaluate(&model, &loader)
}
