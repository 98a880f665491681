// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full fine-tuning loop using Burn's DataLoader and AdamW / SGD.
//
// Per epoch:
//   TRAIN  for each batch:
//            forward → BCE-with-logits (label smoothing)
//            backward → clip the global gradient norm
//            → optimizer step → cosine LR step
//   EVAL   balanced accuracy on the validation partition with
//          model.valid() (inner backend, dropout off)
//
// The best epoch is an explicit maximum of validation balanced
// accuracy; ties keep the earlier epoch. Its inference model is
// kept by value, evaluated on the test partition after the last
// epoch and written to disk under a name carrying its metrics.
//
// Differential learning rate: the backbone's gradients are split
// off and stepped at lr, everything else at HEAD_LR_FACTOR · lr.
// Clipping happens before the split, over one norm for the whole
// model. A frozen backbone gets no gradients at all.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use std::{path::PathBuf, time::Instant};

use anyhow::{Context, Result};
use burn::{
    module::AutodiffModule,
    optim::{
        decay::WeightDecayConfig,
        momentum::MomentumConfig,
        AdamWConfig, GradientsParams, Optimizer, SgdConfig,
    },
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::finetune_use_case::{FinetuneConfig, OptimizerKind};
use crate::data::{
    dataloader::{batches_per_epoch, eval_loader, train_loader},
    dataset::Splits,
    segmenter::SegmentShape,
};
use crate::domain::{error::PipelineError, metrics::BinaryMetrics};
use crate::infra::{
    checkpoint::{checkpoint_name, load_backbone, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    evaluator::evaluate,
    grad_clip::{clip_grad_norm, split_off},
    model::EegClassifier,
    schedule::{CosineAnnealing, MIN_LR},
};

/// Non-backbone parameters learn this much faster under `multi_lr`.
pub const HEAD_LR_FACTOR: f64 = 5.0;

pub const SGD_MOMENTUM: f64 = 0.9;

/// What a finished run reports back to the caller.
#[derive(Debug, Clone)]
pub struct FinetuneReport {
    pub best_epoch:            usize,
    pub best_val_balanced_acc: f64,
    pub test:                  BinaryMetrics,
    pub checkpoint:            PathBuf,
    pub history:               Vec<EpochMetrics>,
}

struct BestModel<B: Backend> {
    epoch:   usize,
    val_acc: f64,
    model:   EegClassifier<B>,
}

pub fn run_finetune<B: AutodiffBackend>(
    cfg:    &FinetuneConfig,
    splits: Splits,
    ckpt:   &CheckpointManager,
    device: &B::Device,
) -> Result<FinetuneReport> {
    let model = build_model::<B>(cfg, splits.train.shape(), device)?;

    // Optimizer is generic over its state, so each choice
    // gets its own monomorphised loop.
    let (report, _) = match cfg.optimizer {
        OptimizerKind::AdamW => {
            let optim = AdamWConfig::new()
                .with_weight_decay(cfg.weight_decay as f32)
                .init();
            train_loop::<B, _>(cfg, model, splits, ckpt, device, optim)?
        }
        OptimizerKind::Sgd => {
            let momentum = MomentumConfig::new()
                .with_momentum(SGD_MOMENTUM)
                .with_dampening(0.0);
            let decay = (cfg.weight_decay > 0.0)
                .then(|| WeightDecayConfig::new(cfg.weight_decay as f32));
            let optim = SgdConfig::new()
                .with_momentum(Some(momentum))
                .with_weight_decay(decay)
                .init();
            train_loop::<B, _>(cfg, model, splits, ckpt, device, optim)?
        }
    };
    Ok(report)
}

/// Fresh classifier, with the pretrained backbone loaded and frozen
/// when the run asks for it.
fn build_model<B: AutodiffBackend>(
    cfg:    &FinetuneConfig,
    shape:  SegmentShape,
    device: &B::Device,
) -> Result<EegClassifier<B>> {
    let mut model: EegClassifier<B> = cfg.model_config(shape).init(device);

    if let Some(path) = &cfg.pretrained {
        model.backbone = load_backbone(model.backbone, path, device)?;
    }
    if cfg.frozen {
        model.backbone = model.backbone.no_grad();
        tracing::info!("Backbone frozen");
    }
    tracing::info!(
        "Model ready: {} layers, d_model={}, {} parameters",
        cfg.num_layers,
        cfg.d_model,
        model.num_params()
    );
    Ok(model)
}

/// One update from the gradients of a batch.
///
/// The clip sees every gradient at once; under `multi_lr` the
/// backbone's share is then stepped at `lr` and the rest at
/// `HEAD_LR_FACTOR · lr`.
fn optimizer_step<B, O>(
    optim:     &mut O,
    model:     EegClassifier<B>,
    mut grads: GradientsParams,
    lr:        f64,
    clip:      Option<f64>,
    multi_lr:  bool,
) -> EegClassifier<B>
where
    B: AutodiffBackend,
    O: Optimizer<EegClassifier<B>, B>,
{
    if let Some(max_norm) = clip {
        clip_grad_norm::<B, _>(&model, &mut grads, max_norm);
    }
    if multi_lr {
        let backbone_grads = split_off::<B, _>(&model.backbone, &mut grads);
        let model = optim.step(lr, model, backbone_grads);
        optim.step(lr * HEAD_LR_FACTOR, model, grads)
    } else {
        optim.step(lr, model, grads)
    }
}

/// Runs every epoch, then tests and saves the best one. The model
/// as it stands after the last step is handed back with the report.
fn train_loop<B, O>(
    cfg:       &FinetuneConfig,
    mut model: EegClassifier<B>,
    splits:    Splits,
    ckpt:      &CheckpointManager,
    device:    &B::Device,
    mut optim: O,
) -> Result<(FinetuneReport, EegClassifier<B>)>
where
    B: AutodiffBackend,
    O: Optimizer<EegClassifier<B>, B>,
{
    // ── Data loaders ──────────────────────────────────────────────────────────
    // validation / test run on the inner backend: no autodiff overhead
    let lc = cfg.loader_config();
    let n_batches = batches_per_epoch(burn::data::dataset::Dataset::len(&splits.train), lc.batch_size);
    let train_loader = train_loader::<B>(splits.train, device, lc);
    let val_loader   = eval_loader::<B::InnerBackend>(splits.val, device, lc);
    let test_loader  = eval_loader::<B::InnerBackend>(splits.test, device, lc);

    let mut schedule = CosineAnnealing::new(cfg.lr, cfg.epochs * n_batches, MIN_LR);
    let logger = MetricsLogger::new(ckpt.dir())?;

    let mut best: Option<BestModel<B::InnerBackend>> = None;
    let mut history = Vec::with_capacity(cfg.epochs);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let start = Instant::now();

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let lr = schedule.lr();
            let (loss, _) = model.forward_loss(
                batch.signals,
                batch.labels,
                cfg.label_smoothing as f32,
            );

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_batches += 1;
            if !loss_val.is_finite() {
                return Err(PipelineError::NonFiniteLoss {
                    loss:  loss_val,
                    epoch,
                    batch: train_batches,
                }
                .into());
            }
            train_loss_sum += loss_val;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer_step(&mut optim, model, grads, lr, cfg.clip_norm(), cfg.multi_lr);
            schedule.step();
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let val = evaluate(&model_valid, &val_loader)?;
        let elapsed = start.elapsed().as_secs_f64();

        println!(
            "Epoch {:>3}/{} | train_loss={:.5} | val_acc={:.5} | lr={:.7} | {:.2} mins",
            epoch, cfg.epochs, avg_train_loss, val.balanced_accuracy,
            schedule.lr(), elapsed / 60.0,
        );

        let row = EpochMetrics::new(epoch, avg_train_loss, val.balanced_accuracy, schedule.lr(), elapsed);
        logger.log(&row)?;

        if row.is_improvement(best.as_ref().map(|b| b.val_acc)) {
            tracing::info!("New best validation balanced accuracy {:.5} at epoch {}", row.val_balanced_acc, epoch);
            best = Some(BestModel { epoch, val_acc: row.val_balanced_acc, model: model_valid });
        }
        history.push(row);
    }

    // ── Test the best model ───────────────────────────────────────────────────
    let best = best.context("no epoch finished, so there is no model to test")?;
    let test = evaluate(&best.model, &test_loader)?;

    println!("*************************** Test results ***************************");
    println!(
        "Test Evaluation (best epoch {}): acc: {:.5}, pr_auc: {:.5}, roc_auc: {:.5}",
        best.epoch,
        test.balanced_accuracy,
        test.pr_auc_or_nan(),
        test.roc_auc_or_nan(),
    );
    println!("{}", test.confusion);

    let checkpoint = ckpt.save_model(&best.model, &checkpoint_name(best.epoch, &test))?;
    println!("model saved in {}", checkpoint.display());

    let report = FinetuneReport {
        best_epoch:            best.epoch,
        best_val_balanced_acc: best.val_acc,
        test,
        checkpoint,
        history,
    };
    Ok((report, model))
}
