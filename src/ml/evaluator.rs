// ============================================================
// Layer 5 — Evaluator
// ============================================================
// One pass over a loader with the inference model:
//
//   logits → sigmoid → score ∈ (0, 1)
//   predicted label = score > 0.5
//
// Scores and truths are gathered on the host and handed to
// BinaryMetrics (balanced accuracy, PR-AUC, ROC-AUC, confusion).
//
// Callers pass a model on a non-autodiff backend (model.valid()),
// so no gradient graph is built here.

use std::sync::Arc;

use anyhow::Result;
use burn::{
    data::dataloader::DataLoader,
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::data::batcher::EegBatch;
use crate::domain::metrics::BinaryMetrics;
use crate::ml::model::EegClassifier;

/// Truths and sigmoid scores, in loader order.
#[derive(Debug, Default, Clone)]
pub struct ScoredPartition {
    pub truths: Vec<u8>,
    pub scores: Vec<f32>,
}

impl ScoredPartition {
    pub fn metrics(&self) -> BinaryMetrics {
        BinaryMetrics::from_scores(&self.truths, &self.scores)
    }
}

pub fn score<B: Backend>(
    model:  &EegClassifier<B>,
    loader: &Arc<dyn DataLoader<EegBatch<B>>>,
) -> Result<ScoredPartition> {
    let mut out = ScoredPartition::default();

    for batch in loader.iter() {
        let scores = sigmoid(model.forward(batch.signals));

        let scores = scores
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("score readback: {e:?}"))?;
        let truths = batch
            .labels
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| anyhow::anyhow!("label readback: {e:?}"))?;

        out.scores.extend(scores);
        out.truths.extend(truths.into_iter().map(|t| u8::from(t != 0)));
    }

    Ok(out)
}

pub fn evaluate<B: Backend>(
    model:  &EegClassifier<B>,
    loader: &Arc<dyn DataLoader<EegBatch<B>>>,
) -> Result<BinaryMetrics> {
    Ok(score(model, loader)?.metrics())
}
