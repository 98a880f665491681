// ============================================================
// Layer 4 — EEG Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<EegItem>
// into device tensors.
//
// How batching works here:
//   Input:  Vec of N EegItems, each a flat [C, P, patch] signal
//   Output: EegBatch with signals [N, C, P, patch] and labels [N]
//
//   All signals are flattened into one long Vec, then reshaped:
//   [s1..., s2..., ..., sN...] → [N, C, P, patch]
//
// Every segment in the pool has the same shape, so no padding
// is needed.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::{dataset::EegItem, segmenter::SegmentShape};

// ─── EegBatch ─────────────────────────────────────────────────────────────────
/// A batch of segments ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct EegBatch<B: Backend> {
    /// shape: [batch_size, channels, patches, patch_size]
    pub signals: Tensor<B, 4>,

    /// Binary targets — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

// ─── EegBatcher ───────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct EegBatcher<B: Backend> {
    pub device: B::Device,
    pub shape:  SegmentShape,
}

impl<B: Backend> EegBatcher<B> {
    pub fn new(device: B::Device, shape: SegmentShape) -> Self {
        Self { device, shape }
    }
}

impl<B: Backend> Batcher<EegItem, EegBatch<B>> for EegBatcher<B> {
    fn batch(&self, items: Vec<EegItem>) -> EegBatch<B> {
        let batch_size = items.len();
        let [channels, patches, patch_size] = self.shape.dims();

        let signal_flat: Vec<f32> = items
            .iter()
            .flat_map(|it| it.signal.iter().copied())
            .collect();

        let labels: Vec<i32> = items.iter().map(|it| it.label as i32).collect();

        let signals = Tensor::<B, 1>::from_floats(signal_flat.as_slice(), &self.device)
            .reshape([batch_size, channels, patches, patch_size]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        EegBatch { signals, labels }
    }
}
