// ============================================================
// Layer 4 — DataLoader Construction
// ============================================================
// Wraps a partition in Burn's DataLoader.
//
//   train  → seeded shuffle every epoch
//   val    → in order
//   test   → in order
//
// The loader is generic over the backend: training uses the
// autodiff backend, evaluation uses the inner backend so no
// gradient graph is built.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::{
    batcher::{EegBatch, EegBatcher},
    dataset::{EegDataset, EegItem},
};

#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    pub batch_size:  usize,
    pub num_workers: usize,
    pub seed:        u64,
}

/// Shuffling loader for the training partition.
pub fn train_loader<B: Backend>(
    dataset: EegDataset,
    device:  &B::Device,
    cfg:     LoaderConfig,
) -> Arc<dyn DataLoader<EegBatch<B>>> {
    let batcher = EegBatcher::<B>::new(device.clone(), dataset.shape());
    let builder = DataLoaderBuilder::new(batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed);
    with_workers(builder, cfg.num_workers).build(dataset)
}

/// In-order loader for validation and test.
pub fn eval_loader<B: Backend>(
    dataset: EegDataset,
    device:  &B::Device,
    cfg:     LoaderConfig,
) -> Arc<dyn DataLoader<EegBatch<B>>> {
    let batcher = EegBatcher::<B>::new(device.clone(), dataset.shape());
    let builder = DataLoaderBuilder::new(batcher).batch_size(cfg.batch_size);
    with_workers(builder, cfg.num_workers).build(dataset)
}

// 0 workers batches on the calling thread
fn with_workers<B: Backend>(
    builder:     DataLoaderBuilder<EegItem, EegBatch<B>>,
    num_workers: usize,
) -> DataLoaderBuilder<EegItem, EegBatch<B>> {
    if num_workers > 0 {
        builder.num_workers(num_workers)
    } else {
        builder
    }
}

/// Number of batches one pass over `len` items yields.
pub fn batches_per_epoch(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{tests::{synthetic_config, synthetic_inputs}, SegmentPool};
    use crate::domain::partition::Partition;
    use burn::{backend::NdArray, data::dataset::Dataset};

    type B = NdArray;

    fn cfg() -> LoaderConfig {
        LoaderConfig { batch_size: 5, num_workers: 0, seed: 3 }
    }

    #[test]
    fn test_train_loader_covers_partition_once() {
        let (rec, table) = synthetic_inputs();
        let pool  = SegmentPool::build(&rec, &table, &synthetic_config()).unwrap();
        let train = pool.partition(Partition::Train).unwrap();
        let n     = train.len();

        let loader = train_loader::<B>(train, &Default::default(), cfg());
        let mut seen = 0;
        let mut batches = 0;
        for batch in loader.iter() {
            assert_eq!(&batch.signals.dims()[1..], &[8, 2, 200]);
            seen += batch.labels.dims()[0];
            batches += 1;
        }
        assert_eq!(seen, n);
        assert_eq!(batches, batches_per_epoch(n, 5));
    }

    #[test]
    fn test_eval_loader_keeps_order() {
        let (rec, table) = synthetic_inputs();
        let pool = SegmentPool::build(&rec, &table, &synthetic_config()).unwrap();
        let test = pool.partition(Partition::Test).unwrap();
        let expected: Vec<i64> = test.items().iter().map(|it| it.label as i64).collect();

        let loader = eval_loader::<B>(test, &Default::default(), cfg());
        let labels: Vec<i64> = loader
            .iter()
            .flat_map(|b| b.labels.into_data().to_vec::<i64>().unwrap())
            .collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn test_batches_per_epoch() {
        assert_eq!(batches_per_epoch(12, 5), 3);
        assert_eq!(batches_per_epoch(10, 5), 2);
        assert_eq!(batches_per_epoch(0, 5), 0);
    }
}
