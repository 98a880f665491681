// ============================================================
// Layer 4 — Segment Pool and Partition Datasets
// ============================================================
// Builds the full pool of labelled segments once, eagerly:
//
//   labels per subject     (task label strategy)
//       │
//   balance subjects       (equal subjects per class)
//       │
//   select channels        (unknown names fail here)
//       │
//   high-pass filter       (optional)
//       │
//   segment + patch        ([C, P, patch_size] per segment)
//       │
//   broadcast labels / subject ids to segments
//       │
//   seeded stratified shuffle
//
// The pool is immutable afterwards. Each partition is cut from
// it as an EegDataset, which implements Burn's Dataset trait so
// the DataLoader can call .get(index) and .len() on it.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::{
    balancer::balance_subjects,
    filter::highpass_inplace,
    segmenter::{SegmentShape, Segmenter},
    splitter::stratified_order,
};
use crate::domain::{
    error::PipelineError,
    partition::Partition,
    recording::Recordings,
    subject::Demographics,
    task::DownstreamTask,
    traits::{DemographicSource, RecordingSource},
};

/// Everything that decides which segments end up in the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub channels:        Vec<String>,
    pub task:            DownstreamTask,
    /// High-pass cutoff in Hz; `None` skips filtering
    pub highpass:        Option<f64>,
    pub segment_size:    usize,
    pub patch_size:      usize,
    /// Overrides the sampling rate stored in the recordings file
    pub sfreq:           Option<f64>,
    pub seed:            u64,
}

/// One model input: a patched segment with its label and subject.
#[derive(Debug, Clone, PartialEq)]
pub struct EegItem {
    /// Flat [channels, patches, patch_size]
    pub signal:  Vec<f32>,
    pub label:   u8,
    pub subject: usize,
}

// ─── SegmentPool ──────────────────────────────────────────────────────────────
pub struct SegmentPool {
    shape:       SegmentShape,
    signals:     Vec<Vec<f32>>,
    labels:      Vec<u8>,
    subject_ids: Vec<usize>,
    /// Subject names after balancing; `subject_ids` index into this
    subjects:    Vec<String>,
}

impl SegmentPool {
    /// Load both inputs through their sources and build the pool.
    pub fn from_sources(
        recordings: &impl RecordingSource,
        table:      &impl DemographicSource,
        cfg:        &PoolConfig,
    ) -> Result<Self> {
        let recordings = recordings.load_recordings()?;
        let table      = table.load_demographics(cfg.task)?;
        Ok(Self::build(&recordings, &table, cfg)?)
    }

    pub fn build(
        recordings: &Recordings,
        table:      &Demographics,
        cfg:        &PoolConfig,
    ) -> Result<Self, PipelineError> {
        // Geometry first so a bad configuration fails before any heavy work
        let segmenter = Segmenter::new(cfg.segment_size, cfg.patch_size)?;

        let subject_labels = cfg.task.labels_for(recordings.subjects(), table)?;
        let balanced = balance_subjects(&subject_labels)?;

        let selected = recordings.select(&balanced.indices, &cfg.channels)?;
        let subjects = selected.subjects().to_vec();
        let sfreq    = cfg.sfreq.unwrap_or(selected.sfreq());
        let mut data = selected.into_data();

        if let Some(cutoff) = cfg.highpass {
            highpass_inplace(&mut data, cutoff, sfreq)?;
        }

        let segments = segmenter.segment(&data)?;
        let per_subject = segmenter.segments_per_recording(data.dim().2);

        let mut labels      = Vec::with_capacity(segments.len());
        let mut subject_ids = Vec::with_capacity(segments.len());
        for (subject, &label) in balanced.labels.iter().enumerate() {
            labels.extend(std::iter::repeat(label).take(per_subject));
            subject_ids.extend(std::iter::repeat(subject).take(per_subject));
        }

        // signals, labels and subject ids move together
        let order = stratified_order(&labels, cfg.seed);
        let mut slots: Vec<Option<Vec<f32>>> = segments.into_iter().map(Some).collect();
        let signals: Vec<Vec<f32>> = order.iter().filter_map(|&i| slots[i].take()).collect();
        let labels:      Vec<u8>    = order.iter().map(|&i| labels[i]).collect();
        let subject_ids: Vec<usize> = order.iter().map(|&i| subject_ids[i]).collect();

        let total = signals.len();
        for p in Partition::ALL {
            p.checked_range(total)?;
        }

        let pool = Self {
            shape: segmenter.shape(cfg.channels.len()),
            signals,
            labels,
            subject_ids,
            subjects,
        };
        tracing::info!(
            "Segment pool: {} segments from {} subjects, shape {:?}",
            pool.len(),
            pool.subjects.len(),
            pool.shape.dims()
        );
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn shape(&self) -> SegmentShape {
        self.shape
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn subject_ids(&self) -> &[usize] {
        &self.subject_ids
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    /// Copy one partition out of the pool.
    pub fn partition(&self, partition: Partition) -> Result<EegDataset, PipelineError> {
        let range = partition.checked_range(self.len())?;
        let items = range
            .map(|i| EegItem {
                signal:  self.signals[i].clone(),
                label:   self.labels[i],
                subject: self.subject_ids[i],
            })
            .collect();
        Ok(EegDataset { partition, shape: self.shape, items })
    }

    /// Consume the pool into its three partitions without copying signals.
    pub fn into_splits(self) -> Result<Splits, PipelineError> {
        let total = self.len();
        let shape = self.shape;
        let mut items = self
            .signals
            .into_iter()
            .zip(self.labels)
            .zip(self.subject_ids)
            .map(|((signal, label), subject)| EegItem { signal, label, subject });

        // partitions are consecutive slices starting at 0
        let mut take = |partition: Partition| -> Result<EegDataset, PipelineError> {
            let range = partition.checked_range(total)?;
            let items = items.by_ref().take(range.len()).collect();
            Ok(EegDataset { partition, shape, items })
        };
        Ok(Splits {
            train: take(Partition::Train)?,
            val:   take(Partition::Val)?,
            test:  take(Partition::Test)?,
        })
    }
}

pub struct Splits {
    pub train: EegDataset,
    pub val:   EegDataset,
    pub test:  EegDataset,
}

// ─── EegDataset ───────────────────────────────────────────────────────────────
pub struct EegDataset {
    partition: Partition,
    shape:     SegmentShape,
    items:     Vec<EegItem>,
}

impl EegDataset {
    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn shape(&self) -> SegmentShape {
        self.shape
    }

    pub fn items(&self) -> &[EegItem] {
        &self.items
    }

    /// Segment counts for label 0 and label 1.
    pub fn label_counts(&self) -> [usize; 2] {
        let ones = self.items.iter().filter(|it| it.label != 0).count();
        [self.items.len() - ones, ones]
    }

    /// `n / (2 · count)` per label; 0 for an absent label.
    pub fn class_weights(&self) -> [f64; 2] {
        let n = self.items.len() as f64;
        self.label_counts()
            .map(|c| if c == 0 { 0.0 } else { n / (2.0 * c as f64) })
    }
}

impl Dataset<EegItem> for EegDataset {
    fn get(&self, index: usize) -> Option<EegItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::subject::SubjectInfo;
    use ndarray::Array3;
    use std::collections::HashSet;

    pub(crate) const CHANNELS: [&str; 8] = ["O1", "O2", "F1", "F2", "C1", "C2", "P1", "P2"];

    /// 4 subjects × 8 channels × 2048 samples; gender labels [0, 0, 1, 1].
    /// Every sample of subject s equals s, so segments reveal their subject.
    pub(crate) fn synthetic_inputs() -> (Recordings, Demographics) {
        let data = Array3::from_shape_fn((4, 8, 2048), |(s, _, _)| s as f32);
        let subjects: Vec<String> = (0..4).map(|i| format!("sub-{i}")).collect();
        let channels: Vec<String> = CHANNELS.iter().map(|c| c.to_string()).collect();
        let recordings = Recordings::new(subjects.clone(), channels, 128.0, data).unwrap();
        let table = Demographics::new(vec![
            SubjectInfo::new("sub-0", "20-25", 1),
            SubjectInfo::new("sub-1", "25-30", 1),
            SubjectInfo::new("sub-2", "60-65", 2),
            SubjectInfo::new("sub-3", "70-75", 2),
        ]);
        (recordings, table)
    }

    pub(crate) fn synthetic_config() -> PoolConfig {
        PoolConfig {
            channels:     CHANNELS.iter().map(|c| c.to_string()).collect(),
            task:         DownstreamTask::Gender,
            highpass:     None,
            segment_size: 512,
            patch_size:   200,
            sfreq:        None,
            seed:         42,
        }
    }

    struct InMemory(Recordings, Demographics);

    impl RecordingSource for InMemory {
        fn load_recordings(&self) -> Result<Recordings> {
            Ok(self.0.clone())
        }
    }

    impl DemographicSource for InMemory {
        fn load_demographics(&self, _task: DownstreamTask) -> Result<Demographics> {
            Ok(self.1.clone())
        }
    }

    #[test]
    fn test_pool_from_sources() {
        let (rec, table) = synthetic_inputs();
        let source = InMemory(rec, table);
        let pool = SegmentPool::from_sources(&source, &source, &synthetic_config()).unwrap();
        assert_eq!(pool.len(), 16);
        assert_eq!(pool.subjects().len(), 4);
    }

    #[test]
    fn test_synthetic_train_partition_is_balanced() {
        let (rec, table) = synthetic_inputs();
        let pool  = SegmentPool::build(&rec, &table, &synthetic_config()).unwrap();
        assert_eq!(pool.len(), 16);
        assert_eq!(pool.shape().dims(), [8, 2, 200]);

        let train = pool.partition(Partition::Train).unwrap();
        assert!(train.len() > 0);
        let [zeros, ones] = train.label_counts();
        assert_eq!(zeros, ones);
        assert_eq!(train.class_weights(), [1.0, 1.0]);
    }

    #[test]
    fn test_partitions_are_disjoint_and_exhaustive() {
        let (rec, table) = synthetic_inputs();
        let pool   = SegmentPool::build(&rec, &table, &synthetic_config()).unwrap();
        let total  = pool.len();

        // pool positions covered by each partition never repeat
        let mut seen = HashSet::new();
        for p in Partition::ALL {
            for i in p.range(total) {
                assert!(seen.insert(i));
            }
        }
        assert_eq!(seen.len(), total);

        let test = pool.partition(Partition::Test).unwrap();
        let splits = pool.into_splits().unwrap();
        assert_eq!(splits.train.len() + splits.val.len() + splits.test.len(), total);
        // moving out gives the same items as copying out
        assert_eq!(splits.test.items(), test.items());
        assert_eq!(splits.val.partition(), Partition::Val);
    }

    #[test]
    fn test_same_seed_same_partitions() {
        let (rec, table) = synthetic_inputs();
        let a = SegmentPool::build(&rec, &table, &synthetic_config()).unwrap();
        let b = SegmentPool::build(&rec, &table, &synthetic_config()).unwrap();
        assert_eq!(a.labels(), b.labels());
        assert_eq!(a.subject_ids(), b.subject_ids());
        assert_eq!(
            a.partition(Partition::Test).unwrap().items(),
            b.partition(Partition::Test).unwrap().items()
        );
    }

    #[test]
    fn test_subject_ids_follow_their_segments() {
        let (rec, table) = synthetic_inputs();
        let pool = SegmentPool::build(&rec, &table, &synthetic_config()).unwrap();
        for p in Partition::ALL {
            for item in pool.partition(p).unwrap().items() {
                // sub-s was filled with the value s, and balancing kept the order
                let expected = pool.subjects()[item.subject].trim_start_matches("sub-");
                assert!(item.signal.iter().all(|&v| v.to_string() == expected));
                assert_eq!(item.label, u8::from(item.subject >= 2));
            }
        }
    }

    #[test]
    fn test_imbalanced_subjects_are_downsampled() {
        let (rec, _) = synthetic_inputs();
        // make sub-1 male as well → 1 female vs 3 male
        let table = Demographics::new(vec![
            SubjectInfo::new("sub-0", "20-25", 1),
            SubjectInfo::new("sub-1", "25-30", 2),
            SubjectInfo::new("sub-2", "60-65", 2),
            SubjectInfo::new("sub-3", "70-75", 2),
        ]);
        let mut cfg = synthetic_config();
        cfg.segment_size = 200;
        let pool = SegmentPool::build(&rec, &table, &cfg).unwrap();
        assert_eq!(pool.subjects(), &["sub-0".to_string(), "sub-1".to_string()]);
        let ones = pool.labels().iter().filter(|&&l| l == 1).count();
        assert_eq!(ones * 2, pool.len());
    }

    #[test]
    fn test_too_few_segments_is_a_configuration_error() {
        let (rec, table) = synthetic_inputs();
        let mut cfg = synthetic_config();
        cfg.segment_size = 2048; // one segment per subject → val is ⌊3.2⌋..⌊3.6⌋
        let err = SegmentPool::build(&rec, &table, &cfg).err().unwrap();
        assert_eq!(err, PipelineError::EmptyPartition { partition: "val", total: 4 });
    }

    #[test]
    fn test_unknown_channel_fails_before_segmenting() {
        let (rec, table) = synthetic_inputs();
        let mut cfg = synthetic_config();
        cfg.channels.push("Fz".to_string());
        let err = SegmentPool::build(&rec, &table, &cfg).err().unwrap();
        assert_eq!(err, PipelineError::UnknownChannel("Fz".to_string()));
    }

    #[test]
    fn test_highpass_runs_inside_the_pipeline() {
        let (rec, table) = synthetic_inputs();
        let mut cfg = synthetic_config();
        cfg.highpass = Some(0.5);
        let pool = SegmentPool::build(&rec, &table, &cfg).unwrap();
        // constant per-subject signals are pure DC and vanish
        let train = pool.partition(Partition::Train).unwrap();
        assert!(train.items().iter().all(|it| it.signal.iter().all(|v| v.abs() < 1e-3)));
    }
}
