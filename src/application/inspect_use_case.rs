// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Builds the segment pool exactly as `train` would and reports
// what came out of it, without touching a model:
//
//   per partition: segment count, label counts, balanced class
//   weights n / (2 · count)
//
// A quick way to check channels, task and segment geometry
// against a data directory before a long run.

use anyhow::Result;
use serde::Serialize;
use std::fmt;

use burn::data::dataset::Dataset;

use crate::application::finetune_use_case::FinetuneConfig;
use crate::data::{dataset::SegmentPool, loader::DirectoryLoader, segmenter::SegmentShape};
use crate::domain::partition::Partition;

#[derive(Debug, Clone, Serialize)]
pub struct PartitionSummary {
    pub partition:     Partition,
    pub segments:      usize,
    pub label_counts:  [usize; 2],
    pub class_weights: [f64; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub subjects:   usize,
    pub segments:   usize,
    pub shape:      SegmentShape,
    pub partitions: Vec<PartitionSummary>,
}

impl DatasetSummary {
    pub fn from_pool(pool: &SegmentPool) -> Result<Self> {
        let partitions = Partition::ALL
            .iter()
            .map(|&p| -> Result<PartitionSummary> {
                let ds = pool.partition(p)?;
                Ok(PartitionSummary {
                    partition:     p,
                    segments:      ds.len(),
                    label_counts:  ds.label_counts(),
                    class_weights: ds.class_weights(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            subjects: pool.subjects().len(),
            segments: pool.len(),
            shape:    pool.shape(),
            partitions,
        })
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [c, p, s] = self.shape.dims();
        writeln!(f, "subjects: {}  segments: {}  x.shape = [n, {c}, {p}, {s}]", self.subjects, self.segments)?;
        for ps in &self.partitions {
            writeln!(
                f,
                "  {:<5} {:>6} segments | label 0: {:>5} | label 1: {:>5} | class weights: {{0: {:.4}, 1: {:.4}}}",
                ps.partition.as_str(),
                ps.segments,
                ps.label_counts[0],
                ps.label_counts[1],
                ps.class_weights[0],
                ps.class_weights[1],
            )?;
        }
        Ok(())
    }
}

pub struct InspectUseCase {
    config: FinetuneConfig,
}

impl InspectUseCase {
    pub fn new(config: FinetuneConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<DatasetSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        let loader = DirectoryLoader::new(&cfg.data_dir);
        let pool   = SegmentPool::from_sources(&loader, &loader, &cfg.pool_config())?;
        DatasetSummary::from_pool(&pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::{synthetic_config, synthetic_inputs};

    #[test]
    fn test_summary_of_synthetic_pool() {
        let (rec, table) = synthetic_inputs();
        let pool = SegmentPool::build(&rec, &table, &synthetic_config()).unwrap();
        let summary = DatasetSummary::from_pool(&pool).unwrap();

        assert_eq!(summary.subjects, 4);
        assert_eq!(summary.segments, 16);
        let sizes: Vec<usize> = summary.partitions.iter().map(|p| p.segments).collect();
        assert_eq!(sizes, vec![12, 2, 2]);
        assert_eq!(summary.partitions[0].label_counts, [6, 6]);
        assert!(summary.to_string().contains("x.shape = [n, 8, 2, 200]"));
    }
}
