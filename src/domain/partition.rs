// ============================================================
// Layer 3 — Partitions
// ============================================================
// The permuted segment pool is cut into three contiguous
// slices by cumulative proportion:
//
//   train: [0,        ⌊0.8·n⌋)
//   val:   [⌊0.8·n⌋,  ⌊0.9·n⌋)
//   test:  [⌊0.9·n⌋,  n)
//
// The boundaries are shared, so the three ranges never overlap
// and together cover 0..n.

use std::{fmt, ops::Range, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;

/// Cumulative partition ends, in tenths of the pool.
pub const TRAIN_END_TENTHS: usize = 8;
pub const VAL_END_TENTHS:   usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Train,
    Val,
    Test,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Train, Partition::Val, Partition::Test];

    /// Index range of this partition in a pool of `total` segments.
    pub fn range(&self, total: usize) -> Range<usize> {
        let train_end = total * TRAIN_END_TENTHS / 10;
        let val_end   = total * VAL_END_TENTHS / 10;
        match self {
            Partition::Train => 0..train_end,
            Partition::Val   => train_end..val_end,
            Partition::Test  => val_end..total,
        }
    }

    /// Like [`Partition::range`] but rejects an empty slice.
    pub fn checked_range(&self, total: usize) -> Result<Range<usize>, PipelineError> {
        let range = self.range(total);
        if range.is_empty() {
            return Err(PipelineError::EmptyPartition { partition: self.as_str(), total });
        }
        Ok(range)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Val   => "val",
            Partition::Test  => "test",
        }
    }
}

impl FromStr for Partition {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "train"                => Ok(Partition::Train),
            "val" | "validation"   => Ok(Partition::Val),
            "test"                 => Ok(Partition::Test),
            other => Err(PipelineError::InvalidConfig(format!("unknown partition '{other}'"))),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_cover_pool_without_overlap() {
        for total in [0usize, 1, 7, 10, 16, 99, 1000] {
            let mut covered = vec![0u8; total];
            for p in Partition::ALL {
                for i in p.range(total) {
                    covered[i] += 1;
                }
            }
            assert!(covered.iter().all(|&c| c == 1), "total={total}");
        }
    }

    #[test]
    fn test_ten_segments_split_8_1_1() {
        assert_eq!(Partition::Train.range(10), 0..8);
        assert_eq!(Partition::Val.range(10),   8..9);
        assert_eq!(Partition::Test.range(10),  9..10);
    }

    #[test]
    fn test_sixteen_segments() {
        assert_eq!(Partition::Train.range(16), 0..12);
        assert_eq!(Partition::Val.range(16),   12..14);
        assert_eq!(Partition::Test.range(16),  14..16);
    }

    #[test]
    fn test_boundaries_on_multiples_of_ten() {
        for tens in 1..=50usize {
            let total = tens * 10;
            assert_eq!(Partition::Train.range(total).len(), tens * 8);
            assert_eq!(Partition::Val.range(total).len(),   tens);
            assert_eq!(Partition::Test.range(total).len(),  tens);
        }
    }

    #[test]
    fn test_empty_partition_is_reported() {
        let err = Partition::Val.checked_range(5).unwrap_err();
        assert_eq!(err, PipelineError::EmptyPartition { partition: "val", total: 5 });
    }

    #[test]
    fn test_parse() {
        assert_eq!("Validation".parse::<Partition>().unwrap(), Partition::Val);
        assert!("holdout".parse::<Partition>().is_err());
    }
}
