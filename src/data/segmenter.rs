// ============================================================
// Layer 4 — Segmenter
// ============================================================
// Cuts each subject's continuous [channels, time] signal into
// non-overlapping segments, then each segment into patches:
//
//   [C, T]  →  n_seg × [C, segment_size]  →  n_seg × [C, P, patch_size]
//
//   n_seg = ⌊T / segment_size⌋
//   P     = ⌊segment_size / patch_size⌋
//
// Samples that do not fill a whole segment are dropped at the end
// of the recording, and samples that do not fill a whole patch are
// dropped at the end of each segment. With segment_size = 512 and
// patch_size = 200 each segment keeps 2 patches (400 samples).
//
// Each segment is returned as a flat row-major Vec<f32> in
// [C, P, patch_size] order, ready for the batcher to stack.
//
// Segments are emitted subject-major: all segments of subject 0,
// then all of subject 1, ...

use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;

/// Default patch length in samples.
pub const DEFAULT_PATCH_SIZE: usize = 200;

/// Shape of one model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentShape {
    pub channels:   usize,
    pub patches:    usize,
    pub patch_size: usize,
}

impl SegmentShape {
    pub fn numel(&self) -> usize {
        self.channels * self.patches * self.patch_size
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.channels, self.patches, self.patch_size]
    }
}

pub struct Segmenter {
    segment_size: usize,
    patch_size:   usize,
}

impl Segmenter {
    /// Fails if a segment could not hold a single patch.
    pub fn new(segment_size: usize, patch_size: usize) -> Result<Self, PipelineError> {
        if patch_size == 0 || segment_size < patch_size {
            return Err(PipelineError::SegmentShorterThanPatch { segment_size, patch_size });
        }
        Ok(Self { segment_size, patch_size })
    }

    pub fn patches_per_segment(&self) -> usize {
        self.segment_size / self.patch_size
    }

    pub fn segments_per_recording(&self, n_times: usize) -> usize {
        n_times / self.segment_size
    }

    pub fn shape(&self, channels: usize) -> SegmentShape {
        SegmentShape {
            channels,
            patches:    self.patches_per_segment(),
            patch_size: self.patch_size,
        }
    }

    /// Segment every subject of a [subject, channel, time] array.
    pub fn segment(&self, data: &Array3<f32>) -> Result<Vec<Vec<f32>>, PipelineError> {
        let (n_subjects, n_channels, n_times) = data.dim();
        let n_seg = self.segments_per_recording(n_times);
        if n_seg == 0 {
            return Err(PipelineError::RecordingShorterThanSegment {
                n_times,
                segment_size: self.segment_size,
            });
        }

        let kept = self.patches_per_segment() * self.patch_size;
        let mut segments = Vec::with_capacity(n_subjects * n_seg);
        for subject in 0..n_subjects {
            for k in 0..n_seg {
                let start = k * self.segment_size;
                let window = data.slice(s![subject, .., start..start + kept]);
                segments.push(window.iter().copied().collect::<Vec<f32>>());
            }
        }

        tracing::debug!(
            "Segmented {} subjects × {} channels into {} segments of {} patches",
            n_subjects,
            n_channels,
            segments.len(),
            self.patches_per_segment()
        );
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(subjects: usize, channels: usize, times: usize) -> Array3<f32> {
        Array3::from_shape_fn((subjects, channels, times), |(s, c, t)| {
            (s * 1_000_000 + c * 10_000 + t) as f32
        })
    }

    #[test]
    fn test_segment_shape_for_default_sizes() {
        let seg = Segmenter::new(512, DEFAULT_PATCH_SIZE).unwrap();
        assert_eq!(seg.patches_per_segment(), 2);
        assert_eq!(seg.segments_per_recording(2048), 4);
        assert_eq!(seg.shape(8).dims(), [8, 2, 200]);
        assert_eq!(seg.shape(8).numel(), 3200);
    }

    #[test]
    fn test_segment_shorter_than_patch() {
        assert!(matches!(
            Segmenter::new(100, 200),
            Err(PipelineError::SegmentShorterThanPatch { .. })
        ));
    }

    #[test]
    fn test_recording_shorter_than_segment() {
        let seg = Segmenter::new(512, 200).unwrap();
        let err = seg.segment(&ramp(1, 2, 300)).unwrap_err();
        assert_eq!(err, PipelineError::RecordingShorterThanSegment { n_times: 300, segment_size: 512 });
    }

    #[test]
    fn test_segments_are_subject_major_and_channel_first() {
        let seg = Segmenter::new(4, 2).unwrap();
        let out = seg.segment(&ramp(2, 2, 8)).unwrap();
        assert_eq!(out.len(), 4);
        // subject 0, segment 1, channel 1 starts at t = 4
        assert_eq!(out[1][4], 10_004.0);
        // subject 1, segment 0, channel 0, t = 0
        assert_eq!(out[2][0], 1_000_000.0);
    }

    #[test]
    fn test_round_trip_recovers_truncated_samples() {
        let (subjects, channels, times) = (3, 4, 1000);
        let data = ramp(subjects, channels, times);
        let seg  = Segmenter::new(400, 200).unwrap();
        let out  = seg.segment(&data).unwrap();

        let n_seg = times / 400;
        let total: usize = out.iter().map(Vec::len).sum();
        assert_eq!(total, subjects * channels * n_seg * 400);

        // flatten back to [subject, channel, n_seg · 400]
        for s in 0..subjects {
            for c in 0..channels {
                let rebuilt: Vec<f32> = (0..n_seg)
                    .flat_map(|k| out[s * n_seg + k][c * 400..(c + 1) * 400].to_vec())
                    .collect();
                let original: Vec<f32> = data.slice(s![s, c, ..n_seg * 400]).to_vec();
                assert_eq!(rebuilt, original);
            }
        }
    }

    #[test]
    fn test_partial_patch_is_dropped() {
        let seg = Segmenter::new(512, 200).unwrap();
        let out = seg.segment(&ramp(1, 1, 1024)).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].len(), 400);
        assert_eq!(out[1][0], 512.0);
        assert_eq!(*out[1].last().unwrap(), 911.0);
    }
}
