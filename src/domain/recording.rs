// ============================================================
// Layer 3 — Recordings
// ============================================================
// The raw EEG array for all subjects, indexed by
// [subject, channel, sample], plus the labels of each axis.
//
// Construction checks that the axis labels agree with the array
// shape, so every later stage can index without re-checking.

use ndarray::{Array3, Axis};

use crate::domain::error::PipelineError;

/// Default sampling rate of the downsampled recordings, in Hz.
pub const DEFAULT_SFREQ: f64 = 128.0;

#[derive(Debug, Clone)]
pub struct Recordings {
    subjects: Vec<String>,
    channels: Vec<String>,
    sfreq:    f64,
    /// [subject, channel, sample]
    data:     Array3<f32>,
}

impl Recordings {
    pub fn new(
        subjects: Vec<String>,
        channels: Vec<String>,
        sfreq:    f64,
        data:     Array3<f32>,
    ) -> Result<Self, PipelineError> {
        let (n_subjects, n_channels, n_times) = data.dim();
        if subjects.len() != n_subjects || channels.len() != n_channels {
            return Err(PipelineError::ShapeMismatch {
                expected: subjects.len() * channels.len() * n_times,
                actual:   data.len(),
                shape:    vec![n_subjects, n_channels, n_times],
            });
        }
        if !(sfreq > 0.0) {
            return Err(PipelineError::InvalidConfig(format!("sampling rate must be positive, got {sfreq}")));
        }
        Ok(Self { subjects, channels, sfreq, data })
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    pub fn n_times(&self) -> usize {
        self.data.dim().2
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Channel indices for `names`, in the requested order.
    pub fn channel_indices(&self, names: &[String]) -> Result<Vec<usize>, PipelineError> {
        names
            .iter()
            .map(|name| {
                self.channels
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| PipelineError::UnknownChannel(name.clone()))
            })
            .collect()
    }

    /// Keep only `subject_idx` (in that order) and `channels`.
    pub fn select(
        &self,
        subject_idx: &[usize],
        channels:    &[String],
    ) -> Result<Recordings, PipelineError> {
        let channel_idx = self.channel_indices(channels)?;
        let data = self
            .data
            .select(Axis(0), subject_idx)
            .select(Axis(1), &channel_idx);
        Ok(Recordings {
            subjects: subject_idx.iter().map(|&i| self.subjects[i].clone()).collect(),
            channels: channels.to_vec(),
            sfreq:    self.sfreq,
            data,
        })
    }

    pub fn into_data(self) -> Array3<f32> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_shape_must_match_labels() {
        let data = Array3::<f32>::zeros((2, 3, 10));
        let err  = Recordings::new(names("s", 3), names("c", 3), 128.0, data).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_select_reorders_subjects_and_channels() {
        let data = Array3::from_shape_fn((3, 3, 4), |(s, c, t)| (s * 100 + c * 10 + t) as f32);
        let rec  = Recordings::new(names("s", 3), names("c", 3), 128.0, data).unwrap();

        let picked = rec.select(&[2, 0], &["c1".to_string(), "c0".to_string()]).unwrap();
        assert_eq!(picked.subjects(), &["s2".to_string(), "s0".to_string()]);
        assert_eq!(picked.data()[[0, 0, 3]], 213.0);
        assert_eq!(picked.data()[[1, 1, 0]], 0.0);
    }

    #[test]
    fn test_unknown_channel() {
        let rec = Recordings::new(names("s", 1), names("c", 2), 128.0, Array3::zeros((1, 2, 4))).unwrap();
        let err = rec.select(&[0], &["Oz".to_string()]).unwrap_err();
        assert_eq!(err, PipelineError::UnknownChannel("Oz".to_string()));
    }
}
