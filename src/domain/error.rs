// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Failures the pipeline reports by name. Everything else
// (I/O, parse errors from csv/serde) travels as anyhow errors
// with context attached at the boundary where it happened.
//
// Three families:
//   configuration — the run was asked for something impossible
//   data          — the input files do not have the expected shape
//   numerical     — training diverged
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Error Handling)

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    // ── configuration ────────────────────────────────────────────────────────
    #[error("unknown downstream task '{0}' (expected one of: age, gender, upps)")]
    UnknownTask(String),

    #[error("unknown optimizer '{0}' (expected one of: adamw, sgd)")]
    UnknownOptimizer(String),

    #[error("unknown device '{0}' (expected one of: cpu, wgpu)")]
    UnknownDevice(String),

    #[error("channel '{0}' is not present in the recording")]
    UnknownChannel(String),

    #[error("subject '{subject}' has no {field} entry in the demographic table")]
    MissingLabel { subject: String, field: &'static str },

    #[error("cannot parse age range '{0}'")]
    BadAgeRange(String),

    #[error("class balancing left no subjects (label 0: {zeros}, label 1: {ones})")]
    EmptyClass { zeros: usize, ones: usize },

    #[error("segment size {segment_size} is smaller than patch size {patch_size}")]
    SegmentShorterThanPatch { segment_size: usize, patch_size: usize },

    #[error("recording has {n_times} samples, fewer than one segment of {segment_size}")]
    RecordingShorterThanSegment { n_times: usize, segment_size: usize },

    #[error("{partition} partition is empty ({total} segments in the pool)")]
    EmptyPartition { partition: &'static str, total: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── data ─────────────────────────────────────────────────────────────────
    #[error("recording array has {actual} values, expected {expected} for shape {shape:?}")]
    ShapeMismatch { expected: usize, actual: usize, shape: Vec<usize> },

    #[error("signal of {len} samples is too short to filter (needs more than {padlen})")]
    SignalTooShort { len: usize, padlen: usize },

    // ── numerical ────────────────────────────────────────────────────────────
    #[error("training loss became {loss} at epoch {epoch}, batch {batch}")]
    NonFiniteLoss { loss: f64, epoch: usize, batch: usize },
}
