// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits describing the concepts
// of the fine-tuning pipeline:
//
//   subject.rs   — per-subject demographic rows
//   recording.rs — the [subject, channel, sample] EEG array
//   task.rs      — the closed set of downstream label strategies
//   partition.rs — train / val / test slicing of the segment pool
//   metrics.rs   — binary classification metrics on host vectors
//   error.rs     — named configuration / data / numerical failures
//   traits.rs    — sources the data layer implements
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, traits and pure functions
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

pub mod error;

pub mod subject;

pub mod recording;

pub mod task;

pub mod partition;

pub mod metrics;

pub mod traits;
