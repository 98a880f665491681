// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The dataset builder only needs "something that yields the
// recording array" and "something that yields the demographic
// table". The file-backed loaders in the data layer implement
// both; tests implement them with in-memory fixtures.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::{recording::Recordings, subject::Demographics, task::DownstreamTask};

// ─── RecordingSource ──────────────────────────────────────────────────────────
/// Any component that can provide the raw [subject, channel, time] array.
pub trait RecordingSource {
    fn load_recordings(&self) -> Result<Recordings>;
}

// ─── DemographicSource ────────────────────────────────────────────────────────
/// Any component that can provide per-subject label fields.
///
/// The task is passed in so that sources only read the
/// behavioural table when the task needs it.
pub trait DemographicSource {
    fn load_demographics(&self, task: DownstreamTask) -> Result<Demographics>;
}
