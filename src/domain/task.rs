// ============================================================
// Layer 3 — Downstream Tasks (Label Strategies)
// ============================================================
// Each downstream task turns one demographic row into a binary
// label. The set of tasks is closed: a task name that does not
// parse is rejected before any data is touched.
//
//   age    — 1 if the lower bound of the age range is >= 50
//   gender — 1 if the gender code is 2 (male)
//   upps   — 1 if the UPPS sensation-seeking score is > 30
//
// Reference: Rust Book §6 (Enums and Pattern Matching)

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::{
    error::PipelineError,
    subject::{Demographics, SubjectInfo},
};

/// Lower age bound (inclusive) of the "old" class.
pub const OLD_AGE_THRESHOLD: u32 = 50;

/// Gender code that maps to label 1.
pub const MALE_CODE: u8 = 2;

/// Sensation-seeking score above which a subject is labelled 1.
pub const UPPS_THRESHOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownstreamTask {
    Age,
    Gender,
    Upps,
}

impl DownstreamTask {
    /// Binary label for one subject.
    pub fn label(&self, info: &SubjectInfo) -> Result<u8, PipelineError> {
        match self {
            DownstreamTask::Age => {
                let lower = parse_age_lower_bound(&info.age_range)?;
                Ok(u8::from(lower >= OLD_AGE_THRESHOLD))
            }
            DownstreamTask::Gender => Ok(u8::from(info.gender == MALE_CODE)),
            DownstreamTask::Upps => {
                let score = info.upps_sens_seek.ok_or_else(|| PipelineError::MissingLabel {
                    subject: info.id.clone(),
                    field:   "UPPS_sens_seek",
                })?;
                Ok(u8::from(score > UPPS_THRESHOLD))
            }
        }
    }

    /// Labels for `subjects` in the given order.
    /// A subject missing from the table is a configuration error.
    pub fn labels_for(
        &self,
        subjects: &[String],
        table:    &Demographics,
    ) -> Result<Vec<u8>, PipelineError> {
        subjects
            .iter()
            .map(|id| {
                let info = table.get(id).ok_or_else(|| PipelineError::MissingLabel {
                    subject: id.clone(),
                    field:   "demographic",
                })?;
                self.label(info)
            })
            .collect()
    }

    /// Whether this task needs the behavioural score table.
    pub fn needs_trait_table(&self) -> bool {
        matches!(self, DownstreamTask::Upps)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DownstreamTask::Age    => "age",
            DownstreamTask::Gender => "gender",
            DownstreamTask::Upps   => "upps",
        }
    }
}

impl FromStr for DownstreamTask {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "age"    => Ok(DownstreamTask::Age),
            "gender" => Ok(DownstreamTask::Gender),
            "upps"   => Ok(DownstreamTask::Upps),
            _        => Err(PipelineError::UnknownTask(s.to_string())),
        }
    }
}

impl fmt::Display for DownstreamTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `"20-25"` → 20. A bare number is accepted too.
fn parse_age_lower_bound(range: &str) -> Result<u32, PipelineError> {
    range
        .split('-')
        .next()
        .map(str::trim)
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| PipelineError::BadAgeRange(range.to_string()))
}
