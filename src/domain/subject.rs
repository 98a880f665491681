// ============================================================
// Layer 3 — Subject Demographics
// ============================================================
// One row of the demographic table, plus the optional trait
// score merged in from the behavioural table.
//
// The table is keyed by subject identifier; lookups that miss
// are configuration errors raised by the label strategies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Demographic / behavioural fields for a single subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub id: String,

    /// Age bucket as written in the table, e.g. `"20-25"`
    pub age_range: String,

    /// 1 = female, 2 = male
    pub gender: u8,

    /// Sensation-seeking score, only present once the UPPS table is merged
    pub upps_sens_seek: Option<f64>,
}

impl SubjectInfo {
    pub fn new(id: impl Into<String>, age_range: impl Into<String>, gender: u8) -> Self {
        Self {
            id:             id.into(),
            age_range:      age_range.into(),
            gender,
            upps_sens_seek: None,
        }
    }

    pub fn with_upps(mut self, score: f64) -> Self {
        self.upps_sens_seek = Some(score);
        self
    }
}

/// The demographic table, keyed by subject id.
#[derive(Debug, Clone, Default)]
pub struct Demographics {
    rows: HashMap<String, SubjectInfo>,
}

impl Demographics {
    pub fn new(rows: impl IntoIterator<Item = SubjectInfo>) -> Self {
        Self {
            rows: rows.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&SubjectInfo> {
        self.rows.get(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Attach trait scores to matching subjects.
    /// Subjects without a score keep `None`.
    pub fn merge_upps(&mut self, scores: impl IntoIterator<Item = (String, f64)>) {
        for (id, score) in scores {
            if let Some(row) = self.rows.get_mut(&id) {
                row.upps_sens_seek = Some(score);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_upps_only_touches_known_subjects() {
        let mut demog = Demographics::new(vec![
            SubjectInfo::new("sub-1", "20-25", 1),
            SubjectInfo::new("sub-2", "60-65", 2),
        ]);
        demog.merge_upps(vec![("sub-2".to_string(), 33.0), ("sub-9".to_string(), 10.0)]);

        assert_eq!(demog.get("sub-1").unwrap().upps_sens_seek, None);
        assert_eq!(demog.get("sub-2").unwrap().upps_sens_seek, Some(33.0));
        assert!(demog.get("sub-9").is_none());
        assert_eq!(demog.len(), 2);
    }
}
