// ============================================================
// Layer 4 — Subject-level Class Balancer
// ============================================================
// Downsamples subjects so both labels have the same number of
// subjects before any segmentation happens:
//
//   n_min = min(#label-0 subjects, #label-1 subjects)
//   keep the first n_min subjects of each class, in recording
//   order, class 0 first and then class 1
//
// Balancing whole subjects (not segments) keeps every subject's
// segments together with the same label.

use crate::domain::error::PipelineError;

/// Subjects kept after balancing, as indices into the original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancedSubjects {
    pub indices: Vec<usize>,
    pub labels:  Vec<u8>,
}

impl BalancedSubjects {
    pub fn per_class(&self) -> usize {
        self.indices.len() / 2
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

pub fn balance_subjects(labels: &[u8]) -> Result<BalancedSubjects, PipelineError> {
    let zeros: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == 0).collect();
    let ones:  Vec<usize> = (0..labels.len()).filter(|&i| labels[i] != 0).collect();

    let n_min = zeros.len().min(ones.len());
    if n_min == 0 {
        return Err(PipelineError::EmptyClass { zeros: zeros.len(), ones: ones.len() });
    }

    let indices: Vec<usize> = zeros[..n_min].iter().chain(&ones[..n_min]).copied().collect();
    let labels:  Vec<u8>    = std::iter::repeat(0).take(n_min)
        .chain(std::iter::repeat(1).take(n_min))
        .collect();

    tracing::info!(
        "Balanced subjects: kept {} per class (had {} / {})",
        n_min,
        zeros.len(),
        ones.len()
    );
    Ok(BalancedSubjects { indices, labels })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_counts_after_balancing() {
        let labels = [1u8, 0, 1, 1, 0, 1, 1];
        let b = balance_subjects(&labels).unwrap();
        assert_eq!(b.per_class(), 2);
        assert_eq!(b.labels.iter().filter(|&&l| l == 0).count(), 2);
        assert_eq!(b.labels.iter().filter(|&&l| l == 1).count(), 2);
    }

    #[test]
    fn test_keeps_first_subjects_class_zero_first() {
        let labels = [1u8, 0, 1, 1, 0, 1];
        let b = balance_subjects(&labels).unwrap();
        assert_eq!(b.indices, vec![1, 4, 0, 2]);
        assert_eq!(b.labels,  vec![0, 0, 1, 1]);
        for (&i, &l) in b.indices.iter().zip(&b.labels) {
            assert_eq!(labels[i], l);
        }
    }

    #[test]
    fn test_already_balanced_is_untouched() {
        let b = balance_subjects(&[0, 0, 1, 1]).unwrap();
        assert_eq!(b.indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_single_class_is_a_configuration_error() {
        let err = balance_subjects(&[1, 1, 1]).unwrap_err();
        assert_eq!(err, PipelineError::EmptyClass { zeros: 0, ones: 3 });
    }
}
