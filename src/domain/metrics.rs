// ============================================================
// Layer 3 — Binary Classification Metrics
// ============================================================
// Host-side metrics over (truth, score) pairs, where a score is
// the sigmoid of the model's single logit.
//
//   predicted label   = score > 0.5
//   balanced accuracy = mean recall over classes present in truth
//   ROC-AUC           = Mann-Whitney rank statistic (ties averaged)
//   PR-AUC            = trapezoidal area under precision/recall
//
// Degenerate inputs follow the usual conventions: a truth vector
// with a single class gives that class's recall as the balanced
// accuracy, and leaves ROC-AUC undefined (None). PR-AUC is
// undefined when there are no positives.
//
// Reference: Brodersen et al. (2010) balanced accuracy
//            Hanley & McNeil (1982) AUC as a rank statistic

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DECISION_THRESHOLD: f32 = 0.5;

/// Hard label for a sigmoid score.
pub fn predict(score: f32) -> u8 {
    u8::from(score > DECISION_THRESHOLD)
}

// ─── Confusion Matrix ─────────────────────────────────────────────────────────
/// 2×2 confusion matrix, rows = truth, columns = prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(truths: &[u8], preds: &[u8]) -> Self {
        debug_assert_eq!(truths.len(), preds.len(), "truths and predictions must have same length");
        let mut cm = Self::default();
        for (&t, &p) in truths.iter().zip(preds) {
            match (t != 0, p != 0) {
                (false, false) => cm.tn  += 1,
                (false, true)  => cm.fp  += 1,
                (true,  false) => cm.fn_ += 1,
                (true,  true)  => cm.tp  += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.tn + self.tp) as f64 / total as f64
    }

    /// Recall of class 0 and class 1; `None` when a class has no support.
    pub fn recalls(&self) -> [Option<f64>; 2] {
        let ratio = |hit: usize, miss: usize| {
            let support = hit + miss;
            (support > 0).then(|| hit as f64 / support as f64)
        };
        [ratio(self.tn, self.fp), ratio(self.tp, self.fn_)]
    }

    /// Mean recall over the classes that occur in the ground truth.
    pub fn balanced_accuracy(&self) -> f64 {
        let present: Vec<f64> = self.recalls().into_iter().flatten().collect();
        if present.is_empty() {
            return 0.0;
        }
        present.iter().sum::<f64>() / present.len() as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "          pred 0  pred 1")?;
        writeln!(f, "true 0  {:>7} {:>7}", self.tn, self.fp)?;
        write!(f,   "true 1  {:>7} {:>7}", self.fn_, self.tp)
    }
}

// ─── Scalar metrics ───────────────────────────────────────────────────────────

pub fn balanced_accuracy(truths: &[u8], preds: &[u8]) -> f64 {
    ConfusionMatrix::from_predictions(truths, preds).balanced_accuracy()
}

/// Area under the ROC curve, `None` unless both classes are present.
pub fn roc_auc(truths: &[u8], scores: &[f32]) -> Option<f64> {
    debug_assert_eq!(truths.len(), scores.len(), "truths and scores must have same length");
    let n_pos = truths.iter().filter(|&&t| t != 0).count();
    let n_neg = truths.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    // 1-based ranks, tied scores share the mean of their ranks
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0f64; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let mean_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = mean_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = truths
        .iter()
        .zip(&ranks)
        .filter(|&(&t, _)| t != 0)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Area under the precision-recall curve, `None` without positives.
///
/// The curve starts at (recall 0, precision 1), adds one point per
/// distinct score threshold in decreasing order, and stops at the
/// first threshold reaching full recall.
pub fn pr_auc(truths: &[u8], scores: &[f32]) -> Option<f64> {
    debug_assert_eq!(truths.len(), scores.len(), "truths and scores must have same length");
    let n_pos = truths.iter().filter(|&&t| t != 0).count();
    if n_pos == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut points = vec![(0.0f64, 1.0f64)];
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if truths[order[i]] != 0 { tp += 1 } else { fp += 1 }
            i += 1;
        }
        let recall    = tp as f64 / n_pos as f64;
        let precision = tp as f64 / (tp + fp) as f64;
        points.push((recall, precision));
        if tp == n_pos {
            break;
        }
    }

    let area = points
        .windows(2)
        .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
        .sum();
    Some(area)
}

// ─── Aggregate ────────────────────────────────────────────────────────────────
/// Everything reported for one partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryMetrics {
    pub balanced_accuracy: f64,
    pub pr_auc:            Option<f64>,
    pub roc_auc:           Option<f64>,
    pub confusion:         ConfusionMatrix,
}

impl BinaryMetrics {
    pub fn from_scores(truths: &[u8], scores: &[f32]) -> Self {
        let preds: Vec<u8> = scores.iter().map(|&s| predict(s)).collect();
        let confusion = ConfusionMatrix::from_predictions(truths, &preds);
        Self {
            balanced_accuracy: confusion.balanced_accuracy(),
            pr_auc:            pr_auc(truths, scores),
            roc_auc:           roc_auc(truths, scores),
            confusion,
        }
    }

    /// PR-AUC with NaN standing in for "undefined", for printing.
    pub fn pr_auc_or_nan(&self) -> f64 {
        self.pr_auc.unwrap_or(f64::NAN)
    }

    pub fn roc_auc_or_nan(&self) -> f64 {
        self.roc_auc.unwrap_or(f64::NAN)
    }
}
