// ============================================================
// Layer 5 — Cosine Annealing Learning Rate
// ============================================================
// Stepped once per training batch:
//
//   lr(t) = lr_min + (lr_max − lr_min) · ½ · (1 + cos(π · t / T))
//
//   T      = epochs × batches per epoch
//   lr_min = 1e-6
//
// After T steps the rate stays at lr_min.

use std::f64::consts::PI;

use burn::LearningRate;

pub const MIN_LR: LearningRate = 1e-6;

#[derive(Debug, Clone)]
pub struct CosineAnnealing {
    lr_max:       LearningRate,
    lr_min:       LearningRate,
    t_max:        usize,
    current_step: usize,
}

impl CosineAnnealing {
    pub fn new(lr_max: LearningRate, t_max: usize, lr_min: LearningRate) -> Self {
        Self { lr_max, lr_min, t_max, current_step: 0 }
    }

    /// Rate for the current step.
    pub fn lr(&self) -> LearningRate {
        if self.t_max == 0 || self.current_step >= self.t_max {
            return self.lr_min;
        }
        let progress = self.current_step as f64 / self.t_max as f64;
        self.lr_min + (self.lr_max - self.lr_min) * 0.5 * (1.0 + (PI * progress).cos())
    }

    pub fn step(&mut self) {
        self.current_step += 1;
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_max() {
        let s = CosineAnnealing::new(1e-3, 100, MIN_LR);
        assert!((s.lr() - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn test_midpoint_is_average() {
        let mut s = CosineAnnealing::new(1.0, 10, 0.0);
        for _ in 0..5 {
            s.step();
        }
        assert!((s.lr() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_monotone_decay_to_floor() {
        let mut s = CosineAnnealing::new(5e-4, 20, MIN_LR);
        let mut prev = s.lr();
        for _ in 0..20 {
            s.step();
            assert!(s.lr() <= prev);
            prev = s.lr();
        }
        assert_eq!(s.lr(), MIN_LR);
        s.step();
        assert_eq!(s.lr(), MIN_LR);
    }
}
