// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Model, optimisation and evaluation code built on Burn.
//
// What's in this layer:
//
//   model.rs     — Patch transformer classifier
//                  • Linear patch embedding
//                  • Channel + position embeddings
//                  • Multi-head self-attention encoder blocks
//                  • Mean-pooled binary head (one logit)
//
//   schedule.rs  — Cosine-annealing learning rate, stepped
//                  once per batch
//
//   trainer.rs   — The fine-tuning loop
//                  Forward, BCE loss, backward, optimizer
//                  step, per-epoch validation, best-model
//                  tracking, test evaluation, checkpoint
//
//   evaluator.rs — Sigmoid scores → binary metrics over a
//                  loader
//
//   grad_clip.rs — Global gradient-norm clipping and the
//                  backbone / head gradient split
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Patch transformer backbone and binary head
pub mod model;

/// Cosine-annealing learning rate
pub mod schedule;

/// Fine-tuning loop with validation and checkpointing
pub mod trainer;

/// Scores a partition and computes binary metrics
pub mod evaluator;

pub mod grad_clip;
