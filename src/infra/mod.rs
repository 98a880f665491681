// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence that several layers share:
//
//   checkpoint.rs — Saving and loading model weights
//                   Uses Burn's mpk.gz file recorder for the best
//                   model and for pretrained backbones. Also
//                   saves/loads FinetuneConfig as JSON so
//                   `evaluate` can rebuild the model and the
//                   partitions.
//
//   metrics.rs    — Training metrics logging
//                   Writes one CSV row per epoch (loss,
//                   validation balanced accuracy, learning
//                   rate, wall time).
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
