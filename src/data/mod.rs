// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from the raw recordings file
// all the way to device-ready tensor batches.
//
// The pipeline flows in this order:
//
//   recordings.safetensors + Demographics.csv (+ UPPS.csv)
//       │
//       ▼
//   DirectoryLoader   → reads the array and the subject tables
//       │
//       ▼
//   Balancer          → equal subjects per label
//       │
//       ▼
//   Filter            → zero-phase Butterworth high-pass
//       │
//       ▼
//   Segmenter         → segments of [channels, patches, patch_size]
//       │
//       ▼
//   Splitter          → seeded stratified shuffle
//       │
//       ▼
//   SegmentPool       → train / val / test EegDatasets
//       │
//       ▼
//   EegBatcher        → stacks segments into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads the recordings file and the demographic tables
pub mod loader;

/// Subject-level class balancing
pub mod balancer;

/// Butterworth high-pass, second-order sections
pub mod filter;

/// Cuts recordings into patched segments
pub mod segmenter;

/// Seeded shuffle used for the partition split
pub mod splitter;

/// Segment pool and Burn Dataset for each partition
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Train / eval DataLoader construction
pub mod dataloader;
