// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the prepared sample file and the tensors
// fed to the network:
//
//   sample.json
//       │
//       ▼
//   JsonEventLoader   → validates shapes, reads truth, drops -1 / NaN
//       │
//       ▼
//   split_train_test  → seeded shuffle, floor(split * n) for training
//       │
//       ▼
//   FeatureScaler     → optional standardisation fitted on training
//       │
//       ▼
//   LeptonDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   LeptonBatcher     → pads track sequences into batch tensors

/// Reads and validates prepared sample files
pub mod loader;

/// Per-feature standardisation
pub mod scaler;

/// Implements Burn's Dataset trait for leptons
pub mod dataset;

/// Implements Burn's Batcher trait with sequence padding
pub mod batcher;

/// Shuffles and splits data into train/test sets
pub mod splitter;
