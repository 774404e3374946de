// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing one lepton and the features that
// come with it. Nothing in here touches Burn, the filesystem,
// or any tensor code.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums and traits

// One lepton with its track sequence and truth label
pub mod lepton;

// Names of the lepton/track feature columns
pub mod feature_layout;

// Abstractions implemented by the data layer
pub mod traits;
