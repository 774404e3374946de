// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
//   checkpoint.rs — network/optimiser records plus the JSON
//                   side files needed to rebuild a network
//
//   metrics.rs    — per-epoch CSV, scalar export and parameter
//                   histograms
//
//   roc.rs        — ROC curve, AUC and the ROC figure

/// Output folder: network, optimiser, config, layout, scaler
pub mod checkpoint;

/// Epoch metrics, scalar log and histograms
pub mod metrics;

/// ROC curve computation and plotting
pub mod roc;
