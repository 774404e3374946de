// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network code lives here:
//
//   model.rs     — IsolationModel: a recurrent layer reads the
//                  track sequence, a linear head combines the
//                  final hidden state with the lepton features
//                  into two class logits
//
//   trainer.rs   — epoch loop: forward, loss, backward, optimiser
//                  step, test pass, scalar/histogram logging
//
//   evaluator.rs — loss/accuracy/score pass with a non-autodiff
//                  model; reloads saved networks for `evaluate`
//
//   backend.rs   — NdArray / Wgpu selection

/// Backend selection
pub mod backend;

/// Recurrent isolation classifier
pub mod model;

/// Training loop with per-epoch test pass and logging
pub mod trainer;

/// Scoring pass and checkpoint reloading
pub mod evaluator;
