// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one command:
//   - no tensor code here (Layer 5)
//   - no argument parsing or printing (Layer 1)
//   - only the order in which things happen

// Load → split → (scale) → train → ROC → save
pub mod train_use_case;

// Reload a trained network and score a sample file
pub mod evaluate_use_case;
