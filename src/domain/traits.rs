// ============================================================
// Layer 3 — Core Traits
// ============================================================

use anyhow::Result;

use crate::domain::{feature_layout::FeatureLayout, lepton::LeptonEvent};

// ─── EventSource ──────────────────────────────────────────────────────────────
/// Anything that can produce labelled leptons.
///
/// Implementations:
///   - JsonEventLoader → prepared sample file written by sample preparation
pub trait EventSource {
    /// Load the feature layout and every usable lepton.
    fn load_all(&self) -> Result<(FeatureLayout, Vec<LeptonEvent>)>;
}
