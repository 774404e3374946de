// ============================================================
// Layer 3 — FeatureLayout
// ============================================================
// The column names of the lepton and track feature arrays.
// Saved next to a checkpoint so a network is only ever fed
// features in the order it was trained on.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Label name carrying the isolation truth in the lepton records
pub const DEFAULT_TRUTH_LABEL: &str = "lepIso_lep_isolated";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    /// All lepton columns as stored in the sample file, truth included
    pub lepton_labels: Vec<String>,

    /// Track columns
    pub track_labels: Vec<String>,

    /// Which lepton column holds the truth
    pub truth_label: String,
}

impl FeatureLayout {
    pub fn new(
        lepton_labels: Vec<String>,
        track_labels:  Vec<String>,
        truth_label:   impl Into<String>,
    ) -> Self {
        Self { lepton_labels, track_labels, truth_label: truth_label.into() }
    }

    /// Column index of the truth label, if present
    pub fn truth_index(&self) -> Option<usize> {
        self.lepton_labels.iter().position(|l| *l == self.truth_label)
    }

    /// Lepton labels the network actually sees (truth column removed)
    pub fn input_lepton_labels(&self) -> Vec<&str> {
        self.lepton_labels
            .iter()
            .filter(|l| **l != self.truth_label)
            .map(String::as_str)
            .collect()
    }

    pub fn n_lepton_inputs(&self) -> usize {
        self.input_lepton_labels().len()
    }

    pub fn n_track_features(&self) -> usize {
        self.track_labels.len()
    }

    /// Check that a sample file provides the same inputs as the
    /// layout a network was trained with.
    pub fn ensure_compatible(&self, other: &FeatureLayout) -> Result<()> {
        if self.input_lepton_labels() != other.input_lepton_labels() {
            bail!(
                "lepton features differ: trained on {:?}, got {:?}",
                self.input_lepton_labels(),
                other.input_lepton_labels()
            );
        }
        if self.track_labels != other.track_labels {
            bail!(
                "track features differ: trained on {:?}, got {:?}",
                self.track_labels,
                other.track_labels
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(lep: &[&str], trk: &[&str]) -> FeatureLayout {
        FeatureLayout::new(
            lep.iter().map(|s| s.to_string()).collect(),
            trk.iter().map(|s| s.to_string()).collect(),
            DEFAULT_TRUTH_LABEL,
        )
    }

    #[test]
    fn test_truth_column_is_not_an_input() {
        let l = layout(&["pT", DEFAULT_TRUTH_LABEL, "eta"], &["pT", "d0"]);
        assert_eq!(l.truth_index(), Some(1));
        assert_eq!(l.input_lepton_labels(), vec!["pT", "eta"]);
        assert_eq!(l.n_lepton_inputs(), 2);
        assert_eq!(l.n_track_features(), 2);
    }

    #[test]
    fn test_missing_truth_label() {
        let l = layout(&["pT", "eta"], &["pT"]);
        assert_eq!(l.truth_index(), None);
    }

    #[test]
    fn test_compatibility_ignores_truth_position() {
        let a = layout(&["pT", "eta", DEFAULT_TRUTH_LABEL], &["pT"]);
        let b = layout(&[DEFAULT_TRUTH_LABEL, "pT", "eta"], &["pT"]);
        assert!(a.ensure_compatible(&b).is_ok());

        let c = layout(&["pT", DEFAULT_TRUTH_LABEL], &["pT"]);
        assert!(a.ensure_compatible(&c).is_err());

        let d = layout(&["pT", "eta", DEFAULT_TRUTH_LABEL], &["pT", "z0"]);
        assert!(a.ensure_compatible(&d).is_err());
    }
}
