// ============================================================
// Layer 3 — LeptonEvent Domain Type
// ============================================================
// One reconstructed lepton together with the tracks found
// around it. The lepton row already has the truth column
// removed; `isolated` carries the label instead.

use serde::{Deserialize, Serialize};

/// A labelled lepton with its variable-length track sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeptonEvent {
    /// Lepton input features, ordered as `FeatureLayout::input_lepton_labels`
    pub lepton: Vec<f32>,

    /// One row per associated track, ordered as `FeatureLayout::track_labels`.
    /// May be empty.
    pub tracks: Vec<Vec<f32>>,

    /// Truth: is this lepton isolated?
    pub isolated: bool,
}

impl LeptonEvent {
    pub fn new(lepton: Vec<f32>, tracks: Vec<Vec<f32>>, isolated: bool) -> Self {
        Self { lepton, tracks, isolated }
    }

    /// Number of tracks in the sequence
    pub fn n_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Class index used by the classifier: 1 = isolated, 0 = not isolated
    pub fn label(&self) -> usize {
        usize::from(self.isolated)
    }

    /// Keep at most `max` tracks (the leading ones).
    pub fn truncate_tracks(&mut self, max: usize) {
        self.tracks.truncate(max);
    }

    /// True if every lepton and track value is finite
    pub fn is_finite(&self) -> bool {
        self.lepton.iter().all(|v| v.is_finite())
            && self.tracks.iter().flatten().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_follows_isolation() {
        let iso     = LeptonEvent::new(vec![1.0], vec![], true);
        let non_iso = LeptonEvent::new(vec![1.0], vec![], false);
        assert_eq!(iso.label(), 1);
        assert_eq!(non_iso.label(), 0);
    }

    #[test]
    fn test_truncate_keeps_leading_tracks() {
        let mut ev = LeptonEvent::new(vec![0.0], vec![vec![1.0], vec![2.0], vec![3.0]], true);
        ev.truncate_tracks(2);
        assert_eq!(ev.tracks, vec![vec![1.0], vec![2.0]]);

        // Truncating above the length is a no-op
        ev.truncate_tracks(10);
        assert_eq!(ev.n_tracks(), 2);
    }

    #[test]
    fn test_nan_track_is_not_finite() {
        let ev = LeptonEvent::new(vec![0.5], vec![vec![f32::NAN]], false);
        assert!(!ev.is_finite());
    }
}
