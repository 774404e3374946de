use burn::data::dataset::Dataset;

use crate::domain::lepton::LeptonEvent;

/// In-memory dataset of labelled leptons.
pub struct LeptonDataset {
    events: Vec<LeptonEvent>,
}

impl LeptonDataset {
    /// Build a dataset, optionally capping every track sequence at `max_tracks`.
    pub fn new(mut events: Vec<LeptonEvent>, max_tracks: Option<usize>) -> Self {
        if let Some(max) = max_tracks {
            events.iter_mut().for_each(|e| e.truncate_tracks(max));
        }
        Self { events }
    }

    pub fn events(&self) -> &[LeptonEvent] { &self.events }

    /// Fraction of isolated leptons, 0 for an empty dataset
    pub fn isolated_fraction(&self) -> f64 {
        if self.events.is_empty() {
            return 0.0;
        }
        let iso = self.events.iter().filter(|e| e.isolated).count();
        iso as f64 / self.events.len() as f64
    }
}

impl Dataset<LeptonEvent> for LeptonDataset {
    fn get(&self, index: usize) -> Option<LeptonEvent> {
        self.events.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.events.len()
    }
}
