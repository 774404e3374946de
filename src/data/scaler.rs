// ============================================================
// Layer 4 — Feature Scaler
// ============================================================
// Standardises lepton and track features to zero mean and unit
// variance. Statistics come from the training split only; the
// test split and any later evaluation reuse the same numbers.
//
// Track statistics are pooled over every track of every lepton,
// so a lepton with many tracks weighs more than one with few.
// A feature with zero spread keeps std = 1 (it is only centred).

use serde::{Deserialize, Serialize};

use crate::domain::lepton::LeptonEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub lepton_mean: Vec<f32>,
    pub lepton_std:  Vec<f32>,
    pub track_mean:  Vec<f32>,
    pub track_std:   Vec<f32>,
}

impl FeatureScaler {
    /// Fit mean/std on a set of leptons.
    pub fn fit(events: &[LeptonEvent], n_lepton: usize, n_track: usize) -> Self {
        let (lepton_mean, lepton_std) =
            column_stats(events.iter().map(|e| e.lepton.as_slice()), n_lepton);
        let (track_mean, track_std) = column_stats(
            events.iter().flat_map(|e| e.tracks.iter().map(Vec::as_slice)),
            n_track,
        );
        Self { lepton_mean, lepton_std, track_mean, track_std }
    }

    /// Standardise one lepton in place
    pub fn apply(&self, event: &mut LeptonEvent) {
        scale_row(&mut event.lepton, &self.lepton_mean, &self.lepton_std);
        for track in &mut event.tracks {
            scale_row(track, &self.track_mean, &self.track_std);
        }
    }

    pub fn apply_all(&self, events: &mut [LeptonEvent]) {
        events.iter_mut().for_each(|e| self.apply(e));
    }
}

fn scale_row(row: &mut [f32], mean: &[f32], std: &[f32]) {
    for ((v, m), s) in row.iter_mut().zip(mean).zip(std) {
        *v = (*v - m) / s;
    }
}

/// Per-column mean and population std, accumulated in f64.
fn column_stats<'a>(rows: impl Iterator<Item = &'a [f32]>, width: usize) -> (Vec<f32>, Vec<f32>) {
    let mut sum   = vec![0.0f64; width];
    let mut sq    = vec![0.0f64; width];
    let mut count = 0usize;

    for row in rows {
        for (i, &v) in row.iter().enumerate().take(width) {
            sum[i] += v as f64;
            sq[i]  += (v as f64) * (v as f64);
        }
        count += 1;
    }

    if count == 0 {
        return (vec![0.0; width], vec![1.0; width]);
    }

    let n = count as f64;
    let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();
    let std: Vec<f32> = sq
        .iter()
        .zip(&mean)
        .map(|(s, m)| {
            let var = (s / n - m * m).max(0.0);
            let sd  = var.sqrt();
            if sd > 1e-12 { sd as f32 } else { 1.0 }
        })
        .collect();

    (mean.into_iter().map(|m| m as f32).collect(), std)
}
