// ============================================================
// Layer 4 — Sample Loader
// ============================================================
// Reads the prepared sample file produced by sample preparation:
//
//   {
//     "lepton_labels":  ["pT", "eta", ..., "lepIso_lep_isolated"],
//     "track_labels":   ["pT", "eta", "phi", "d0", "z0"],
//     "normed_leptons": [[...], ...],          // one row per lepton
//     "normed_tracks":  [[[...], ...], ...]    // one sequence per lepton
//   }
//
// Missing values are written as `null` and read back as NaN.
//
// Truth handling:
//   -1  → truth not recognised, lepton skipped
//    0  → not isolated
//    1  → isolated
//   any other value is an error
//
// Leptons carrying a non-finite feature are skipped and counted.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};
use thiserror::Error;

use crate::domain::{
    feature_layout::FeatureLayout,
    lepton::LeptonEvent,
    traits::EventSource,
};

/// Validation failures in a sample file
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("{leptons} lepton rows but {tracks} track sequences")]
    CountMismatch { leptons: usize, tracks: usize },

    #[error("lepton {row}: expected {expected} features, found {found}")]
    LeptonWidth { row: usize, expected: usize, found: usize },

    #[error("lepton {row}, track {track}: expected {expected} features, found {found}")]
    TrackWidth { row: usize, track: usize, expected: usize, found: usize },

    #[error("truth label '{0}' is not one of the lepton labels")]
    MissingTruthLabel(String),

    #[error("lepton {row}: unknown truth value {value}")]
    UnknownTruth { row: usize, value: f32 },

    #[error("no usable leptons in sample")]
    Empty,
}

/// On-disk layout of a prepared sample
#[derive(Debug, Deserialize)]
struct SampleFile {
    lepton_labels:  Vec<String>,
    track_labels:   Vec<String>,
    normed_leptons: Vec<Vec<Option<f32>>>,
    normed_tracks:  Vec<Vec<Vec<Option<f32>>>>,
}

/// Counters reported after a load
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub total:          usize,
    pub kept:           usize,
    pub unknown_truth:  usize,
    pub non_finite:     usize,
}

/// Loads a prepared JSON sample file.
pub struct JsonEventLoader {
    path:        PathBuf,
    truth_label: String,
}

impl JsonEventLoader {
    pub fn new(path: impl Into<PathBuf>, truth_label: impl Into<String>) -> Self {
        Self { path: path.into(), truth_label: truth_label.into() }
    }
}

impl EventSource for JsonEventLoader {
    fn load_all(&self) -> Result<(FeatureLayout, Vec<LeptonEvent>)> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read sample file '{}'", self.path.display()))?;

        let (layout, events, stats) = parse_sample(&json, &self.truth_label)
            .with_context(|| format!("Invalid sample file '{}'", self.path.display()))?;

        if stats.unknown_truth > 0 {
            tracing::info!("Skipped {} leptons with unrecognised truth", stats.unknown_truth);
        }
        if stats.non_finite > 0 {
            tracing::warn!("Skipped {} leptons with non-finite features", stats.non_finite);
        }
        tracing::info!(
            "Loaded {} of {} leptons ({} lepton inputs, {} track features)",
            stats.kept,
            stats.total,
            layout.n_lepton_inputs(),
            layout.n_track_features(),
        );

        Ok((layout, events))
    }
}

/// Parse and validate the JSON text of a sample file.
pub fn parse_sample(
    json:        &str,
    truth_label: &str,
) -> Result<(FeatureLayout, Vec<LeptonEvent>, LoadStats)> {
    let file: SampleFile = serde_json::from_str(json)?;
    let layout = FeatureLayout::new(file.lepton_labels, file.track_labels, truth_label);

    let truth_idx = layout
        .truth_index()
        .ok_or_else(|| DataError::MissingTruthLabel(truth_label.to_string()))?;

    if file.normed_leptons.len() != file.normed_tracks.len() {
        return Err(DataError::CountMismatch {
            leptons: file.normed_leptons.len(),
            tracks:  file.normed_tracks.len(),
        }
        .into());
    }

    let n_lep = layout.lepton_labels.len();
    let n_trk = layout.n_track_features();
    let mut stats  = LoadStats { total: file.normed_leptons.len(), ..Default::default() };
    let mut events = Vec::with_capacity(stats.total);

    for (row, (lepton, tracks)) in file
        .normed_leptons
        .into_iter()
        .zip(file.normed_tracks)
        .enumerate()
    {
        if lepton.len() != n_lep {
            return Err(DataError::LeptonWidth { row, expected: n_lep, found: lepton.len() }.into());
        }
        for (track, t) in tracks.iter().enumerate() {
            if t.len() != n_trk {
                return Err(DataError::TrackWidth {
                    row,
                    track,
                    expected: n_trk,
                    found: t.len(),
                }
                .into());
            }
        }

        let isolated = match lepton[truth_idx] {
            None => {
                stats.unknown_truth += 1;
                continue;
            }
            Some(v) if v == -1.0 => {
                stats.unknown_truth += 1;
                continue;
            }
            Some(v) if v == 0.0 => false,
            Some(v) if v == 1.0 => true,
            Some(value) => return Err(DataError::UnknownTruth { row, value }.into()),
        };

        let inputs: Vec<f32> = lepton
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != truth_idx)
            .map(|(_, v)| v.unwrap_or(f32::NAN))
            .collect();
        let tracks: Vec<Vec<f32>> = tracks
            .into_iter()
            .map(|t| t.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
            .collect();

        let event = LeptonEvent::new(inputs, tracks, isolated);
        if !event.is_finite() {
            stats.non_finite += 1;
            continue;
        }
        events.push(event);
    }

    stats.kept = events.len();
    if events.is_empty() {
        return Err(DataError::Empty.into());
    }

    Ok((layout, events, stats))
}
