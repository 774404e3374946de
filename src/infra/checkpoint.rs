// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Everything a finished run leaves in its output folder:
//
//   output_folder/
//     saved_net.mpk.gz         ← network weights
//     saved_optimizer.mpk.gz   ← optimiser state
//     train_config.json        ← hyperparameters, rebuilds the network
//     feature_layout.json      ← feature names the network was fed
//     scaler.json              ← only when --normalize was used
//
// Records are named MessagePack, gzipped, stored in half precision.
// Loading fails if the architecture does not match.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::scaler::FeatureScaler;
use crate::domain::feature_layout::FeatureLayout;
use crate::ml::model::IsolationModel;

const NET_FILE:       &str = "saved_net";
const OPTIMIZER_FILE: &str = "saved_optimizer";
const CONFIG_FILE:    &str = "train_config.json";
const LAYOUT_FILE:    &str = "feature_layout.json";
const SCALER_FILE:    &str = "scaler.json";

type RecordFormat = NamedMpkGzFileRecorder<HalfPrecisionSettings>;

/// Saves and restores everything under one output folder.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Open (and create if needed) an output folder
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output folder '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing output folder without creating it
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            anyhow::bail!(
                "Model folder '{}' does not exist. Have you run 'train' first?",
                dir.display()
            );
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save network weights (the recorder appends `.mpk.gz`).
    pub fn save_model<B: Backend>(&self, model: &IsolationModel<B>) -> Result<()> {
        let path = self.dir.join(NET_FILE);
        Recorder::<B>::record(&RecordFormat::new(), model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save network to '{}'", path.display()))?;
        tracing::debug!("Saved network to '{}'", path.display());
        Ok(())
    }

    /// Restore weights into a network of the same architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  IsolationModel<B>,
        device: &B::Device,
    ) -> Result<IsolationModel<B>> {
        let path = self.dir.join(NET_FILE);
        let record = Recorder::<B>::load(&RecordFormat::new(), path.clone(), device)
            .with_context(|| {
                format!("Cannot load network '{}'. Have you trained the model first?", path.display())
            })?;
        Ok(model.load_record(record))
    }

    /// Save the optimiser state (moments for Adam, nothing much for SGD).
    pub fn save_optimizer<B, O>(&self, optim: &O) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<IsolationModel<B>, B>,
    {
        let path = self.dir.join(OPTIMIZER_FILE);
        Recorder::<B>::record(&RecordFormat::new(), optim.to_record(), path.clone())
            .with_context(|| format!("Failed to save optimizer to '{}'", path.display()))?;
        tracing::debug!("Saved optimizer state to '{}'", path.display());
        Ok(())
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json(CONFIG_FILE)
    }

    pub fn save_layout(&self, layout: &FeatureLayout) -> Result<()> {
        self.write_json(LAYOUT_FILE, layout)
    }

    pub fn load_layout(&self) -> Result<FeatureLayout> {
        self.read_json(LAYOUT_FILE)
    }

    pub fn save_scaler(&self, scaler: &FeatureScaler) -> Result<()> {
        self.write_json(SCALER_FILE, scaler)
    }

    /// The scaler saved with the network, if normalisation was used
    pub fn load_scaler(&self) -> Result<Option<FeatureScaler>> {
        if !self.dir.join(SCALER_FILE).exists() {
            return Ok(None);
        }
        self.read_json(SCALER_FILE).map(Some)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read '{}'. Make sure you have run 'train' into this folder.",
                path.display()
            )
        })?;
        serde_json::from_str(&json).with_context(|| format!("Malformed '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::domain::feature_layout::DEFAULT_TRUTH_LABEL;
    use crate::ml::model::CellKind;

    type TestBackend = NdArray;

    #[test]
    fn test_config_and_layout_roundtrip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();

        let cfg = TrainConfig { hidden_neurons: 17, cell: CellKind::Lstm, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        let back = ckpt.load_config().unwrap();
        assert_eq!(back.hidden_neurons, 17);
        assert_eq!(back.cell, CellKind::Lstm);

        let layout = FeatureLayout::new(
            vec!["pT".into(), DEFAULT_TRUTH_LABEL.into()],
            vec!["d0".into()],
            DEFAULT_TRUTH_LABEL,
        );
        ckpt.save_layout(&layout).unwrap();
        assert_eq!(ckpt.load_layout().unwrap(), layout);
    }

    #[test]
    fn test_scaler_is_optional() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.load_scaler().unwrap().is_none());

        let scaler = FeatureScaler {
            lepton_mean: vec![1.0],
            lepton_std:  vec![2.0],
            track_mean:  vec![0.5],
            track_std:   vec![1.0],
        };
        ckpt.save_scaler(&scaler).unwrap();
        assert_eq!(ckpt.load_scaler().unwrap(), Some(scaler));
    }

    #[test]
    fn test_model_weights_roundtrip() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let cfg    = crate::ml::model::IsolationModelConfig::new(2, 3, 4, CellKind::Rnn);

        let model = cfg.init::<TestBackend>(&device);
        ckpt.save_model(&model).unwrap();
        assert!(dir.path().join("saved_net.mpk.gz").exists());

        let fresh    = cfg.init::<TestBackend>(&device);
        let restored = ckpt.load_model(fresh, &device).unwrap();

        let before = &model.named_parameters()[0].1;
        let after  = &restored.named_parameters()[0].1;
        // half precision on disk
        for (a, b) in before.iter().zip(after) {
            assert!((a - b).abs() < 1e-2);
        }
    }

    #[test]
    fn test_open_missing_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CheckpointManager::open(dir.path().join("nope")).is_err());
    }
}
