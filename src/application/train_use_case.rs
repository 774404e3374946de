// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Runs a full training job in order:
//
//   Step 1: Load and validate the sample file   (Layer 4 - data)
//   Step 2: Shuffle and split train/test         (Layer 4 - data)
//   Step 3: Fit/apply the feature scaler         (Layer 4 - data)
//   Step 4: Build datasets                       (Layer 4 - data)
//   Step 5: Save config + feature layout         (Layer 6 - infra)
//   Step 6: Epoch loop                           (Layer 5 - ml)
//   Step 7: ROC curve on the test split          (Layer 6 - infra)
//   Step 8: Export scalar/histogram logs         (Layer 6 - infra)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    dataset::LeptonDataset,
    loader::JsonEventLoader,
    scaler::FeatureScaler,
    splitter::split_train_test,
};
use crate::domain::{
    feature_layout::{FeatureLayout, DEFAULT_TRUTH_LABEL},
    traits::EventSource,
};
use crate::infra::{checkpoint::CheckpointManager, metrics::RunLogs, roc::RocCurve};
use crate::ml::{
    backend::BackendKind,
    model::{CellKind, IsolationModelConfig},
    trainer::{run_training, OptimizerKind, TrainingContext},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every option of a training run. Saved as train_config.json so
// `evaluate` can rebuild the same network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub input_data:     String,
    pub output_folder:  String,
    pub training_split: f64,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub hidden_neurons: usize,
    pub cell:           CellKind,
    pub optimizer:      OptimizerKind,
    pub backend:        BackendKind,
    pub max_tracks:     Option<usize>,
    pub normalize:      bool,
    pub truth_label:    String,
    pub seed:           u64,
    pub drop_last:      bool,
    pub quiet:          bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            input_data:     "data/sample.json".to_string(),
            output_folder:  "output".to_string(),
            training_split: 0.66,
            batch_size:     32,
            epochs:         20,
            lr:             0.005,
            hidden_neurons: 128,
            cell:           CellKind::Rnn,
            optimizer:      OptimizerKind::Sgd,
            backend:        BackendKind::NdArray,
            max_tracks:     None,
            normalize:      false,
            truth_label:    DEFAULT_TRUTH_LABEL.to_string(),
            seed:           42,
            drop_last:      true,
            quiet:          false,
        }
    }
}

impl TrainConfig {
    /// Reject settings that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        if !(self.training_split > 0.0 && self.training_split < 1.0) {
            bail!("training split must be in (0, 1), got {}", self.training_split);
        }
        if self.batch_size == 0 {
            bail!("batch size must be at least 1");
        }
        if self.epochs == 0 {
            bail!("epochs must be at least 1");
        }
        if self.hidden_neurons == 0 {
            bail!("hidden layer needs at least one neuron");
        }
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            bail!("learning rate must be positive, got {}", self.lr);
        }
        if self.max_tracks == Some(0) {
            bail!("max tracks must be at least 1 when given");
        }
        Ok(())
    }

    /// Network architecture for a given feature layout
    pub fn model_config(&self, layout: &FeatureLayout) -> IsolationModelConfig {
        IsolationModelConfig::new(
            layout.n_lepton_inputs(),
            layout.n_track_features(),
            self.hidden_neurons,
            self.cell,
        )
    }
}

/// Headline numbers of a finished run
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub final_train_loss: f64,
    pub test_accuracy:    f64,
    pub auc:              Option<f64>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load leptons ──────────────────────────────────────────────
        tracing::info!("Loading sample '{}'", cfg.input_data);
        let loader = JsonEventLoader::new(&cfg.input_data, &cfg.truth_label);
        let (layout, events) = loader.load_all()?;
        if layout.n_track_features() == 0 {
            bail!("sample declares no track features");
        }

        // ── Step 2: Train / test split ────────────────────────────────────────
        let (mut train_events, mut test_events) =
            split_train_test(events, cfg.training_split, cfg.seed);
        tracing::info!(
            "Split: {} train, {} test",
            train_events.len(),
            test_events.len()
        );
        if train_events.is_empty() || test_events.is_empty() {
            bail!(
                "split {} leaves an empty set ({} train, {} test)",
                cfg.training_split,
                train_events.len(),
                test_events.len()
            );
        }
        if cfg.drop_last {
            let smallest = train_events.len().min(test_events.len());
            if smallest < cfg.batch_size {
                bail!(
                    "a split holds {} leptons, fewer than one batch of {}; \
                     lower --batch-size or pass --keep-last",
                    smallest,
                    cfg.batch_size
                );
            }
        }

        // ── Step 3: Optional standardisation ──────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.output_folder)?;
        if cfg.normalize {
            let scaler = FeatureScaler::fit(
                &train_events,
                layout.n_lepton_inputs(),
                layout.n_track_features(),
            );
            scaler.apply_all(&mut train_events);
            scaler.apply_all(&mut test_events);
            ckpt.save_scaler(&scaler)?;
            tracing::info!("Features standardised on the training split");
        }

        // ── Step 4: Datasets ──────────────────────────────────────────────────
        let train_set = LeptonDataset::new(train_events, cfg.max_tracks);
        let test_set  = LeptonDataset::new(test_events, cfg.max_tracks);
        tracing::info!(
            "Isolated fraction: {:.3} train, {:.3} test",
            train_set.isolated_fraction(),
            test_set.isolated_fraction()
        );

        // ── Step 5: Save what evaluation needs ────────────────────────────────
        ckpt.save_config(cfg)?;
        ckpt.save_layout(&layout)?;

        // ── Step 6: Train ─────────────────────────────────────────────────────
        let mut logs = RunLogs::new(&cfg.output_folder)?;
        let ctx = TrainingContext { cfg, layout: &layout, ckpt: &ckpt, logs: &mut logs };
        let outcome = run_training(ctx, train_set, test_set)?;

        // ── Step 7: ROC on the test split ─────────────────────────────────────
        let auc = write_roc(&outcome.test.scores, &outcome.test.truth, ckpt.dir(), "roc")?;

        // ── Step 8: Export logs ───────────────────────────────────────────────
        logs.export()?;

        Ok(TrainReport {
            final_train_loss: outcome.final_train_loss,
            test_accuracy:    outcome.test.accuracy,
            auc,
        })
    }
}

/// Write `<stem>.csv` / `<stem>.png` into `dir`. Returns the AUC, or
/// None when no curve can be drawn (one class only, non-finite scores).
pub fn write_roc(scores: &[f32], truth: &[bool], dir: &Path, stem: &str) -> Result<Option<f64>> {
    match RocCurve::compute(scores, truth) {
        Ok(roc) => {
            roc.write_csv(dir.join(format!("{stem}.csv")))?;
            roc.plot(dir.join(format!("{stem}.png")))?;
            tracing::info!("ROC AUC = {:.4}", roc.auc);
            Ok(Some(roc.auc))
        }
        Err(e) => {
            tracing::warn!("No ROC curve: {e}");
            Ok(None)
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_sample(dir: &Path, n: usize) -> String {
        let mut leptons = Vec::new();
        let mut tracks  = Vec::new();
        for i in 0..n {
            let isolated = i % 2 == 0;
            leptons.push(serde_json::json!([0.1 * i as f32, if isolated { 1 } else { 0 }]));
            if isolated {
                tracks.push(serde_json::json!([[-1.0, -0.5]]));
            } else {
                tracks.push(serde_json::json!([[1.0, 0.8], [0.9, 0.7], [1.1, 0.9]]));
            }
        }
        let sample = serde_json::json!({
            "lepton_labels": ["pT", DEFAULT_TRUTH_LABEL],
            "track_labels": ["pT", "d0"],
            "normed_leptons": leptons,
            "normed_tracks": tracks,
        });
        let path = dir.join("sample.json");
        fs::write(&path, sample.to_string()).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let ok = TrainConfig::default();
        assert!(ok.validate().is_ok());
        assert!(TrainConfig { training_split: 1.0, ..ok.clone() }.validate().is_err());
        assert!(TrainConfig { training_split: 0.0, ..ok.clone() }.validate().is_err());
        assert!(TrainConfig { batch_size: 0, ..ok.clone() }.validate().is_err());
        assert!(TrainConfig { hidden_neurons: 0, ..ok.clone() }.validate().is_err());
        assert!(TrainConfig { epochs: 0, ..ok.clone() }.validate().is_err());
        assert!(TrainConfig { lr: -1.0, ..ok.clone() }.validate().is_err());
        assert!(TrainConfig { max_tracks: Some(0), ..ok }.validate().is_err());
    }

    #[test]
    fn test_model_config_drops_truth_column() {
        let layout = FeatureLayout::new(
            vec!["pT".into(), "eta".into(), DEFAULT_TRUTH_LABEL.into()],
            vec!["pT".into(), "d0".into(), "z0".into()],
            DEFAULT_TRUTH_LABEL,
        );
        let m = TrainConfig::default().model_config(&layout);
        assert_eq!(m.n_lepton_inputs, 2);
        assert_eq!(m.n_track_features, 3);
        assert_eq!(m.hidden_neurons, 128);
    }

    #[test]
    fn test_end_to_end_training_writes_outputs() {
        let dir   = tempfile::tempdir().unwrap();
        let input = write_sample(dir.path(), 60);
        let out   = dir.path().join("run");

        let cfg = TrainConfig {
            input_data:     input,
            output_folder:  out.display().to_string(),
            batch_size:     4,
            epochs:         3,
            hidden_neurons: 6,
            normalize:      true,
            quiet:          true,
            ..TrainConfig::default()
        };
        let report = TrainUseCase::new(cfg).execute().unwrap();
        assert!(report.final_train_loss.is_finite());

        for file in [
            "saved_net.mpk.gz",
            "saved_optimizer.mpk.gz",
            "train_config.json",
            "feature_layout.json",
            "scaler.json",
            "metrics.csv",
            "all_scalars.json",
            "histograms.json",
        ] {
            assert!(out.join(file).exists(), "missing {file}");
        }
    }

    #[test]
    fn test_split_smaller_than_batch() {
        let dir   = tempfile::tempdir().unwrap();
        let input = write_sample(dir.path(), 20);

        // 13 train / 7 test leptons against a batch of 8
        let cfg = TrainConfig {
            input_data:     input,
            output_folder:  dir.path().join("run").display().to_string(),
            batch_size:     8,
            epochs:         1,
            hidden_neurons: 4,
            quiet:          true,
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg.clone()).execute().unwrap_err();
        assert!(err.to_string().contains("fewer than one batch"), "{err}");

        let kept = TrainConfig { drop_last: false, ..cfg };
        let report = TrainUseCase::new(kept).execute().unwrap();
        assert!(report.test_accuracy.is_finite());
    }

    #[test]
    fn test_roc_skipped_for_nan_scores() {
        let dir = tempfile::tempdir().unwrap();
        let auc = write_roc(&[f32::NAN, 0.4, 0.6], &[true, false, true], dir.path(), "roc").unwrap();
        assert_eq!(auc, None);
        assert!(!dir.path().join("roc.csv").exists());
    }

    #[test]
    fn test_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            input_data:    dir.path().join("absent.json").display().to_string(),
            output_folder: dir.path().join("run").display().to_string(),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
