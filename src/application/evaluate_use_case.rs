// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a sample file with a network saved by `train`:
//
//   Step 1: Restore config + feature layout  (Layer 6 - infra)
//   Step 2: Load the sample, check its layout (Layer 4 - data)
//   Step 3: Re-apply the saved scaler         (Layer 4 - data)
//   Step 4: Score every lepton                (Layer 5 - ml)
//   Step 5: ROC curve                         (Layer 6 - infra)

use anyhow::{bail, Result};
use burn::{data::dataloader::DataLoaderBuilder, prelude::*};

use crate::application::train_use_case::write_roc;
use crate::data::{batcher::LeptonBatcher, dataset::LeptonDataset, loader::JsonEventLoader};
use crate::domain::{feature_layout::FeatureLayout, traits::EventSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    backend::{BackendKind, CpuBackend, GpuBackend},
    evaluator::{Evaluation, Evaluator},
};

#[derive(Debug, Clone)]
pub struct EvaluateConfig {
    pub input_data: String,
    pub model_dir:  String,
    pub batch_size: usize,
    pub backend:    BackendKind,
}

/// Result of scoring one sample file
#[derive(Debug, Clone)]
pub struct EvaluateReport {
    pub n_leptons: usize,
    pub loss:      f64,
    pub accuracy:  f64,
    pub auc:       Option<f64>,
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvaluateReport> {
        let cfg = &self.config;
        if cfg.batch_size == 0 {
            bail!("batch size must be at least 1");
        }

        // ── Step 1: What the network was trained on ───────────────────────────
        let ckpt      = CheckpointManager::open(&cfg.model_dir)?;
        let train_cfg = ckpt.load_config()?;
        let trained   = ckpt.load_layout()?;

        // ── Step 2: Load and check the sample ─────────────────────────────────
        tracing::info!("Loading sample '{}'", cfg.input_data);
        let loader = JsonEventLoader::new(&cfg.input_data, &trained.truth_label);
        let (layout, mut events) = loader.load_all()?;
        trained.ensure_compatible(&layout)?;

        // ── Step 3: Same preprocessing as training ────────────────────────────
        if let Some(scaler) = ckpt.load_scaler()? {
            scaler.apply_all(&mut events);
            tracing::info!("Applied saved feature scaler");
        }
        let dataset = LeptonDataset::new(events, train_cfg.max_tracks);
        tracing::info!("Scoring {} leptons", dataset.events().len());

        // ── Step 4: Score ─────────────────────────────────────────────────────
        let eval = match cfg.backend {
            BackendKind::NdArray => score::<CpuBackend>(
                &ckpt,
                &trained,
                dataset,
                cfg.batch_size,
                Default::default(),
            )?,
            BackendKind::Wgpu => score::<GpuBackend>(
                &ckpt,
                &trained,
                dataset,
                cfg.batch_size,
                Default::default(),
            )?,
        };

        // ── Step 5: ROC ───────────────────────────────────────────────────────
        let auc = write_roc(&eval.scores, &eval.truth, ckpt.dir(), "eval_roc")?;

        Ok(EvaluateReport {
            n_leptons: eval.n_scored(),
            loss:      eval.loss,
            accuracy:  eval.accuracy,
            auc,
        })
    }
}

fn score<B: Backend>(
    ckpt:       &CheckpointManager,
    layout:     &FeatureLayout,
    dataset:    LeptonDataset,
    batch_size: usize,
    device:     B::Device,
) -> Result<Evaluation> {
    let evaluator = Evaluator::<B>::from_checkpoint(ckpt, device)?;
    let batcher = LeptonBatcher::<B>::new(
        evaluator.device().clone(),
        layout.n_lepton_inputs(),
        layout.n_track_features(),
    );
    let loader = DataLoaderBuilder::new(batcher)
        .batch_size(batch_size)
        .num_workers(1)
        .build(dataset);
    Ok(evaluator.evaluate(loader.iter()))
}
