// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop over Burn DataLoaders:
//   - training pass on Autodiff<backend>: forward, cross-entropy,
//     backward, optimiser step
//   - test pass on the inner backend via model.valid()
//   - scalars + parameter histograms logged every epoch
//   - after the last epoch the whole test split is scored once
//     more (no batch dropped) for the ROC curve
//
// Both loaders skip a trailing short batch when drop_last is set.

use std::sync::Arc;

use anyhow::Result;
use burn::{
    backend::Autodiff,
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::LeptonBatcher, dataset::LeptonDataset};
use crate::domain::feature_layout::FeatureLayout;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, RunLogs};
use crate::ml::backend::{BackendKind, CpuBackend, GpuBackend};
use crate::ml::evaluator::{evaluate_batches, Evaluation};
use crate::ml::model::{correct_predictions, IsolationModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Plain gradient descent: θ = θ - lr * g
    Sgd,
    Adam,
}

/// What a finished run hands back to the caller
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Mean training loss of the last epoch
    pub final_train_loss: f64,
    /// Full pass over the test split with the final network
    pub test: Evaluation,
}

/// Everything the loop needs besides the model and optimiser
pub struct TrainingContext<'a> {
    pub cfg:    &'a TrainConfig,
    pub layout: &'a FeatureLayout,
    pub ckpt:   &'a CheckpointManager,
    pub logs:   &'a mut RunLogs,
}

pub fn run_training(
    ctx:   TrainingContext<'_>,
    train: LeptonDataset,
    test:  LeptonDataset,
) -> Result<TrainingOutcome> {
    match ctx.cfg.backend {
        BackendKind::NdArray => {
            let device = burn::backend::ndarray::NdArrayDevice::default();
            tracing::info!("Using NdArray device: {:?}", device);
            with_optimizer::<Autodiff<CpuBackend>>(ctx, train, test, device)
        }
        BackendKind::Wgpu => {
            let device = burn::backend::wgpu::WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            with_optimizer::<Autodiff<GpuBackend>>(ctx, train, test, device)
        }
    }
}

fn with_optimizer<B: AutodiffBackend>(
    ctx:    TrainingContext<'_>,
    train:  LeptonDataset,
    test:   LeptonDataset,
    device: B::Device,
) -> Result<TrainingOutcome> {
    match ctx.cfg.optimizer {
        OptimizerKind::Sgd => {
            let optim = SgdConfig::new().init::<B, IsolationModel<B>>();
            train_loop(ctx, train, test, optim, device)
        }
        OptimizerKind::Adam => {
            let optim = AdamConfig::new().with_epsilon(1e-8).init::<B, IsolationModel<B>>();
            train_loop(ctx, train, test, optim, device)
        }
    }
}

pub fn train_loop<B, O>(
    ctx:       TrainingContext<'_>,
    train:     LeptonDataset,
    test:      LeptonDataset,
    mut optim: O,
    device:    B::Device,
) -> Result<TrainingOutcome>
where
    B: AutodiffBackend,
    O: Optimizer<IsolationModel<B>, B>,
{
    let TrainingContext { cfg, layout, ckpt, logs } = ctx;
    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: IsolationModel<B> = cfg.model_config(layout).init(&device);
    tracing::info!(
        "Model ready: {:?} cell, {} hidden neurons, {} parameters",
        cfg.cell,
        cfg.hidden_neurons,
        model.num_params(),
    );

    let n_lep = layout.n_lepton_inputs();
    let n_trk = layout.n_track_features();
    let min_batch = if cfg.drop_last { cfg.batch_size } else { 0 };
    let test = Arc::new(test);

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(LeptonBatcher::<B>::new(device.clone(), n_lep, n_trk))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train);

    let test_loader =
        DataLoaderBuilder::new(LeptonBatcher::<B::InnerBackend>::new(device.clone(), n_lep, n_trk))
            .batch_size(cfg.batch_size)
            .shuffle(cfg.seed.wrapping_add(1))
            .num_workers(1)
            .build(test.clone());

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut train_loss = f64::NAN;

    for epoch in 0..cfg.epochs {
        let mut loss_sum  = 0.0f64;
        let mut n_batches = 0usize;
        let mut correct   = 0usize;
        let mut seen      = 0usize;

        for batch in train_loader.iter() {
            if batch.size() < min_batch {
                continue;
            }
            let (loss, logits) = model.forward_loss(&batch);

            loss_sum  += loss.clone().into_scalar().elem::<f64>();
            n_batches += 1;
            correct   += correct_predictions(logits.detach(), batch.labels.clone());
            seen      += batch.size();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.lr, model, grads);
        }

        if n_batches == 0 {
            tracing::warn!(
                "Epoch {}: no full training batch (batch size {})",
                epoch,
                cfg.batch_size
            );
        }
        train_loss = if n_batches > 0 { loss_sum / n_batches as f64 } else { f64::NAN };
        let train_acc = if seen > 0 { correct as f64 / seen as f64 } else { 0.0 };

        // model.valid() drops the autodiff graph for the test pass
        let eval = evaluate_batches(&model.valid(), test_loader.iter(), min_batch);
        if eval.n_scored() == 0 {
            tracing::warn!(
                "Epoch {}: no full test batch (batch size {})",
                epoch,
                cfg.batch_size
            );
        }

        let metrics = EpochMetrics::new(epoch, train_loss, train_acc, eval.loss, eval.accuracy);
        logs.record_epoch(&metrics)?;
        logs.record_parameters(epoch, model.named_parameters());

        if !cfg.quiet {
            println!("{}", metrics.summary_line());
        }
    }

    // ── Final scoring + save ──────────────────────────────────────────────────
    let final_loader =
        DataLoaderBuilder::new(LeptonBatcher::<B::InnerBackend>::new(device.clone(), n_lep, n_trk))
            .batch_size(cfg.batch_size)
            .num_workers(1)
            .build(test);
    let test_eval = evaluate_batches(&model.valid(), final_loader.iter(), 0);

    ckpt.save_model(&model)?;
    ckpt.save_optimizer::<B, _>(&optim)?;
    tracing::info!("Training complete");

    Ok(TrainingOutcome { final_train_loss: train_loss, test: test_eval })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::domain::feature_layout::DEFAULT_TRUTH_LABEL;
    use crate::domain::lepton::LeptonEvent;
    use crate::ml::model::CellKind;

    type TestBackend = Autodiff<NdArray>;

    fn layout() -> FeatureLayout {
        FeatureLayout::new(
            vec!["pT".into(), DEFAULT_TRUTH_LABEL.into()],
            vec!["pT".into(), "d0".into()],
            DEFAULT_TRUTH_LABEL,
        )
    }

    // Isolated leptons carry a few soft tracks, non-isolated ones many hard tracks
    fn toy_events(n: usize) -> Vec<LeptonEvent> {
        (0..n)
            .map(|i| {
                let isolated = i % 2 == 0;
                let tracks = if isolated {
                    vec![vec![-1.0, -0.5]; 1 + i % 2]
                } else {
                    vec![vec![1.0, 0.8]; 3 + i % 3]
                };
                LeptonEvent::new(vec![0.1], tracks, isolated)
            })
            .collect()
    }

    fn config(dir: &std::path::Path, epochs: usize, optimizer: OptimizerKind) -> TrainConfig {
        TrainConfig {
            output_folder:  dir.display().to_string(),
            batch_size:     8,
            epochs,
            lr:             0.05,
            hidden_neurons: 8,
            optimizer,
            quiet:          true,
            ..TrainConfig::default()
        }
    }

    fn run(cfg: &TrainConfig, cell: CellKind) -> (TrainingOutcome, RunLogs) {
        let cfg = TrainConfig { cell, ..cfg.clone() };
        let ckpt = CheckpointManager::new(&cfg.output_folder).unwrap();
        let mut logs = RunLogs::new(&cfg.output_folder).unwrap();
        let layout = layout();
        let ctx = TrainingContext { cfg: &cfg, layout: &layout, ckpt: &ckpt, logs: &mut logs };
        let outcome = with_optimizer::<TestBackend>(
            ctx,
            LeptonDataset::new(toy_events(64), None),
            LeptonDataset::new(toy_events(20), None),
            Default::default(),
        )
        .unwrap();
        (outcome, logs)
    }

    #[test]
    fn test_loss_decreases_on_separable_sample() {
        let dir = tempfile::tempdir().unwrap();
        let (first, _) = run(&config(dir.path(), 1, OptimizerKind::Adam), CellKind::Rnn);

        let dir = tempfile::tempdir().unwrap();
        let (last, _) = run(&config(dir.path(), 15, OptimizerKind::Adam), CellKind::Rnn);

        assert!(
            last.final_train_loss < first.final_train_loss,
            "{} !< {}",
            last.final_train_loss,
            first.final_train_loss
        );
        assert!(last.test.accuracy > 0.9, "test accuracy {}", last.test.accuracy);
    }

    #[test]
    fn test_scores_whole_test_split_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let (outcome, logs) = run(&config(dir.path(), 2, OptimizerKind::Sgd), CellKind::Lstm);

        // 20 test leptons with batch size 8: drop_last only affects the
        // per-epoch pass, the final pass scores everything
        assert_eq!(outcome.test.n_scored(), 20);
        assert_eq!(logs.scalars.len("Loss/Train Loss"), 2);
        assert!(dir.path().join("saved_net.mpk.gz").exists());
        assert!(dir.path().join("saved_optimizer.mpk.gz").exists());
    }
}
