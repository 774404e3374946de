// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores batches with a non-autodiff model: mean loss, accuracy,
// and the isolated-class probability of every lepton (used for
// the ROC curve). Shared by the per-epoch test pass and by the
// `evaluate` command.

use anyhow::Result;
use burn::prelude::*;

use crate::data::batcher::LeptonBatch;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{correct_predictions, isolated_probability, IsolationModel};

/// Loss/accuracy and per-lepton scores for one pass over a dataset
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Mean loss over batches (NaN if no batch was scored)
    pub loss:     f64,
    /// Fraction of correctly classified leptons
    pub accuracy: f64,
    /// P(isolated) per lepton
    pub scores:   Vec<f32>,
    /// Truth per lepton, aligned with `scores`
    pub truth:    Vec<bool>,
}

impl Evaluation {
    pub fn n_scored(&self) -> usize {
        self.scores.len()
    }
}

/// Run the model over `batches`. Batches smaller than `min_batch`
/// are skipped (pass 0 to keep everything).
pub fn evaluate_batches<B: Backend>(
    model:     &IsolationModel<B>,
    batches:   impl Iterator<Item = LeptonBatch<B>>,
    min_batch: usize,
) -> Evaluation {
    let mut loss_sum = 0.0f64;
    let mut n_batches = 0usize;
    let mut correct  = 0usize;
    let mut scores   = Vec::new();
    let mut truth    = Vec::new();

    for batch in batches {
        if batch.size() < min_batch {
            continue;
        }
        let (loss, logits) = model.forward_loss(&batch);
        loss_sum  += loss.into_scalar().elem::<f64>();
        n_batches += 1;

        correct += correct_predictions(logits.clone(), batch.labels.clone());
        scores.extend(isolated_probability(logits).into_data().iter::<f32>());
        truth.extend(batch.labels.into_data().iter::<i64>().map(|l| l == 1));
    }

    let loss     = if n_batches > 0 { loss_sum / n_batches as f64 } else { f64::NAN };
    let accuracy = if truth.is_empty() { 0.0 } else { correct as f64 / truth.len() as f64 };

    Evaluation { loss, accuracy, scores, truth }
}

/// A trained network restored from an output folder.
pub struct Evaluator<B: Backend> {
    model:  IsolationModel<B>,
    device: B::Device,
}

impl<B: Backend> Evaluator<B> {
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg    = ckpt.load_config()?;
        let layout = ckpt.load_layout()?;
        let model: IsolationModel<B> = cfg.model_config(&layout).init(&device);
        let model = ckpt.load_model(model, &device)?;
        tracing::info!("Network loaded from '{}'", ckpt.dir().display());
        Ok(Self { model, device })
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn evaluate(&self, batches: impl Iterator<Item = LeptonBatch<B>>) -> Evaluation {
        evaluate_batches(&self.model, batches, 0)
    }
}
