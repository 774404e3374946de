// ============================================================
// Layer 4 — Lepton Batcher (collate)
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<LeptonEvent>
// into padded tensors.
//
// Track sequences have different lengths, so each batch is
// padded to its own longest sequence (at least one step, so a
// batch of track-less leptons still has a valid shape):
//
//   lepton 0:  t0 t1 t2          step_mask 1 1 1   last_step 0 0 1
//   lepton 1:  t0 -- --          step_mask 1 0 0   last_step 1 0 0
//   lepton 2:  -- -- --          step_mask 0 0 0   last_step 0 0 0
//
// The model uses step_mask to freeze the hidden state on padding
// and last_step to pick the final state of each sequence.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::lepton::LeptonEvent;

// ─── LeptonBatch ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct LeptonBatch<B: Backend> {
    /// Lepton inputs — shape: [batch, n_lepton_inputs]
    pub leptons: Tensor<B, 2>,

    /// Zero-padded tracks — shape: [batch, max_tracks, n_track_features]
    pub tracks: Tensor<B, 3>,

    /// 1.0 for real tracks, 0.0 for padding — shape: [batch, max_tracks]
    pub step_mask: Tensor<B, 2>,

    /// One-hot of each lepton's last real track — shape: [batch, max_tracks]
    pub last_step: Tensor<B, 2>,

    /// Class per lepton (1 = isolated) — shape: [batch]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> LeptonBatch<B> {
    pub fn size(&self) -> usize {
        self.labels.dims()[0]
    }
}

// ─── LeptonBatcher ────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct LeptonBatcher<B: Backend> {
    pub device:           B::Device,
    pub n_lepton_inputs:  usize,
    pub n_track_features: usize,
}

impl<B: Backend> LeptonBatcher<B> {
    pub fn new(device: B::Device, n_lepton_inputs: usize, n_track_features: usize) -> Self {
        Self { device, n_lepton_inputs, n_track_features }
    }
}

impl<B: Backend> Batcher<LeptonEvent, LeptonBatch<B>> for LeptonBatcher<B> {
    fn batch(&self, items: Vec<LeptonEvent>) -> LeptonBatch<B> {
        let batch_size = items.len();
        let n_lep      = self.n_lepton_inputs;
        let n_trk      = self.n_track_features;
        let max_steps  = items.iter().map(LeptonEvent::n_tracks).max().unwrap_or(0).max(1);

        let mut lepton_flat = Vec::with_capacity(batch_size * n_lep);
        let mut track_flat  = vec![0.0f32; batch_size * max_steps * n_trk];
        let mut mask_flat   = vec![0.0f32; batch_size * max_steps];
        let mut last_flat   = vec![0.0f32; batch_size * max_steps];
        let mut labels      = Vec::with_capacity(batch_size);

        for (b, item) in items.iter().enumerate() {
            lepton_flat.extend_from_slice(&item.lepton);

            for (t, track) in item.tracks.iter().enumerate() {
                let offset = (b * max_steps + t) * n_trk;
                track_flat[offset..offset + n_trk].copy_from_slice(track);
                mask_flat[b * max_steps + t] = 1.0;
            }
            if item.n_tracks() > 0 {
                last_flat[b * max_steps + item.n_tracks() - 1] = 1.0;
            }

            labels.push(item.label() as i32);
        }

        let leptons = Tensor::<B, 1>::from_floats(lepton_flat.as_slice(), &self.device)
            .reshape([batch_size, n_lep]);
        let tracks = Tensor::<B, 1>::from_floats(track_flat.as_slice(), &self.device)
            .reshape([batch_size, max_steps, n_trk]);
        let step_mask = Tensor::<B, 1>::from_floats(mask_flat.as_slice(), &self.device)
            .reshape([batch_size, max_steps]);
        let last_step = Tensor::<B, 1>::from_floats(last_flat.as_slice(), &self.device)
            .reshape([batch_size, max_steps]);
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        LeptonBatch { leptons, tracks, step_mask, last_step, labels }
    }
}
