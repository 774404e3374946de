use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        lstm::{Lstm, LstmConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::LeptonBatch;

/// Which recurrent layer reads the track sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// Hand-rolled Elman cell, updated one track at a time
    Rnn,
    /// Burn's LSTM over the padded sequence
    Lstm,
}

#[derive(Config, Debug)]
pub struct IsolationModelConfig {
    pub n_lepton_inputs:  usize,
    pub n_track_features: usize,
    pub hidden_neurons:   usize,
    pub cell:             CellKind,
}

impl IsolationModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> IsolationModel<B> {
        let (rnn, lstm) = match self.cell {
            CellKind::Rnn => (Some(self.build_rnn(device)), None),
            CellKind::Lstm => (
                None,
                Some(LstmConfig::new(self.n_track_features, self.hidden_neurons, true).init(device)),
            ),
        };
        let output_layer =
            LinearConfig::new(self.hidden_neurons + self.n_lepton_inputs, 2).init(device);
        IsolationModel { rnn, lstm, output_layer }
    }

    fn build_rnn<B: Backend>(&self, device: &B::Device) -> RecurrentCell<B> {
        let hidden_layer =
            LinearConfig::new(self.n_track_features + self.hidden_neurons, self.hidden_neurons)
                .init(device);
        RecurrentCell { hidden_layer, hidden_size: self.hidden_neurons }
    }
}

/// Elman cell: h' = tanh(W · [x_t, h] + b)
#[derive(Module, Debug)]
pub struct RecurrentCell<B: Backend> {
    pub hidden_layer: Linear<B>,
    pub hidden_size:  usize,
}

impl<B: Backend> RecurrentCell<B> {
    /// tracks: [batch, steps, features], step_mask: [batch, steps] → [batch, hidden]
    ///
    /// Padded steps leave the hidden state untouched, so the result is
    /// the state after each lepton's last real track (zeros if it has none).
    pub fn forward(&self, tracks: Tensor<B, 3>, step_mask: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, steps, n_features] = tracks.dims();
        let mut hidden = Tensor::<B, 2>::zeros([batch, self.hidden_size], &tracks.device());

        for t in 0..steps {
            let x_t = tracks
                .clone()
                .slice([0..batch, t..t + 1, 0..n_features])
                .reshape([batch, n_features]);
            let m_t = step_mask.clone().slice([0..batch, t..t + 1]); // [batch, 1]

            let combined = Tensor::cat(vec![x_t, hidden.clone()], 1);
            let updated  = activation::tanh(self.hidden_layer.forward(combined));

            hidden = updated * m_t.clone() + hidden * m_t.neg().add_scalar(1.0);
        }

        hidden
    }
}

#[derive(Module, Debug)]
pub struct IsolationModel<B: Backend> {
    /// Exactly one of `rnn` / `lstm` is set, chosen by `IsolationModelConfig::cell`
    pub rnn:          Option<RecurrentCell<B>>,
    pub lstm:         Option<Lstm<B>>,
    pub output_layer: Linear<B>,
}

impl<B: Backend> IsolationModel<B> {
    /// Final hidden state per lepton: [batch, hidden]
    fn encode_tracks(
        &self,
        tracks:    Tensor<B, 3>,
        step_mask: Tensor<B, 2>,
        last_step: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        match (&self.rnn, &self.lstm) {
            (Some(cell), _) => cell.forward(tracks, step_mask),
            (None, Some(lstm)) => {
                let [batch, _, _] = tracks.dims();
                let (states, _) = lstm.forward(tracks, None); // [batch, steps, hidden]
                let [_, _, hidden] = states.dims();
                (states * last_step.unsqueeze_dim::<3>(2))
                    .sum_dim(1)
                    .reshape([batch, hidden])
            }
            (None, None) => unreachable!("IsolationModel always holds a recurrent layer"),
        }
    }

    /// Raw class logits: [batch, 2]
    pub fn forward(&self, batch: &LeptonBatch<B>) -> Tensor<B, 2> {
        let hidden = self.encode_tracks(
            batch.tracks.clone(),
            batch.step_mask.clone(),
            batch.last_step.clone(),
        );
        let combined = Tensor::cat(vec![hidden, batch.leptons.clone()], 1);
        self.output_layer.forward(combined)
    }

    /// Cross-entropy on the logits. Returns (loss, logits).
    pub fn forward_loss(&self, batch: &LeptonBatch<B>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(batch);
        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits.clone(), batch.labels.clone());
        (loss, logits)
    }

    /// Parameter values keyed by a dotted path, for histogram logging.
    pub fn named_parameters(&self) -> Vec<(String, Vec<f32>)> {
        let mut out = Vec::new();
        if let Some(cell) = &self.rnn {
            push_linear(&mut out, "rnn.hidden_layer", &cell.hidden_layer);
        }
        if let Some(lstm) = &self.lstm {
            let gates = [
                ("input_gate", &lstm.input_gate),
                ("forget_gate", &lstm.forget_gate),
                ("output_gate", &lstm.output_gate),
                ("cell_gate", &lstm.cell_gate),
            ];
            for (name, gate) in gates {
                push_linear(&mut out, &format!("lstm.{name}.input_transform"), &gate.input_transform);
                push_linear(&mut out, &format!("lstm.{name}.hidden_transform"), &gate.hidden_transform);
            }
        }
        push_linear(&mut out, "output_layer", &self.output_layer);
        out
    }
}

fn push_linear<B: Backend>(out: &mut Vec<(String, Vec<f32>)>, prefix: &str, linear: &Linear<B>) {
    out.push((
        format!("{prefix}.weight"),
        linear.weight.val().into_data().iter::<f32>().collect(),
    ));
    if let Some(bias) = &linear.bias {
        out.push((format!("{prefix}.bias"), bias.val().into_data().iter::<f32>().collect()));
    }
}

/// Number of rows whose argmax matches the label
pub fn correct_predictions<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns [batch, 1]
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predicted.equal(labels).int().sum().into_scalar().elem::<i64>();
    correct as usize
}

/// Softmax probability of the isolated class: [batch]
pub fn isolated_probability<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 1> {
    let [batch, _] = logits.dims();
    activation::softmax(logits, 1)
        .slice([0..batch, 1..2])
        .reshape([batch])
}
