// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `evaluate`
// and all their configurable flags.
//
// Enum flags are parsed into clap ValueEnums here and converted
// into the application-layer types, so nothing below this layer
// depends on clap.

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{evaluate_use_case::EvaluateConfig, train_use_case::TrainConfig};
use crate::domain::feature_layout::DEFAULT_TRUTH_LABEL;
use crate::ml::{backend::BackendKind, model::CellKind, trainer::OptimizerKind};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the isolation network on a prepared sample file
    Train(TrainArgs),

    /// Score a sample file with a trained network
    Evaluate(EvaluateArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum CellArg {
    Rnn,
    Lstm,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OptimizerArg {
    Sgd,
    Adam,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendArg {
    Ndarray,
    Wgpu,
}

impl From<CellArg> for CellKind {
    fn from(c: CellArg) -> Self {
        match c {
            CellArg::Rnn  => CellKind::Rnn,
            CellArg::Lstm => CellKind::Lstm,
        }
    }
}

impl From<OptimizerArg> for OptimizerKind {
    fn from(o: OptimizerArg) -> Self {
        match o {
            OptimizerArg::Sgd  => OptimizerKind::Sgd,
            OptimizerArg::Adam => OptimizerKind::Adam,
        }
    }
}

impl From<BackendArg> for BackendKind {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Ndarray => BackendKind::NdArray,
            BackendArg::Wgpu    => BackendKind::Wgpu,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Prepared sample file (JSON with lepton/track labels and arrays)
    #[arg(long)]
    pub input_data: String,

    /// Where the network, optimizer state and logs are written
    #[arg(long)]
    pub output_folder: String,

    /// Fraction of leptons used for training, the rest is the test split
    #[arg(long, default_value_t = 0.66)]
    pub training_split: f64,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    #[arg(long, default_value_t = 0.005)]
    pub lr: f64,

    /// Size of the recurrent hidden state
    #[arg(long, default_value_t = 128)]
    pub hidden_neurons: usize,

    #[arg(long, value_enum, default_value_t = CellArg::Rnn)]
    pub cell: CellArg,

    #[arg(long, value_enum, default_value_t = OptimizerArg::Sgd)]
    pub optimizer: OptimizerArg,

    #[arg(long, value_enum, default_value_t = BackendArg::Ndarray)]
    pub backend: BackendArg,

    /// Keep only the first N tracks of each lepton
    #[arg(long)]
    pub max_tracks: Option<usize>,

    /// Standardise features using training-split statistics
    #[arg(long)]
    pub normalize: bool,

    /// Lepton column holding the isolation truth
    #[arg(long, default_value = DEFAULT_TRUTH_LABEL)]
    pub truth_label: String,

    /// Seed for the split, shuffling and weight init
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Also train on the trailing short batch of each epoch
    #[arg(long)]
    pub keep_last: bool,

    /// Do not print the per-epoch summary
    #[arg(long)]
    pub quiet: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            input_data:     a.input_data,
            output_folder:  a.output_folder,
            training_split: a.training_split,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            hidden_neurons: a.hidden_neurons,
            cell:           a.cell.into(),
            optimizer:      a.optimizer.into(),
            backend:        a.backend.into(),
            max_tracks:     a.max_tracks,
            normalize:      a.normalize,
            truth_label:    a.truth_label,
            seed:           a.seed,
            drop_last:      !a.keep_last,
            quiet:          a.quiet,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Prepared sample file to score
    #[arg(long)]
    pub input_data: String,

    /// Output folder of a previous `train` run
    #[arg(long)]
    pub model_dir: String,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, value_enum, default_value_t = BackendArg::Ndarray)]
    pub backend: BackendArg,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            input_data: a.input_data,
            model_dir:  a.model_dir,
            batch_size: a.batch_size,
            backend:    a.backend.into(),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_config(extra: &[&str]) -> TrainConfig {
        let mut argv = vec!["lepiso", "train", "--input-data", "s.json", "--output-folder", "out"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Train(args) => args.into(),
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_train_defaults() {
        let cfg = train_config(&[]);
        assert_eq!(cfg.training_split, 0.66);
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.epochs, 20);
        assert_eq!(cfg.lr, 0.005);
        assert_eq!(cfg.hidden_neurons, 128);
        assert_eq!(cfg.cell, CellKind::Rnn);
        assert_eq!(cfg.optimizer, OptimizerKind::Sgd);
        assert_eq!(cfg.backend, BackendKind::NdArray);
        assert_eq!(cfg.truth_label, DEFAULT_TRUTH_LABEL);
        assert!(cfg.drop_last);
        assert!(!cfg.normalize);
    }

    #[test]
    fn test_train_flags() {
        let cfg = train_config(&[
            "--cell", "lstm", "--optimizer", "adam", "--max-tracks", "10",
            "--keep-last", "--normalize", "--quiet",
        ]);
        assert_eq!(cfg.cell, CellKind::Lstm);
        assert_eq!(cfg.optimizer, OptimizerKind::Adam);
        assert_eq!(cfg.max_tracks, Some(10));
        assert!(!cfg.drop_last);
        assert!(cfg.normalize);
        assert!(cfg.quiet);
    }

    #[test]
    fn test_train_requires_input() {
        assert!(Cli::try_parse_from(["lepiso", "train", "--output-folder", "out"]).is_err());
    }

    #[test]
    fn test_evaluate_args() {
        let cli = Cli::parse_from([
            "lepiso", "evaluate", "--input-data", "s.json", "--model-dir", "run",
            "--backend", "wgpu",
        ]);
        let Commands::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        let cfg: EvaluateConfig = args.into();
        assert_eq!(cfg.model_dir, "run");
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.backend, BackendKind::Wgpu);
    }
}
