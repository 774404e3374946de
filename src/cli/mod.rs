// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with `clap` and hands a plain config
// to Layer 2 (application). Results are printed here.
//
//   1. `train`    — fit the isolation network on a sample file
//   2. `evaluate` — score a sample file with a trained network

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "lepiso",
    version = "0.1.0",
    about = "Train a recurrent network to classify lepton isolation from track sequences."
)]
pub struct Cli {
    /// The subcommand to run (train or evaluate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. No computation here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on: {}", args.input_data);
    let out = args.output_folder.clone();

    let report = TrainUseCase::new(args.into()).execute()?;

    println!("Final train loss: {:0.4}", report.final_train_loss);
    println!("Test accuracy:    {:0.4}", report.test_accuracy);
    if let Some(auc) = report.auc {
        println!("Test ROC AUC:     {:0.4}", auc);
    }
    println!("Network and logs saved to '{}'", out);
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    tracing::info!("Evaluating '{}' with network in '{}'", args.input_data, args.model_dir);

    let report = EvaluateUseCase::new(args.into()).execute()?;

    println!("Leptons scored: {}", report.n_leptons);
    println!("Loss:           {:0.4}", report.loss);
    println!("Accuracy:       {:0.4}", report.accuracy);
    match report.auc {
        Some(auc) => println!("ROC AUC:        {:0.4}", auc),
        None      => println!("ROC AUC:        n/a (one class only)"),
    }
    Ok(())
}
