// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and hands the work to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`    — fine-tunes and saves the best checkpoint
//   2. `evaluate` — reloads a run and scores one partition
//   3. `inspect`  — builds the dataset and summarises it
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DatasetArgs, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "eeg-finetune",
    version = "0.1.0",
    about = "Fine-tune an EEG patch transformer for binary age / gender / trait classification."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case; nothing is computed here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Inspect(args)  => run_inspect(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::finetune_use_case::FinetuneUseCase;

    tracing::info!("Starting fine-tuning on data in: {}", args.dataset.data_dir.display());

    let report = FinetuneUseCase::new(args.into()).execute()?;

    println!(
        "Training complete. Best epoch {} (val acc {:.5}), checkpoint: {}",
        report.best_epoch,
        report.best_val_balanced_acc,
        report.checkpoint.display()
    );
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let partition = args.partition;
    let metrics = EvaluateUseCase::new(args.into()).execute()?;

    println!(
        "{} evaluation: acc: {:.5}, pr_auc: {:.5}, roc_auc: {:.5}",
        partition,
        metrics.balanced_accuracy,
        metrics.pr_auc_or_nan(),
        metrics.roc_auc_or_nan(),
    );
    println!("{}", metrics.confusion);
    Ok(())
}

fn run_inspect(args: DatasetArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let summary = InspectUseCase::new(args.into()).execute()?;
    print!("{summary}");
    Ok(())
}
