// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `evaluate` and
// `inspect`, and all their configurable flags.
//
// Enum-like flags (task, optimizer, device, partition) are
// parsed through their FromStr impls, so an unknown name is
// rejected by clap with the pipeline's own error message.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    evaluate_use_case::EvaluateRequest,
    finetune_use_case::{DeviceKind, FinetuneConfig, OptimizerKind},
};
use crate::domain::{partition::Partition, task::DownstreamTask};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the classifier and save the best checkpoint
    Train(TrainArgs),

    /// Score a saved checkpoint on one partition
    Evaluate(EvaluateArgs),

    /// Build the dataset and print partition sizes and class weights
    Inspect(DatasetArgs),
}

/// Where the data lives and how it is cut into segments.
/// Shared by `train` and `inspect`.
#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// Directory with recordings.safetensors and Demographics.csv
    #[arg(long, default_value = "data/LEMON")]
    pub data_dir: PathBuf,

    /// Channel names to keep, comma separated
    #[arg(long, value_delimiter = ',', default_value = "O1,O2,F1,F2,C1,C2,P1,P2")]
    pub channels: Vec<String>,

    /// age | gender | upps
    #[arg(long, default_value = "age")]
    pub downstream_task: DownstreamTask,

    /// High-pass cutoff in Hz
    #[arg(long, default_value_t = 0.5)]
    pub highpass: f64,

    /// Skip the high-pass filter
    #[arg(long)]
    pub no_filter: bool,

    /// Samples per segment
    #[arg(long, default_value_t = 512)]
    pub segment_size: usize,

    /// Samples per patch; segment_size / patch_size patches per segment
    #[arg(long, default_value_t = 200)]
    pub patch_size: usize,

    /// Sampling rate in Hz, overriding the recordings file
    #[arg(long)]
    pub sfreq: Option<f64>,

    /// Seed for the split and the training shuffle
    #[arg(long, default_value_t = 3407)]
    pub seed: u64,
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Directory for the checkpoint, run config and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub model_dir: PathBuf,

    /// cpu | wgpu
    #[arg(long, default_value = "cpu")]
    pub device: DeviceKind,

    /// DataLoader worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// adamw | sgd
    #[arg(long, default_value = "adamw")]
    pub optimizer: OptimizerKind,

    /// Peak learning rate; cosine-annealed to 1e-6 over the run
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    #[arg(long, default_value_t = 5e-2)]
    pub weight_decay: f64,

    /// Gradient-norm clip; 0 disables clipping
    #[arg(long, default_value_t = 1.0)]
    pub clip_value: f64,

    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    /// Do not update backbone weights
    #[arg(long)]
    pub frozen: bool,

    /// Train the head at 5 × lr
    #[arg(long)]
    pub multi_lr: bool,

    #[arg(long, default_value_t = 0.1)]
    pub label_smoothing: f64,

    /// Backbone weights (.mpk.gz record) to start from
    #[arg(long)]
    pub pretrained: Option<PathBuf>,

    /// Hidden dimension of the backbone; divisible by num_heads
    #[arg(long, default_value_t = 200)]
    pub d_model: usize,

    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 4)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 800)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}

impl DatasetArgs {
    fn apply(self, cfg: &mut FinetuneConfig) {
        cfg.data_dir        = self.data_dir;
        cfg.channels        = self.channels;
        cfg.downstream_task = self.downstream_task;
        cfg.highpass_cutoff = (!self.no_filter).then_some(self.highpass);
        cfg.segment_size    = self.segment_size;
        cfg.patch_size      = self.patch_size;
        cfg.sfreq           = self.sfreq;
        cfg.seed            = self.seed;
    }
}

/// Convert CLI args into the application-layer config.
/// The application layer never sees clap types.
impl From<DatasetArgs> for FinetuneConfig {
    fn from(a: DatasetArgs) -> Self {
        let mut cfg = FinetuneConfig::default();
        a.apply(&mut cfg);
        cfg
    }
}

impl From<TrainArgs> for FinetuneConfig {
    fn from(a: TrainArgs) -> Self {
        let mut cfg = FinetuneConfig {
            model_dir:       a.model_dir,
            device:          a.device,
            num_workers:     a.num_workers,
            batch_size:      a.batch_size,
            optimizer:       a.optimizer,
            lr:              a.lr,
            weight_decay:    a.weight_decay,
            clip_value:      a.clip_value,
            epochs:          a.epochs,
            frozen:          a.frozen,
            multi_lr:        a.multi_lr,
            label_smoothing: a.label_smoothing,
            pretrained:      a.pretrained,
            d_model:         a.d_model,
            num_heads:       a.num_heads,
            num_layers:      a.num_layers,
            d_ff:            a.d_ff,
            dropout:         a.dropout,
            ..FinetuneConfig::default()
        };
        a.dataset.apply(&mut cfg);
        cfg
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory the training run wrote to
    #[arg(long, default_value = "checkpoints")]
    pub model_dir: PathBuf,

    /// Weights file; defaults to the run's best checkpoint
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// train | val | test
    #[arg(long, default_value = "test")]
    pub partition: Partition,

    /// Data directory, if it moved since training
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// cpu | wgpu; defaults to the training device
    #[arg(long)]
    pub device: Option<DeviceKind>,
}

impl From<EvaluateArgs> for EvaluateRequest {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateRequest {
            model_dir:  a.model_dir,
            checkpoint: a.checkpoint,
            partition:  a.partition,
            data_dir:   a.data_dir,
            device:     a.device,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_args_map_onto_config() {
        let cli = Cli::try_parse_from([
            "eeg-finetune", "train",
            "--downstream-task", "Gender",
            "--channels", "O1,O2",
            "--optimizer", "sgd",
            "--multi-lr",
            "--no-filter",
            "--epochs", "3",
        ])
        .unwrap();

        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: FinetuneConfig = args.into();
        assert_eq!(cfg.downstream_task, DownstreamTask::Gender);
        assert_eq!(cfg.channels, vec!["O1".to_string(), "O2".to_string()]);
        assert_eq!(cfg.optimizer, OptimizerKind::Sgd);
        assert!(cfg.multi_lr);
        assert_eq!(cfg.highpass_cutoff, None);
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.segment_size, 512);
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let res = Cli::try_parse_from(["eeg-finetune", "inspect", "--downstream-task", "handedness"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_evaluate_defaults() {
        let cli = Cli::try_parse_from(["eeg-finetune", "evaluate"]).unwrap();
        let Commands::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        let req: EvaluateRequest = args.into();
        assert_eq!(req.partition, Partition::Test);
        assert!(req.checkpoint.is_none());
    }
}
