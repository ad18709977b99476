use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Jsonl,
}

#[derive(Parser, Debug)]
#[command(name = "fanout", version, about = "Run task batches with bounded concurrency")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Load this config file instead of ~/.fanout/config.toml or ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Overrides applied on top of the `[executor]` config section.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ExecutorArgs {
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Base backoff delay in milliseconds.
    #[arg(long)]
    pub base_delay_ms: Option<u64>,

    /// Default per-task timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Task factory: simulated or command.
    #[arg(long)]
    pub factory: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Plain ASCII status markers in text output.
    #[arg(long)]
    pub ascii: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Batch file (.json or .toml).
    pub file: PathBuf,

    /// Run every task one at a time.
    #[arg(long)]
    pub sequential: bool,

    /// Keep going after a task fails.
    #[arg(long)]
    pub continue_on_failure: bool,

    /// Override the batch's group ID.
    #[arg(long)]
    pub group_id: Option<String>,

    /// Draw progress bars on stderr instead of streaming events.
    #[arg(long)]
    pub progress: bool,

    #[command(flatten)]
    pub executor: ExecutorArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct QueueArgs {
    /// Batch file (.json or .toml); every task is enqueued with its own priority.
    pub file: PathBuf,

    #[command(flatten)]
    pub executor: ExecutorArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a batch and print its execution report.
    Run(RunArgs),
    /// Feed a batch through the priority queue and wait until it drains.
    Queue(QueueArgs),
    /// Print the effective configuration.
    Config,
}
