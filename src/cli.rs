//! Command-line interface built on clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use jobflow::Priority;

/// jobflow: submit jobs, run them, and get told when they finish.
#[derive(Debug, Parser)]
#[command(name = "jobflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./jobflow.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Webhook that receives completion events. Overrides config and WEBHOOK_URL.
    #[arg(long, global = true)]
    pub webhook_url: Option<String>,

    /// Simulated execution time in milliseconds.
    #[arg(long, global = true)]
    pub delay_ms: Option<u64>,

    /// Enables debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Emits logs as JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json_logs: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submits one job, runs it, and waits for it to finish.
    Run {
        /// Task name, e.g. "Send Email".
        task: String,

        #[arg(long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,

        /// JSON payload stored with the job.
        #[arg(long)]
        payload: Option<String>,
    },

    /// Runs a short scripted session against an in-memory store.
    Demo,
}
