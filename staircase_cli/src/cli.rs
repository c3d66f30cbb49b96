//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "staircase", version, about = "Adaptive staircase runner")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/staircase.toml")]
    pub config: PathBuf,

    /// Print results and logs as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run interleaved sequences against a simulated observer
    Simulate {
        /// Trials per sequence (overrides simulation.trials_per_sequence)
        #[arg(long, value_name = "N")]
        trials: Option<u32>,
        /// Observer seed (overrides simulation.seed)
        #[arg(long)]
        seed: Option<u64>,
        /// Observer threshold (overrides simulation.threshold)
        #[arg(long)]
        threshold: Option<f64>,
        /// Observer spread; 0 answers deterministically (overrides simulation.spread)
        #[arg(long)]
        spread: Option<f64>,
        /// Write the final trial list to this CSV (trial list only; estimate results go
        /// to stdout and can be recomputed with `estimate --trials`)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Append protocol lines of sequences with `protocol = true` to this file
        #[arg(long, value_name = "FILE")]
        protocol: Option<PathBuf>,
    },
    /// Estimate thresholds from a recorded trial list
    Estimate {
        /// Trial-list CSV (strict header)
        #[arg(long, value_name = "FILE")]
        trials: PathBuf,
    },
    /// Load and validate the config, then exit
    SelfCheck,
}
