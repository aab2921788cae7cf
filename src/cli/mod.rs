//! CLI interface for pairscope
//!
//! Provides subcommands for:
//! - `run`: Live pair analysis over streaming ticks
//! - `capture`: Data capture only (no analysis)
//! - `analyze`: Offline analysis over captured data
//! - `config`: Show configuration

mod analyze;
mod capture;
mod run;

pub use analyze::AnalyzeArgs;
pub use capture::CaptureArgs;
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pairscope")]
#[command(about = "Pairs trading analytics engine for crypto tick data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start live pair analysis
    Run(RunArgs),
    /// Data capture only (no analysis)
    Capture(CaptureArgs),
    /// Analyze captured data offline
    Analyze(AnalyzeArgs),
    /// Show configuration
    Config,
}
