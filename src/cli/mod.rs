//! CLI interface for regime-gate
//!
//! Provides subcommands for:
//! - `run`: Scanner and paper executor together
//! - `scan`: Regime scanner only
//! - `paper`: Paper executor only
//! - `status`: Show persisted paper state
//! - `config`: Show effective configuration

mod paper;
mod run;
mod scan;
mod status;

pub use paper::PaperArgs;
pub use run::RunArgs;
pub use scan::ScanArgs;
pub use status::StatusArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "regime-gate")]
#[command(about = "BTC regime classifier gating alt setups, with a paper trade engine")]
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
    /// Run the scanner and the paper executor
    Run(RunArgs),
    /// Run the regime scanner only
    Scan(ScanArgs),
    /// Run the paper executor only
    Paper(PaperArgs),
    /// Show persisted paper state
    Status(StatusArgs),
    /// Show effective configuration
    Config,
}
