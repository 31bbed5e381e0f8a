//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// sockwatch -- stream TCP socket state changes from the kernel tracing filesystem.
///
/// Use `sockwatch <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "sockwatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to a sockwatch.toml configuration file (defaults + env overrides when omitted).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON (one object per line when streaming).
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream TCP state change events until interrupted.
    Watch(WatchArgs),
    /// Show the tracefs mount point and the tracepoint this kernel offers.
    Probe,
    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- watch ----

/// Stream TCP state change events.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Stop after this many events.
    #[arg(short = 'n', long)]
    pub count: Option<u64>,
}

// ---- config ----

/// Manage sockwatch configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, tracefs).
        #[arg(long)]
        section: Option<String>,
    },
}
