//! sockwatch CLI entry point
//!
//! Loads configuration, installs logging, then dispatches to a subcommand.
//! Command failures are printed to stderr and mapped to an exit code.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use crate::cli::Cli;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = commands::load_config(cli.config.as_deref(), cli.log_level.as_deref()).await;

    // A broken configuration still gets default logging; `config validate` reports it.
    let general = loaded
        .as_ref()
        .map(|config| config.general.clone())
        .unwrap_or_default();
    logging::init_tracing(&general)?;

    let writer = OutputWriter::new(cli.output);
    if let Err(e) = commands::dispatch(cli.command, cli.config.as_deref(), loaded, writer).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }

    Ok(())
}
