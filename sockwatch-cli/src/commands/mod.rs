//! Command handlers -- one module per subcommand

pub mod config;
pub mod probe;
pub mod watch;

use std::path::Path;

use sockwatch_core::config::SockwatchConfig;
use sockwatch_core::error::SockwatchError;

use crate::cli::Commands;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Run the selected subcommand.
///
/// `loaded` is the outcome of configuration loading; `config` subcommands
/// report a failure, the others propagate it.
pub async fn dispatch(
    command: Commands,
    config_path: Option<&Path>,
    loaded: Result<SockwatchConfig, SockwatchError>,
    writer: OutputWriter,
) -> Result<(), CliError> {
    match command {
        Commands::Config(args) => config::execute(args, config_path, loaded, &writer),
        Commands::Probe => probe::execute(&loaded?, &writer),
        Commands::Watch(args) => watch::execute(args, &loaded?, writer).await,
    }
}

/// Load configuration from `path`, or defaults plus env overrides when no path is given.
///
/// `log_level` (from `--log-level`) wins over both.
pub async fn load_config(
    path: Option<&Path>,
    log_level: Option<&str>,
) -> Result<SockwatchConfig, SockwatchError> {
    let mut config = match path {
        Some(path) => SockwatchConfig::load(path).await?,
        None => {
            let mut config = SockwatchConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Some(level) = log_level {
        config.general.log_level = level.to_owned();
    }
    config.validate()?;
    Ok(config)
}

/// Human-readable name of the configuration source.
pub fn source_label(path: Option<&Path>) -> String {
    path.map_or_else(|| "(defaults)".to_owned(), |p| p.display().to_string())
}
