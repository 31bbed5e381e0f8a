//! `sockwatch config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use sockwatch_core::config::SockwatchConfig;
use sockwatch_core::error::SockwatchError;

use super::source_label;
use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Section names accepted by `config show --section`.
const SECTIONS: [&str; 2] = ["general", "tracefs"];

/// Execute the `config` command.
pub fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    loaded: Result<SockwatchConfig, SockwatchError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, loaded, writer),
        ConfigAction::Show { section } => execute_show(config_path, loaded?, section, writer),
    }
}

/// Report whether the configuration loaded and validated.
///
/// # Errors
///
/// Returns `CliError::Config` when the configuration is invalid, after the report is written.
fn execute_validate(
    config_path: Option<&Path>,
    loaded: Result<SockwatchConfig, SockwatchError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let source = source_label(config_path);
    info!(source = %source, "validating configuration");

    let report = ConfigValidationReport {
        source,
        valid: loaded.is_ok(),
        errors: loaded.err().map(|e| e.to_string()).into_iter().collect(),
    };
    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

/// Display the effective configuration (file + env overrides + defaults).
///
/// # Errors
///
/// Returns `CliError::Command` for an unknown section name.
fn execute_show(
    config_path: Option<&Path>,
    config: SockwatchConfig,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = build_show_report(source_label(config_path), &config, section)?;
    writer.render(&report)
}

fn build_show_report(
    source: String,
    config: &SockwatchConfig,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let config_toml = match section.as_deref() {
        None => to_toml(config),
        Some("general") => to_toml(&config.general),
        Some("tracefs") => to_toml(&config.tracefs),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source,
        section,
        config: serde_json::to_value(config)?,
        config_toml,
    })
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {})", e))
}

/// Configuration display report.
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration source (file path or defaults)
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Effective configuration as structured data
    pub config: serde_json::Value,
    /// Serialized TOML of the selected section (text output only)
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration source (file path or defaults)
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        Ok(())
    }
}
