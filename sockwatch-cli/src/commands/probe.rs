//! `sockwatch probe` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use sockwatch_core::config::SockwatchConfig;
use sockwatch_tracefs::{
    MountpointRetriever, TraceFsTracepointDeducer, TracepointDeducer, retriever_from_config,
};

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `probe` command.
///
/// Resolves the tracefs mount point and the TCP state change tracepoint
/// without creating a tracing instance.
pub fn execute(config: &SockwatchConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let report = probe(config)?;
    writer.render(&report)
}

fn probe(config: &SockwatchConfig) -> Result<ProbeReport, CliError> {
    let retriever: Arc<dyn MountpointRetriever> = retriever_from_config(&config.tracefs);
    let mountpoint = retriever.retrieve_mountpoint()?;
    let tracepoint = TraceFsTracepointDeducer::new(Arc::clone(&retriever)).deduce_tracepoint()?;

    info!(
        mountpoint = %mountpoint.display(),
        %tracepoint,
        "probe succeeded"
    );

    Ok(ProbeReport {
        mountpoint: mountpoint.display().to_string(),
        tracepoint: tracepoint.path().to_owned(),
        instance_prefix: config.tracefs.instance_prefix.clone(),
    })
}

/// Probe result.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    /// tracefs mount point
    pub mountpoint: String,
    /// Tracepoint path relative to `events/`
    pub tracepoint: String,
    /// Prefix for tracing instance directory names
    pub instance_prefix: String,
}

impl Render for ProbeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{}", "tracefs probe".bold())?;
        writeln!(w, "  Mountpoint:      {}", self.mountpoint)?;
        writeln!(w, "  Tracepoint:      {}", self.tracepoint.green())?;
        writeln!(w, "  Instance prefix: {}", self.instance_prefix)
    }
}
