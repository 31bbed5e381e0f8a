//! Output formatting abstraction for text vs JSON rendering
//!
//! Reports flow through [`OutputWriter::render`]; streamed events flow through
//! [`OutputWriter::write_record`], which emits one line per record.

use std::fmt::Display;
use std::io::Write;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Writes CLI output in the selected format.
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a report to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(&mut handle, payload)
    }

    /// Render a report to an arbitrary writer.
    ///
    /// `Text` delegates to [`Render::render_text`]; `Json` is pretty-printed.
    pub fn render_to<T: Render + Serialize>(
        &self,
        w: &mut dyn Write,
        payload: &T,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => payload.render_text(w)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }

    /// Write one streamed record as a single line and flush.
    ///
    /// `Text` uses the record's `Display`; `Json` writes compact JSON lines.
    pub fn write_record<T: Display + Serialize>(
        &self,
        w: &mut dyn Write,
        record: &T,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => writeln!(w, "{record}")?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut *w, record)?;
                writeln!(w)?;
            }
        }
        w.flush()?;
        Ok(())
    }
}

/// Human-readable text rendering, implemented by every report alongside `Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}
