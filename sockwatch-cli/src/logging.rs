//! Logging initialization for the sockwatch CLI.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `SockwatchConfig`. Logs go to stderr; stdout carries only command output.

use anyhow::{Result, anyhow};
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use sockwatch_core::config::GeneralConfig;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level`.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines
/// * `"pretty"` - Human-readable multi-line output
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer(&config.log_format)?)
        .try_init()
        .map_err(|e| {
            anyhow!(
                "failed to initialize {} tracing subscriber: {}",
                config.log_format,
                e
            )
        })
}

fn fmt_layer<S>(format: &str) -> Result<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    match format {
        "json" => Ok(layer.json().boxed()),
        "pretty" => Ok(layer.pretty().boxed()),
        other => Err(anyhow!(
            "unknown log format '{}', expected 'json' or 'pretty'",
            other
        )),
    }
}
