//! `sockwatch watch` command handler
//!
//! Events are read on a blocking thread. Ctrl-C closes the event source from
//! the async side, which wakes the blocked reader with the closed sentinel.

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, info, warn};

use sockwatch_core::config::SockwatchConfig;
use sockwatch_core::error::SockwatchError;
use sockwatch_core::source::EventSource;
use sockwatch_tracefs::Eventer;

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Execute the `watch` command.
pub async fn execute(
    args: WatchArgs,
    config: &SockwatchConfig,
    writer: OutputWriter,
) -> Result<(), CliError> {
    sockwatch_core::metrics::describe_all();
    let eventer = Arc::new(Eventer::from_config(&config.tracefs)?);
    info!(count = ?args.count, "watching TCP state changes");

    let mut reader = {
        let eventer = Arc::clone(&eventer);
        tokio::task::spawn_blocking(move || {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            stream_events(eventer.as_ref(), args.count, &writer, &mut out)
        })
    };

    let (joined, closed) = tokio::select! {
        joined = &mut reader => (joined, eventer.close()),
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("interrupt received, closing event stream"),
                Err(e) => warn!(error = %e, "interrupt listener failed, closing event stream"),
            }
            let closed = eventer.close();
            (reader.await, closed)
        }
    };

    let streamed = joined
        .map_err(|e| CliError::Command(format!("event reader task failed: {e}")))??;
    closed?;

    info!(streamed, "watch finished");
    Ok(())
}

/// Write events from `source` until it closes or `limit` events were written.
///
/// Returns the number of events written.
pub fn stream_events<S>(
    source: &S,
    limit: Option<u64>,
    writer: &OutputWriter,
    out: &mut dyn Write,
) -> Result<u64, CliError>
where
    S: EventSource,
    S::Error: Into<SockwatchError>,
{
    let mut streamed = 0;
    while limit.is_none_or(|limit| streamed < limit) {
        match source.event().map_err(Into::into) {
            Ok(event) => {
                writer.write_record(out, &event)?;
                streamed += 1;
            }
            Err(SockwatchError::Closed) => {
                debug!("event source closed");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(streamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;

    use chrono::Utc;
    use sockwatch_core::event::Event;
    use sockwatch_core::types::TcpState;

    use crate::cli::OutputFormat;

    /// Replays queued results, then reports closed.
    struct ScriptedSource {
        results: Mutex<VecDeque<Result<Event, SockwatchError>>>,
    }

    impl ScriptedSource {
        fn new(results: Vec<Result<Event, SockwatchError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
            }
        }
    }

    impl EventSource for ScriptedSource {
        type Error = SockwatchError;

        fn event(&self) -> Result<Event, SockwatchError> {
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(SockwatchError::Closed))
        }

        fn close(&self) -> Result<(), SockwatchError> {
            Ok(())
        }
    }

    fn event(port: u16) -> Event {
        Event {
            time: Utc::now(),
            command_on_cpu: "curl".to_owned(),
            pid_on_cpu: 77,
            source_ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            dest_ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            source_port: port,
            dest_port: 443,
            old_state: TcpState::SynSent,
            new_state: TcpState::Established,
        }
    }

    #[test]
    fn test_stream_until_closed() {
        let source = ScriptedSource::new(vec![Ok(event(1)), Ok(event(2))]);
        let mut out = Vec::new();
        let streamed = stream_events(
            &source,
            None,
            &OutputWriter::new(OutputFormat::Text),
            &mut out,
        )
        .unwrap();

        assert_eq!(streamed, 2);
        let output = String::from_utf8(out).unwrap();
        assert_eq!(output.lines().count(), 2);
        assert!(output.contains("curl[77] 10.0.0.1:1 -> 10.0.0.2:443 SYN-SENT -> ESTABLISHED"));
    }

    #[test]
    fn test_stream_stops_at_limit() {
        let source = ScriptedSource::new(vec![Ok(event(1)), Ok(event(2)), Ok(event(3))]);
        let mut out = Vec::new();
        let streamed = stream_events(
            &source,
            Some(2),
            &OutputWriter::new(OutputFormat::Json),
            &mut out,
        )
        .unwrap();

        assert_eq!(streamed, 2);
        let output = String::from_utf8(out).unwrap();
        let ports: Vec<u64> = output
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["source_port"].as_u64().unwrap()
            })
            .collect();
        assert_eq!(ports, [1, 2]);
    }

    #[test]
    fn test_stream_propagates_source_error() {
        let source = ScriptedSource::new(vec![
            Ok(event(1)),
            Err(SockwatchError::Trace("reading trace pipe for event: boom".to_owned())),
        ]);
        let mut out = Vec::new();
        let err = stream_events(
            &source,
            None,
            &OutputWriter::new(OutputFormat::Text),
            &mut out,
        )
        .unwrap_err();

        assert_eq!(err.exit_code(), 3);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_stream_zero_limit_reads_nothing() {
        let source = ScriptedSource::new(vec![Ok(event(1))]);
        let mut out = Vec::new();
        let streamed = stream_events(
            &source,
            Some(0),
            &OutputWriter::new(OutputFormat::Text),
            &mut out,
        )
        .unwrap();
        assert_eq!(streamed, 0);
        assert!(out.is_empty());
    }
}
