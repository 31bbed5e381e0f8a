//! TCP 상태 변경 이벤트 스트림
//!
//! [`Eventer`]는 트레이싱 인스턴스 하나와 이벤트 파서 하나를 묶어
//! 외부에 [`EventSource`]로 노출합니다.
//!
//! 읽기는 한 스레드에서만 수행한다고 가정합니다. 다른 스레드는 `event()`가
//! 블로킹 중일 때 `close()`를 호출할 수 있으며, 이 경우 `event()`는
//! [`EventerError::Closed`]를 반환합니다.

use std::io::{BufRead, BufReader};
use std::sync::{Mutex, MutexGuard, PoisonError};

use metrics::counter;
use sockwatch_core::config::TraceFsConfig;
use sockwatch_core::event::Event;
use sockwatch_core::metrics as m;
use sockwatch_core::source::EventSource;
use tracing::{debug, info, trace, warn};

use crate::error::{EventParseError, EventerError};
use crate::field::SlicingFieldParser;
use crate::instance::{TraceFsTracingInstance, TracingInstance};
use crate::parser::{EventParser, TraceFsEventParser};

/// 닫힘 플래그와 인스턴스는 같은 락으로 보호됨
struct State<I> {
    closed: bool,
    instance: I,
}

/// 트레이싱 인스턴스 기반 이벤트 스트림
pub struct Eventer<I: TracingInstance, P> {
    reader: Mutex<BufReader<I::Pipe>>,
    state: Mutex<State<I>>,
    parser: P,
}

impl Eventer<TraceFsTracingInstance, TraceFsEventParser> {
    /// 설정으로 tracefs 인스턴스와 기본 파서를 조립해 이벤트 스트림을 엽니다.
    ///
    /// # Errors
    /// 인스턴스 활성화나 파이프 열기에 실패하면 에러를 반환합니다.
    pub fn from_config(config: &TraceFsConfig) -> Result<Self, EventerError> {
        Self::new(
            TraceFsTracingInstance::from_config(config),
            TraceFsEventParser::new(SlicingFieldParser),
        )
    }
}

impl<I: TracingInstance, P: EventParser> Eventer<I, P> {
    /// 인스턴스를 활성화하고 파이프를 엽니다.
    ///
    /// 어느 단계든 실패하면 `disable()`로 정리를 시도한 뒤 원래 에러를 반환합니다.
    ///
    /// # Errors
    /// `EventerError::Instance { step: "enabling" | "opening", .. }`
    pub fn new(mut instance: I, parser: P) -> Result<Self, EventerError> {
        if let Err(source) = instance.enable() {
            disable_after_failure(&mut instance, "enabling");
            return Err(EventerError::Instance {
                step: "enabling",
                source,
            });
        }

        let pipe = match instance.open() {
            Ok(pipe) => pipe,
            Err(source) => {
                disable_after_failure(&mut instance, "opening");
                return Err(EventerError::Instance {
                    step: "opening",
                    source,
                });
            }
        };

        info!("event stream opened");
        Ok(Self {
            reader: Mutex::new(BufReader::new(pipe)),
            state: Mutex::new(State {
                closed: false,
                instance,
            }),
            parser,
        })
    }

    /// 다음 관련 이벤트를 반환합니다. 이벤트가 올 때까지 블로킹합니다.
    ///
    /// # Errors
    /// - 닫힌 뒤 또는 읽는 중 닫히면 [`EventerError::Closed`]
    /// - 파이프가 EOF를 반환하면 [`EventerError::UnexpectedEndOfInput`]
    /// - 읽기 실패는 [`EventerError::Read`], 파싱 실패는 [`EventerError::Parse`]
    pub fn event(&self) -> Result<Event, EventerError> {
        let mut reader = lock(&self.reader);
        let mut line = Vec::new();

        loop {
            if self.is_closed() {
                return Err(EventerError::Closed);
            }

            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => {
                    return Err(if self.is_closed() {
                        EventerError::Closed
                    } else {
                        EventerError::UnexpectedEndOfInput
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(if self.is_closed() {
                        EventerError::Closed
                    } else {
                        EventerError::Read(e)
                    });
                }
            }

            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.is_empty() {
                trace!("skipping empty trace line");
                continue;
            }

            match self.parser.to_event(&line) {
                Ok(event) => {
                    counter!(m::EVENTS_TOTAL).increment(1);
                    return Ok(event);
                }
                Err(EventParseError::Irrelevant) => {
                    counter!(m::EVENTS_IRRELEVANT_TOTAL).increment(1);
                    trace!(line = %String::from_utf8_lossy(&line), "skipping irrelevant event");
                }
                Err(e) => {
                    counter!(m::PARSE_ERRORS_TOTAL, m::LABEL_FIELD => e.field()).increment(1);
                    debug!(error = %e, "failed to parse trace line");
                    return Err(e.into());
                }
            }
        }
    }

    /// 파이프를 닫고 인스턴스를 제거합니다. 두 번째 호출부터는 아무 것도 하지 않습니다.
    ///
    /// 닫기가 실패해도 제거를 시도합니다. 첫 에러를 반환하고 두 번째 에러는 로그로 남깁니다.
    ///
    /// # Errors
    /// `EventerError::Instance { step: "closing" | "disabling", .. }`
    pub fn close(&self) -> Result<(), EventerError> {
        let mut state = lock(&self.state);
        if state.closed {
            return Ok(());
        }
        state.closed = true;

        let closed = state
            .instance
            .close()
            .map_err(|source| EventerError::Instance {
                step: "closing",
                source,
            });
        let disabled = state
            .instance
            .disable()
            .map_err(|source| EventerError::Instance {
                step: "disabling",
                source,
            });

        match (closed, disabled) {
            (Ok(()), Ok(())) => {
                info!("event stream closed");
                Ok(())
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(first), Err(second)) => {
                warn!(error = %second, "cleanup also failed after close error");
                Err(first)
            }
        }
    }

    /// `close()`가 호출되었는지 확인합니다.
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

impl<I: TracingInstance, P: EventParser> EventSource for Eventer<I, P> {
    type Error = EventerError;

    fn event(&self) -> Result<Event, EventerError> {
        Eventer::event(self)
    }

    fn close(&self) -> Result<(), EventerError> {
        Eventer::close(self)
    }
}

fn disable_after_failure<I: TracingInstance>(instance: &mut I, step: &'static str) {
    if let Err(e) = instance.disable() {
        warn!(step, error = %e, "failed to disable tracing instance after error");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FieldError, TraceFsError};
    use std::collections::VecDeque;
    use std::io::{self, Read};
    use std::sync::{Arc, Condvar, mpsc};
    use std::thread;
    use std::time::Duration;

    const LINE: &str = "<idle>-0       [000] ..s.   995.318985: inet_sock_set_state: family=AF_INET protocol=IPPROTO_TCP sport=44406 dport=80 saddr=192.168.122.38 daddr=172.217.169.4 oldstate=TCP_SYN_SENT newstate=TCP_ESTABLISHED\n";
    const IRRELEVANT: &str = "<idle>-0       [000] ..s.   995.318985: inet_sock_set_state: family=AF_INET6 protocol=IPPROTO_TCP sport=1 dport=2\n";

    // ─── 메모리 파이프 ─────────────────────────────────────────────

    #[derive(Default)]
    struct PipeState {
        data: VecDeque<u8>,
        eof: bool,
        closed: bool,
        fail: bool,
    }

    #[derive(Clone, Default)]
    struct MemoryPipe {
        shared: Arc<(Mutex<PipeState>, Condvar)>,
    }

    impl MemoryPipe {
        fn with_data(data: &str, eof: bool) -> Self {
            let pipe = Self::default();
            {
                let mut state = pipe.shared.0.lock().unwrap();
                state.data.extend(data.as_bytes());
                state.eof = eof;
            }
            pipe
        }

        fn modify(&self, f: impl FnOnce(&mut PipeState)) {
            let (lock, cvar) = &*self.shared;
            f(&mut lock.lock().unwrap());
            cvar.notify_all();
        }
    }

    impl Read for MemoryPipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let (lock, cvar) = &*self.shared;
            let mut state = lock.lock().unwrap();
            loop {
                if state.closed {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
                }
                if state.fail {
                    return Err(io::Error::other("device error"));
                }
                if !state.data.is_empty() {
                    let n = buf.len().min(state.data.len());
                    for (slot, byte) in buf.iter_mut().zip(state.data.drain(..n)) {
                        *slot = byte;
                    }
                    return Ok(n);
                }
                if state.eof {
                    return Ok(0);
                }
                state = cvar.wait(state).unwrap();
            }
        }
    }

    // ─── 메모리 인스턴스 ───────────────────────────────────────────

    #[derive(Default)]
    struct MemoryInstance {
        pipe: MemoryPipe,
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail_enable: bool,
        fail_open: bool,
        fail_close: bool,
        fail_disable: bool,
    }

    fn failure(step: &'static str) -> TraceFsError {
        TraceFsError::io(step, io::Error::other("injected"))
    }

    impl TracingInstance for MemoryInstance {
        type Pipe = MemoryPipe;

        fn enable(&mut self) -> Result<(), TraceFsError> {
            self.calls.lock().unwrap().push("enable");
            if self.fail_enable {
                return Err(failure("enable"));
            }
            Ok(())
        }

        fn open(&mut self) -> Result<MemoryPipe, TraceFsError> {
            self.calls.lock().unwrap().push("open");
            if self.fail_open {
                return Err(failure("open"));
            }
            Ok(self.pipe.clone())
        }

        fn close(&mut self) -> Result<(), TraceFsError> {
            self.calls.lock().unwrap().push("close");
            self.pipe.modify(|s| s.closed = true);
            if self.fail_close {
                return Err(failure("close"));
            }
            Ok(())
        }

        fn disable(&mut self) -> Result<(), TraceFsError> {
            self.calls.lock().unwrap().push("disable");
            if self.fail_disable {
                return Err(failure("disable"));
            }
            Ok(())
        }
    }

    struct FailingParser;

    impl EventParser for FailingParser {
        fn to_event(&self, _line: &[u8]) -> Result<Event, EventParseError> {
            Err(EventParseError::Field {
                stage: "command",
                source: FieldError::EmptyField,
            })
        }
    }

    fn parser() -> TraceFsEventParser {
        TraceFsEventParser::new(SlicingFieldParser)
    }

    fn eventer(instance: MemoryInstance) -> Eventer<MemoryInstance, TraceFsEventParser> {
        Eventer::new(instance, parser()).unwrap()
    }

    #[test]
    fn enable_failure_is_propagated_and_cleaned_up() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let instance = MemoryInstance {
            calls: Arc::clone(&calls),
            fail_enable: true,
            ..Default::default()
        };
        let err = Eventer::new(instance, parser()).err().unwrap();
        assert!(matches!(err, EventerError::Instance { step: "enabling", .. }));
        assert_eq!(*calls.lock().unwrap(), ["enable", "disable"]);
    }

    #[test]
    fn open_failure_is_propagated_and_cleaned_up() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let instance = MemoryInstance {
            calls: Arc::clone(&calls),
            fail_open: true,
            fail_disable: true,
            ..Default::default()
        };
        let err = Eventer::new(instance, parser()).err().unwrap();
        assert!(matches!(err, EventerError::Instance { step: "opening", .. }));
        assert!(err.to_string().starts_with("opening tracing instance"));
        assert_eq!(*calls.lock().unwrap(), ["enable", "open", "disable"]);
    }

    #[test]
    fn returns_parsed_event() {
        let eventer = eventer(MemoryInstance {
            pipe: MemoryPipe::with_data(LINE, false),
            ..Default::default()
        });
        let event = eventer.event().unwrap();
        assert_eq!(event.source_port, 44406);
        assert_eq!(event.dest_port, 80);
    }

    #[test]
    fn skips_empty_and_irrelevant_lines() {
        let data = format!("\n{IRRELEVANT}\n{LINE}");
        let eventer = eventer(MemoryInstance {
            pipe: MemoryPipe::with_data(&data, true),
            ..Default::default()
        });
        assert_eq!(eventer.event().unwrap().pid_on_cpu, 0);
        assert!(matches!(
            eventer.event(),
            Err(EventerError::UnexpectedEndOfInput)
        ));
    }

    #[test]
    fn last_line_without_newline_is_parsed() {
        let eventer = eventer(MemoryInstance {
            pipe: MemoryPipe::with_data(LINE.trim_end(), true),
            ..Default::default()
        });
        assert!(eventer.event().is_ok());
    }

    #[test]
    fn end_of_stream_is_unexpected() {
        let eventer = eventer(MemoryInstance {
            pipe: MemoryPipe::with_data("", true),
            ..Default::default()
        });
        assert!(matches!(
            eventer.event(),
            Err(EventerError::UnexpectedEndOfInput)
        ));
    }

    #[test]
    fn parse_error_is_propagated() {
        let eventer = Eventer::new(
            MemoryInstance {
                pipe: MemoryPipe::with_data("garbage\n", false),
                ..Default::default()
            },
            FailingParser,
        )
        .unwrap();
        let err = eventer.event().unwrap_err();
        assert!(matches!(err, EventerError::Parse(_)));
        assert!(err.to_string().starts_with("creating event from trace pipe"));
    }

    #[test]
    fn read_error_is_propagated() {
        let pipe = MemoryPipe::default();
        pipe.modify(|s| s.fail = true);
        let eventer = eventer(MemoryInstance {
            pipe,
            ..Default::default()
        });
        assert!(matches!(eventer.event(), Err(EventerError::Read(_))));
    }

    #[test]
    fn close_closes_then_disables() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let eventer = eventer(MemoryInstance {
            calls: Arc::clone(&calls),
            ..Default::default()
        });
        eventer.close().unwrap();
        assert!(eventer.is_closed());
        assert_eq!(
            *calls.lock().unwrap(),
            ["enable", "open", "close", "disable"]
        );
    }

    #[test]
    fn close_is_idempotent() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let eventer = eventer(MemoryInstance {
            calls: Arc::clone(&calls),
            fail_close: true,
            ..Default::default()
        });
        assert!(eventer.close().is_err());
        eventer.close().unwrap();
        assert_eq!(calls.lock().unwrap().len(), 4);
    }

    #[test]
    fn close_error_still_disables() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let eventer = eventer(MemoryInstance {
            calls: Arc::clone(&calls),
            fail_close: true,
            fail_disable: true,
            ..Default::default()
        });
        let err = eventer.close().unwrap_err();
        assert!(matches!(err, EventerError::Instance { step: "closing", .. }));
        assert!(calls.lock().unwrap().contains(&"disable"));
    }

    #[test]
    fn disable_error_is_returned() {
        let eventer = eventer(MemoryInstance {
            fail_disable: true,
            ..Default::default()
        });
        let err = eventer.close().unwrap_err();
        assert!(matches!(err, EventerError::Instance { step: "disabling", .. }));
    }

    #[test]
    fn event_after_close_is_closed_even_with_buffered_data() {
        let eventer = eventer(MemoryInstance {
            pipe: MemoryPipe::with_data(LINE, false),
            ..Default::default()
        });
        eventer.close().unwrap();
        assert!(matches!(eventer.event(), Err(EventerError::Closed)));
    }

    #[test]
    fn close_wakes_blocked_event() {
        let eventer = Arc::new(eventer(MemoryInstance::default()));

        let (done_tx, done_rx) = mpsc::channel();
        let reader = {
            let eventer = Arc::clone(&eventer);
            thread::spawn(move || {
                let result = eventer.event();
                done_tx.send(()).unwrap();
                result
            })
        };

        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());
        eventer.close().unwrap();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            reader.join().unwrap(),
            Err(EventerError::Closed)
        ));
    }

    #[test]
    fn usable_as_event_source() {
        fn drain<S: EventSource>(source: &S) -> Result<Event, S::Error> {
            source.event()
        }
        let eventer = eventer(MemoryInstance {
            pipe: MemoryPipe::with_data(LINE, false),
            ..Default::default()
        });
        assert!(drain(&eventer).is_ok());
        EventSource::close(&eventer).unwrap();
    }
}
