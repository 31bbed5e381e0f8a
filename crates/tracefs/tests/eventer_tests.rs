//! 통합 테스트 -- 이벤트 스트림 전체 흐름
//!
//! 실제 tracefs 인스턴스 구현을 가짜 트리와 FIFO 위에서 구동합니다.

mod common;

use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use common::{FakeTraceFs, INET6_LINE, INET_LINE};
use sockwatch_core::{EventSource, SockwatchError, TcpState, TraceFsConfig};
use sockwatch_tracefs::{
    Eventer, EventerError, SlicingFieldParser, TraceFsEventParser, Tracepoint,
};

fn parser() -> TraceFsEventParser {
    TraceFsEventParser::new(SlicingFieldParser)
}

/// 관련 없는 라인과 빈 라인을 건너뛰고 이벤트를 반환
#[test]
fn test_events_flow_through_fifo() {
    let fs = FakeTraceFs::new(Tracepoint::InetSockSetState);
    let mut writer = fs.writer();
    let eventer = Eventer::new(fs.instance(Tracepoint::InetSockSetState), parser()).unwrap();

    write!(writer, "{INET6_LINE}\n\n{INET_LINE}\n").unwrap();

    let event = eventer.event().unwrap();
    assert_eq!(event.command_on_cpu, "<idle>");
    assert_eq!(event.source_ip, IpAddr::V4(Ipv4Addr::new(192, 168, 122, 38)));
    assert_eq!(event.dest_port, 80);
    assert_eq!(event.old_state, TcpState::SynSent);
    assert_eq!(event.new_state, TcpState::Established);

    eventer.close().unwrap();
    assert!(!fs.instance_dir.exists());
}

/// 블로킹 중인 event()는 다른 스레드의 close()로 Closed를 반환
#[test]
fn test_close_from_other_thread_returns_closed() {
    let fs = FakeTraceFs::new(Tracepoint::InetSockSetState);
    let _writer = fs.writer();
    let eventer =
        Arc::new(Eventer::new(fs.instance(Tracepoint::InetSockSetState), parser()).unwrap());

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

    assert!(matches!(reader.join().unwrap(), Err(EventerError::Closed)));
    assert!(!fs.instance_dir.exists());
}

/// close() 이후 event()는 블로킹 없이 Closed
#[test]
fn test_event_after_close() {
    let fs = FakeTraceFs::new(Tracepoint::InetSockSetState);
    let mut writer = fs.writer();
    let eventer = Eventer::new(fs.instance(Tracepoint::InetSockSetState), parser()).unwrap();
    writeln!(writer, "{INET_LINE}").unwrap();

    eventer.close().unwrap();
    eventer.close().unwrap();

    let err = eventer.event().unwrap_err();
    assert!(matches!(err, EventerError::Closed));
    assert!(matches!(SockwatchError::from(err), SockwatchError::Closed));
}

/// 쓰기 끝이 모두 닫히면 EOF는 프로토콜 이상으로 처리
#[test]
fn test_writer_hangup_is_unexpected_end_of_input() {
    let fs = FakeTraceFs::new(Tracepoint::InetSockSetState);
    let mut writer = fs.writer();
    let eventer = Eventer::new(fs.instance(Tracepoint::InetSockSetState), parser()).unwrap();

    writeln!(writer, "{INET_LINE}").unwrap();
    drop(writer);

    assert!(eventer.event().is_ok());
    assert!(matches!(
        eventer.event(),
        Err(EventerError::UnexpectedEndOfInput)
    ));
    eventer.close().unwrap();
}

/// 잘못된 라인은 파싱 에러로 전달되고 스트림은 계속 사용 가능
#[test]
fn test_parse_error_surfaces_and_stream_continues() {
    let fs = FakeTraceFs::new(Tracepoint::InetSockSetState);
    let mut writer = fs.writer();
    let eventer = Eventer::new(fs.instance(Tracepoint::InetSockSetState), parser()).unwrap();

    let broken = INET_LINE.replace("sport=44406 ", "");
    write!(writer, "{broken}\n{INET_LINE}\n").unwrap();

    let err = eventer.event().unwrap_err();
    assert!(err.to_string().contains("source port not present in event"));
    assert!(eventer.event().is_ok());
    eventer.close().unwrap();
}

/// 생성 실패 시 인스턴스 디렉토리가 남지 않음
#[test]
fn test_construction_failure_cleans_up() {
    let fs = FakeTraceFs::new(Tracepoint::InetSockSetState);
    std::fs::remove_file(fs.instance_dir.join("trace_pipe")).unwrap();

    let err = Eventer::new(fs.instance(Tracepoint::InetSockSetState), parser())
        .err()
        .unwrap();
    assert!(matches!(err, EventerError::Instance { step: "opening", .. }));
    assert!(err.to_string().contains("opening trace_pipe"));
    assert!(!fs.instance_dir.exists());
}

/// 설정 기반 생성 실패도 정리됨
#[test]
fn test_from_config_failure_cleans_up() {
    let fs = FakeTraceFs::new(Tracepoint::InetSockSetState);
    let config = TraceFsConfig {
        mountpoint: fs.root().display().to_string(),
        ..TraceFsConfig::default()
    };

    let err = Eventer::from_config(&config).err().unwrap();
    assert!(matches!(err, EventerError::Instance { step: "enabling", .. }));

    let remaining: Vec<_> = std::fs::read_dir(fs.root().join("instances"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(remaining, vec![std::ffi::OsString::from(common::UID)]);
}

/// EventSource trait 객체 경계로 사용
#[test]
fn test_generic_event_source_consumer() {
    fn first_transition<S: EventSource>(source: &S) -> Result<(TcpState, TcpState), S::Error> {
        let event = source.event()?;
        Ok((event.old_state, event.new_state))
    }

    let fs = FakeTraceFs::new(Tracepoint::InetSockSetState);
    let mut writer = fs.writer();
    let eventer = Eventer::new(fs.instance(Tracepoint::InetSockSetState), parser()).unwrap();
    writeln!(writer, "{INET_LINE}").unwrap();

    assert_eq!(
        first_transition(&eventer).unwrap(),
        (TcpState::SynSent, TcpState::Established)
    );
    EventSource::close(&eventer).unwrap();
}
