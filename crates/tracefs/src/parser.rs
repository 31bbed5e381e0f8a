//! TCP 상태 변경 트레이스 라인 파서
//!
//! `trace_pipe` 라인 형식:
//!
//! ```text
//! <idle>-0       [000] ..s.   995.318985: inet_sock_set_state: family=AF_INET protocol=IPPROTO_TCP sport=44406 ...
//! └─ command ─┘ pid └──── metadata ────┘  └── tracepoint ──┘  └──────────── tagged fields ────────────┘
//! ```
//!
//! 프로세스명에 `-`가 들어갈 수 있으므로, 첫 `": "` 앞에서 거꾸로 가장 가까운 `-`를 찾아
//! 프로세스명과 PID를 나눕니다.

use std::borrow::Cow;
use std::net::IpAddr;

use chrono::Utc;
use sockwatch_core::event::Event;
use sockwatch_core::types::{TcpState, UnknownTcpState};

use crate::error::{EventParseError, FieldError};
use crate::field::{FieldParser, SlicingFieldParser, TaggedFields, find};

/// 관련 있는 주소 체계
const FAMILY_INET: &[u8] = b"AF_INET";
/// 관련 있는 프로토콜
const PROTOCOL_TCP: &[u8] = b"IPPROTO_TCP";

/// 원시 트레이스 라인을 이벤트로 변환하는 trait
pub trait EventParser: Send + Sync {
    /// # Errors
    /// AF_INET/IPPROTO_TCP가 아니면 [`EventParseError::Irrelevant`],
    /// 그 외 형식 오류는 문제 필드를 담은 에러를 반환합니다.
    fn to_event(&self, line: &[u8]) -> Result<Event, EventParseError>;
}

/// tracefs 이벤트 파서
#[derive(Debug, Default, Clone)]
pub struct TraceFsEventParser<F = SlicingFieldParser> {
    fields: F,
}

impl<F: FieldParser> TraceFsEventParser<F> {
    pub fn new(fields: F) -> Self {
        Self { fields }
    }
}

impl<F: FieldParser> EventParser for TraceFsEventParser<F> {
    fn to_event(&self, line: &[u8]) -> Result<Event, EventParseError> {
        let time = Utc::now();
        let mut cursor = line;

        let command = parse_command(&mut cursor).map_err(|source| EventParseError::Field {
            stage: "command",
            source,
        })?;

        let pid = self
            .fields
            .next_field(&mut cursor, b" ", true)
            .map_err(|source| EventParseError::Field {
                stage: "PID",
                source,
            })?;
        let pid_on_cpu = parse_number::<u32>(pid.bytes(), "pid")?;

        self.fields
            .next_field(&mut cursor, b": ", true)
            .map_err(|source| EventParseError::Field {
                stage: "metadata",
                source,
            })?;
        self.fields
            .next_field(&mut cursor, b": ", true)
            .map_err(|source| EventParseError::Field {
                stage: "tracepoint",
                source,
            })?;

        let tags = self
            .fields
            .tagged_fields(&mut cursor)
            .map_err(|source| EventParseError::Field {
                stage: "tagged fields",
                source,
            })?;

        // tcp_set_state에는 family/protocol 태그가 없음
        if tags.get("family").is_some_and(|family| family != FAMILY_INET) {
            return Err(EventParseError::Irrelevant);
        }
        if tags
            .get("protocol")
            .is_some_and(|protocol| protocol != PROTOCOL_TCP)
        {
            return Err(EventParseError::Irrelevant);
        }

        let source_port = parse_number::<u16>(required(&tags, "sport")?, "sport")?;
        let dest_port = parse_number::<u16>(required(&tags, "dport")?, "dport")?;
        let source_ip = parse_ip(required(&tags, "saddr")?, "saddr")?;
        let dest_ip = parse_ip(required(&tags, "daddr")?, "daddr")?;
        let old_state = parse_state(required(&tags, "oldstate")?, "oldstate")?;
        let new_state = parse_state(required(&tags, "newstate")?, "newstate")?;

        Ok(Event {
            time,
            command_on_cpu: String::from_utf8_lossy(command).into_owned(),
            pid_on_cpu,
            source_ip,
            dest_ip,
            source_port,
            dest_port,
            old_state,
            new_state,
        })
    }
}

/// 커널 TCP 상태 이름을 RFC 표기로 정규화합니다.
///
/// # Errors
/// 정규화한 이름이 [`TcpState`]에 없으면 에러를 반환합니다.
pub fn canonicalise_state(kernel_name: &str) -> Result<TcpState, UnknownTcpState> {
    let name: Cow<'_, str> = match kernel_name {
        "TCP_CLOSE" => "CLOSED".into(),
        "TCP_FIN_WAIT1" => "FIN-WAIT-1".into(),
        "TCP_FIN_WAIT2" => "FIN-WAIT-2".into(),
        "TCP_SYN_RECV" => "SYN-RECEIVED".into(),
        other => other
            .strip_prefix("TCP_")
            .unwrap_or(other)
            .replace('_', "-")
            .into(),
    };
    name.parse()
}

/// 첫 `": "` 앞의 마지막 `-`까지를 프로세스명으로 잘라냅니다.
///
/// 커서는 `-` 바로 뒤(PID 시작)로 이동합니다. 앞쪽 패딩 공백은 제거됩니다.
fn parse_command<'a>(cursor: &mut &'a [u8]) -> Result<&'a [u8], FieldError> {
    let input: &'a [u8] = *cursor;
    let colon = find(input, b": ").ok_or(FieldError::UnexpectedEndOfInput)?;
    let dash = input[..colon]
        .iter()
        .rposition(|&b| b == b'-')
        .filter(|&idx| idx > 0)
        .ok_or(FieldError::UnexpectedEndOfInput)?;

    let padded = &input[..dash];
    *cursor = &input[dash + 1..];

    let start = padded
        .iter()
        .position(|&b| b != b' ')
        .ok_or(FieldError::EmptyField)?;
    Ok(&padded[start..])
}

fn required<'a>(
    tags: &TaggedFields<'a>,
    field: &'static str,
) -> Result<&'a [u8], EventParseError> {
    tags.get(field)
        .ok_or(EventParseError::MissingField { field })
}

fn invalid(field: &'static str, value: &[u8]) -> EventParseError {
    EventParseError::InvalidField {
        field,
        value: String::from_utf8_lossy(value).into_owned(),
    }
}

fn parse_number<T: std::str::FromStr>(
    value: &[u8],
    field: &'static str,
) -> Result<T, EventParseError> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid(field, value))
}

fn parse_ip(value: &[u8], field: &'static str) -> Result<IpAddr, EventParseError> {
    parse_number::<IpAddr>(value, field)
}

fn parse_state(value: &[u8], field: &'static str) -> Result<TcpState, EventParseError> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| canonicalise_state(s).ok())
        .ok_or_else(|| EventParseError::UnknownState {
            field,
            value: String::from_utf8_lossy(value).into_owned(),
        })
}
