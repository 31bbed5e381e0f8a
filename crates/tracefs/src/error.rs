//! tracefs 에러 타입
//!
//! 계층별로 에러를 나눕니다.
//! - [`FieldError`]: 바이트 커서 토크나이저
//! - [`EventParseError`]: 트레이스 라인 → 이벤트 변환
//! - [`TraceFsError`]: 마운트 탐색, 트레이스포인트 결정, 인스턴스 수명주기
//! - [`EventerError`]: 외부에 노출되는 이벤트 스트림
//!
//! `From<EventerError> for SockwatchError`, `From<TraceFsError> for SockwatchError`
//! 변환이 구현되어 있어 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use std::io;

use sockwatch_core::error::SockwatchError;

use crate::instance::InstanceState;

/// 필드 토크나이저 에러
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// 구분자 또는 데이터가 더 있어야 하는데 입력이 끝남
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,

    /// 구분자 앞의 토큰이 비어 있음
    #[error("empty field")]
    EmptyField,
}

/// 트레이스 라인 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    /// AF_INET/IPPROTO_TCP 이벤트가 아님. 소비자는 이 라인을 건너뜁니다.
    #[error("irrelevant event")]
    Irrelevant,

    /// 라인 구조 파싱 실패
    #[error("parsing {stage} from event: {source}")]
    Field {
        /// 실패한 단계 (command, PID, metadata, tracepoint, tagged fields)
        stage: &'static str,
        #[source]
        source: FieldError,
    },

    /// 필수 태그 누락
    #[error("{} not present in event", describe_field(.field))]
    MissingField {
        /// 태그 이름 (sport, saddr, oldstate, ...)
        field: &'static str,
    },

    /// 태그 값 변환 실패
    #[error("invalid {} in event: '{value}'", describe_field(.field))]
    InvalidField {
        /// 태그 이름 또는 `pid`
        field: &'static str,
        /// 원본 값 (lossy UTF-8)
        value: String,
    },

    /// TCP 상태 이름을 정규화할 수 없음
    #[error("unknown {} in event: '{value}'", describe_field(.field))]
    UnknownState {
        /// `oldstate` 또는 `newstate`
        field: &'static str,
        /// 원본 값 (lossy UTF-8)
        value: String,
    },
}

impl EventParseError {
    /// 에러와 관련된 필드 이름. 메트릭 레이블로 사용합니다.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Irrelevant => "none",
            Self::Field { stage, .. } => stage,
            Self::MissingField { field }
            | Self::InvalidField { field, .. }
            | Self::UnknownState { field, .. } => field,
        }
    }
}

fn describe_field(field: &str) -> &str {
    match field {
        "pid" => "PID",
        "sport" => "source port",
        "dport" => "destination port",
        "saddr" => "source address",
        "daddr" => "destination address",
        "oldstate" => "old state",
        "newstate" => "new state",
        other => other,
    }
}

/// tracefs 리소스 에러
#[derive(Debug, thiserror::Error)]
pub enum TraceFsError {
    /// 지정한 파일시스템이 마운트되어 있지 않음
    #[error("{fs_type} not mounted")]
    NotMounted { fs_type: String },

    /// 실행 중인 커널에 사용할 수 있는 트레이스포인트가 없음
    #[error("required tracepoint not available")]
    TracepointUnavailable,

    /// 파일시스템 작업 실패
    #[error("{step}: {source}")]
    Io {
        /// 실패한 단계 (예: "making instance directory")
        step: String,
        #[source]
        source: io::Error,
    },

    /// 하위 작업 실패에 단계 이름을 덧붙임
    #[error("{context}: {source}")]
    Context {
        context: &'static str,
        #[source]
        source: Box<TraceFsError>,
    },

    /// 현재 상태에서 허용되지 않는 작업
    #[error("cannot {operation} tracing instance in state {state}")]
    InvalidState {
        operation: &'static str,
        state: InstanceState,
    },

    /// trace pipe가 열려 있지 않음
    #[error("trace pipe is not open")]
    PipeNotOpen,

    /// 마운트 테이블 라인 형식 오류
    #[error("{step}: {source}")]
    Field {
        step: &'static str,
        #[source]
        source: FieldError,
    },
}

impl TraceFsError {
    /// `io::Error`에 단계 이름을 붙입니다.
    pub(crate) fn io(step: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            step: step.into(),
            source,
        }
    }

    /// 이 에러를 `context` 단계의 실패로 감쌉니다.
    pub(crate) fn context(self, context: &'static str) -> Self {
        Self::Context {
            context,
            source: Box::new(self),
        }
    }
}

/// 이벤트 스트림 에러
#[derive(Debug, thiserror::Error)]
pub enum EventerError {
    /// 닫힌 이벤트 스트림에서 읽기를 시도함
    #[error("attempted read from closed eventer")]
    Closed,

    /// trace pipe가 EOF를 반환함. 링 버퍼는 EOF 없이 블로킹해야 합니다.
    #[error("event trace pipe returned unexpected end of input")]
    UnexpectedEndOfInput,

    /// trace pipe 읽기 실패
    #[error("reading trace pipe for event: {0}")]
    Read(#[source] io::Error),

    /// 이벤트 파싱 실패
    #[error("creating event from trace pipe: {0}")]
    Parse(#[from] EventParseError),

    /// 트레이싱 인스턴스 작업 실패
    #[error("{step} tracing instance: {source}")]
    Instance {
        step: &'static str,
        #[source]
        source: TraceFsError,
    },
}

impl From<TraceFsError> for SockwatchError {
    fn from(err: TraceFsError) -> Self {
        SockwatchError::Trace(err.to_string())
    }
}

impl From<EventerError> for SockwatchError {
    fn from(err: EventerError) -> Self {
        match err {
            EventerError::Closed => SockwatchError::Closed,
            other => SockwatchError::Trace(other.to_string()),
        }
    }
}
