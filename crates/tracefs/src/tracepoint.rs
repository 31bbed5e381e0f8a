//! 트레이스포인트 결정
//!
//! 최신 커널은 `sock/inet_sock_set_state`를, 구형 커널은 같은 이벤트를
//! `tcp/tcp_set_state`로 노출합니다. 구형 이벤트에는 `family`/`protocol` 태그가 없습니다.

use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::debug;

use crate::error::TraceFsError;
use crate::mounts::MountpointRetriever;

/// TCP 상태 변경 트레이스포인트
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tracepoint {
    /// `sock/inet_sock_set_state` (Linux 4.16+)
    InetSockSetState,
    /// `tcp/tcp_set_state` (구형 커널)
    TcpSetState,
}

impl Tracepoint {
    /// 우선순위 순서
    pub const PREFERENCE: [Tracepoint; 2] = [Self::InetSockSetState, Self::TcpSetState];

    /// `events/` 아래 상대 경로
    pub fn path(&self) -> &'static str {
        match self {
            Self::InetSockSetState => "sock/inet_sock_set_state",
            Self::TcpSetState => "tcp/tcp_set_state",
        }
    }

    /// 이벤트 이름 (트레이스 라인에 나타나는 이름)
    pub fn name(&self) -> &'static str {
        match self {
            Self::InetSockSetState => "inet_sock_set_state",
            Self::TcpSetState => "tcp_set_state",
        }
    }
}

impl fmt::Display for Tracepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// 실행 중인 커널에서 사용할 트레이스포인트를 결정하는 trait
pub trait TracepointDeducer: Send + Sync {
    /// # Errors
    /// 사용할 수 있는 트레이스포인트가 없으면 [`TraceFsError::TracepointUnavailable`].
    fn deduce_tracepoint(&self) -> Result<Tracepoint, TraceFsError>;
}

/// tracefs `events/` 디렉토리를 조사하는 구현
pub struct TraceFsTracepointDeducer {
    mountpoint: Arc<dyn MountpointRetriever>,
}

impl TraceFsTracepointDeducer {
    pub fn new(mountpoint: Arc<dyn MountpointRetriever>) -> Self {
        Self { mountpoint }
    }
}

impl TracepointDeducer for TraceFsTracepointDeducer {
    fn deduce_tracepoint(&self) -> Result<Tracepoint, TraceFsError> {
        let mountpoint = self
            .mountpoint
            .retrieve_mountpoint()
            .map_err(|e| e.context("obtaining tracefs mountpoint"))?;
        let events = mountpoint.join("events");

        for tracepoint in Tracepoint::PREFERENCE {
            match std::fs::metadata(events.join(tracepoint.path())) {
                Ok(_) => {
                    debug!(%tracepoint, "tracepoint available");
                    return Ok(tracepoint);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(%tracepoint, "tracepoint not present");
                }
                Err(e) => {
                    return Err(TraceFsError::io(
                        format!("checking if {} event present", tracepoint.name()),
                        e,
                    ));
                }
            }
        }

        Err(TraceFsError::TracepointUnavailable)
    }
}

/// 고정된 트레이스포인트를 반환하는 구현
#[derive(Debug, Clone, Copy)]
pub struct FixedTracepoint(pub Tracepoint);

impl TracepointDeducer for FixedTracepoint {
    fn deduce_tracepoint(&self) -> Result<Tracepoint, TraceFsError> {
        Ok(self.0)
    }
}
