//! 도메인 타입 -- TCP 상태 열거형

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// TCP 연결 상태 (RFC 793 명칭)
///
/// 커널은 `TCP_SYN_RECV`, `TCP_CLOSE` 같은 약칭을 사용하지만
/// 이 타입은 항상 RFC 표기(`SYN-RECEIVED`, `CLOSED`)를 사용합니다.
/// 커널 이름에서 변환하는 작업은 이벤트 파서가 담당합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TcpState {
    #[serde(rename = "ESTABLISHED")]
    Established,
    #[serde(rename = "SYN-SENT")]
    SynSent,
    #[serde(rename = "SYN-RECEIVED")]
    SynReceived,
    #[serde(rename = "FIN-WAIT-1")]
    FinWait1,
    #[serde(rename = "FIN-WAIT-2")]
    FinWait2,
    #[serde(rename = "TIME-WAIT")]
    TimeWait,
    #[serde(rename = "CLOSED")]
    Closed,
    #[serde(rename = "CLOSE-WAIT")]
    CloseWait,
    #[serde(rename = "LAST-ACK")]
    LastAck,
    #[serde(rename = "LISTEN")]
    Listen,
    #[serde(rename = "CLOSING")]
    Closing,
}

impl TcpState {
    /// 모든 상태 (선언 순서)
    pub const ALL: [TcpState; 11] = [
        Self::Established,
        Self::SynSent,
        Self::SynReceived,
        Self::FinWait1,
        Self::FinWait2,
        Self::TimeWait,
        Self::Closed,
        Self::CloseWait,
        Self::LastAck,
        Self::Listen,
        Self::Closing,
    ];

    /// RFC 표기 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Established => "ESTABLISHED",
            Self::SynSent => "SYN-SENT",
            Self::SynReceived => "SYN-RECEIVED",
            Self::FinWait1 => "FIN-WAIT-1",
            Self::FinWait2 => "FIN-WAIT-2",
            Self::TimeWait => "TIME-WAIT",
            Self::Closed => "CLOSED",
            Self::CloseWait => "CLOSE-WAIT",
            Self::LastAck => "LAST-ACK",
            Self::Listen => "LISTEN",
            Self::Closing => "CLOSING",
        }
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 알 수 없는 TCP 상태 이름
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tcp state: {0}")]
pub struct UnknownTcpState(pub String);

impl FromStr for TcpState {
    type Err = UnknownTcpState;

    /// RFC 표기 이름만 허용합니다 (대소문자 구분).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownTcpState(s.to_owned()))
    }
}
