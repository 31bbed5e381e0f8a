//! 이벤트 -- TCP 소켓 상태 변경 레코드
//!
//! [`Event`]는 커널 트레이스 라인 하나를 파싱한 결과이며,
//! 모든 필수 필드가 검증된 뒤에만 생성됩니다.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TcpState;

/// TCP 소켓 상태 변경 이벤트
///
/// 생성 후 변경되지 않는 값 타입입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 파싱 시각 (UTC)
    pub time: DateTime<Utc>,
    /// 트레이스 시점에 CPU에서 실행 중이던 프로세스명 (`-` 포함 가능)
    pub command_on_cpu: String,
    /// 트레이스 시점에 CPU에서 실행 중이던 프로세스 ID
    pub pid_on_cpu: u32,
    /// 출발지 IP
    pub source_ip: IpAddr,
    /// 목적지 IP
    pub dest_ip: IpAddr,
    /// 출발지 포트
    pub source_port: u16,
    /// 목적지 포트
    pub dest_port: u16,
    /// 이전 상태
    pub old_state: TcpState,
    /// 새 상태
    pub new_state: TcpState,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}[{}] {} -> {} {} -> {}",
            self.time.to_rfc3339(),
            self.command_on_cpu,
            self.pid_on_cpu,
            socket_addr(self.source_ip, self.source_port),
            socket_addr(self.dest_ip, self.dest_port),
            self.old_state,
            self.new_state,
        )
    }
}

fn socket_addr(ip: IpAddr, port: u16) -> String {
    std::net::SocketAddr::new(ip, port).to_string()
}
