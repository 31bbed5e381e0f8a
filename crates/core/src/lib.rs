//! sockwatch 공통 크레이트
//!
//! TCP 소켓 상태 변경 이벤트의 도메인 타입, 이벤트 소스 trait,
//! 에러 타입, 설정, 메트릭 이름을 제공합니다.
//! 실제 커널 연동은 `sockwatch-tracefs` 크레이트가 담당합니다.

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod source;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, SockwatchError};

// 설정
pub use config::{GeneralConfig, SockwatchConfig, TraceFsConfig};

// 이벤트
pub use event::Event;

// 이벤트 소스 trait
pub use source::EventSource;

// 도메인 타입
pub use types::{TcpState, UnknownTcpState};
