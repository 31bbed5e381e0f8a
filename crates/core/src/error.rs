//! 에러 타입 -- 도메인별 에러 정의

/// sockwatch 최상위 에러 타입
///
/// 이벤트 소스 구현체의 에러는 문자열로 감싸서 전달합니다.
/// 각 구현 크레이트는 자신의 에러 타입에 대해 `From` 변환을 제공합니다.
#[derive(Debug, thiserror::Error)]
pub enum SockwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 트레이싱 서브시스템 에러 (인스턴스 수명주기, 이벤트 파싱 등)
    #[error("trace error: {0}")]
    Trace(String),

    /// 이벤트 소스가 이미 닫힘
    #[error("event source closed")]
    Closed,

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
