//! 설정 관리 -- sockwatch.toml 파싱 및 런타임 설정
//!
//! [`SockwatchConfig`]는 모든 섹션의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SOCKWATCH_TRACEFS_MOUNTPOINT=/sys/kernel/tracing` 형식)
//! 3. 설정 파일 (`sockwatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), sockwatch_core::error::SockwatchError> {
//! use sockwatch_core::config::SockwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = SockwatchConfig::load("sockwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = SockwatchConfig::parse("[tracefs]\nmountpoint = \"/sys/kernel/tracing\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SockwatchError};

/// sockwatch 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SockwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// tracefs 설정
    #[serde(default)]
    pub tracefs: TraceFsConfig,
}

impl SockwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 최종 값 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SockwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SockwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SockwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SockwatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SockwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            SockwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SOCKWATCH_{SECTION}_{FIELD}`
    /// 예: `SOCKWATCH_TRACEFS_INSTANCE_PREFIX=audit-`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SOCKWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SOCKWATCH_GENERAL_LOG_FORMAT");

        // tracefs
        override_string(
            &mut self.tracefs.mountpoint,
            "SOCKWATCH_TRACEFS_MOUNTPOINT",
        );
        override_string(
            &mut self.tracefs.mounts_file,
            "SOCKWATCH_TRACEFS_MOUNTS_FILE",
        );
        override_csv(
            &mut self.tracefs.probe_paths,
            "SOCKWATCH_TRACEFS_PROBE_PATHS",
        );
        override_string(
            &mut self.tracefs.instance_prefix,
            "SOCKWATCH_TRACEFS_INSTANCE_PREFIX",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SockwatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 인스턴스 이름은 instances/ 바로 아래 디렉토리 하나여야 함
        if self.tracefs.instance_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tracefs.instance_prefix".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }
        if self.tracefs.instance_prefix.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "tracefs.instance_prefix".to_owned(),
                reason: "must not contain '/'".to_owned(),
            }
            .into());
        }

        if self.tracefs.mountpoint.is_empty() && self.tracefs.mounts_file.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tracefs.mounts_file".to_owned(),
                reason: "must not be empty when tracefs.mountpoint is not set".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// tracefs 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceFsConfig {
    /// tracefs 마운트 경로 (비어 있으면 `mounts_file`에서 탐색)
    pub mountpoint: String,
    /// 마운트 테이블 파일
    pub mounts_file: String,
    /// 탐색 전에 접근해 볼 경로 (첫 접근 시 tracefs가 자동 마운트됨)
    pub probe_paths: Vec<String>,
    /// 트레이싱 인스턴스 디렉토리 이름 접두어
    pub instance_prefix: String,
}

impl Default for TraceFsConfig {
    fn default() -> Self {
        Self {
            mountpoint: String::new(),
            mounts_file: "/proc/mounts".to_owned(),
            probe_paths: vec![
                "/sys/kernel/debug/tracing".to_owned(),
                "/sys/kernel/tracing".to_owned(),
            ],
            instance_prefix: "sockwatch-".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        let parsed: Vec<String> = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
        if parsed.is_empty() {
            warn!(
                env_key,
                value = val.as_str(),
                "empty list in env var, ignoring"
            );
            return;
        }
        *target = parsed;
    }
}
