//! tracefs 마운트 경로 탐색
//!
//! - [`MountsParser`]: `/proc/mounts` 형식 스트림에서 파일시스템의 첫 마운트 경로를 찾음
//! - [`MountpointRetriever`]: tracefs 마운트 경로를 반환하는 확장 포인트
//! - [`ProcMountsRetriever`]: 마운트 테이블 기반 구현 (첫 성공 결과를 캐시)
//! - [`StaticMountpoint`]: 설정으로 고정된 경로

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use sockwatch_core::config::TraceFsConfig;
use tracing::debug;

use crate::error::TraceFsError;
use crate::field::{FieldParser, SlicingFieldParser};

/// tracefs 파일시스템 타입 이름
pub const TRACEFS: &str = "tracefs";

/// 마운트 테이블에서 파일시스템의 마운트 경로를 찾는 trait
pub trait MountsParser: Send + Sync {
    /// `fs_type` 디바이스의 첫 번째 마운트 경로를 반환합니다.
    ///
    /// # Errors
    /// - 해당 파일시스템이 없으면 [`TraceFsError::NotMounted`]
    /// - 읽기 실패 시 [`TraceFsError::Io`]
    /// - 라인 형식이 잘못되면 [`TraceFsError::Field`]
    fn first_mountpoint(
        &self,
        reader: &mut dyn BufRead,
        fs_type: &str,
    ) -> Result<PathBuf, TraceFsError>;
}

/// `/proc/mounts` 형식 파서
///
/// 가상 파일시스템은 디바이스 이름이 파일시스템 타입과 같다는 점을 이용합니다.
#[derive(Debug, Default, Clone)]
pub struct ProcMountsParser<F = SlicingFieldParser> {
    fields: F,
}

impl<F: FieldParser> ProcMountsParser<F> {
    pub fn new(fields: F) -> Self {
        Self { fields }
    }
}

impl<F: FieldParser> MountsParser for ProcMountsParser<F> {
    fn first_mountpoint(
        &self,
        reader: &mut dyn BufRead,
        fs_type: &str,
    ) -> Result<PathBuf, TraceFsError> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line).map_err(|e| {
                TraceFsError::io(format!("scanning mounts for {fs_type} mountpoint"), e)
            })?;
            if read == 0 {
                return Err(TraceFsError::NotMounted {
                    fs_type: fs_type.to_owned(),
                });
            }
            if line.last() == Some(&b'\n') {
                line.pop();
            }

            let mut cursor: &[u8] = &line;
            let device = self
                .fields
                .next_field(&mut cursor, b" ", true)
                .map_err(|source| TraceFsError::Field {
                    step: "getting device from mount",
                    source,
                })?;
            if device.bytes() != fs_type.as_bytes() {
                continue;
            }

            let mountpoint = self
                .fields
                .next_field(&mut cursor, b" ", true)
                .map_err(|source| TraceFsError::Field {
                    step: "getting mountpoint from mount",
                    source,
                })?;
            let unescaped = unescape_octal(mountpoint.bytes());
            return Ok(PathBuf::from(OsStr::from_bytes(&unescaped)));
        }
    }
}

/// `/proc/mounts`의 8진 이스케이프(`\040` 등)를 되돌립니다.
fn unescape_octal(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' && i + 3 < raw.len() && is_octal_escape(&raw[i + 1..i + 4]) {
            let value = raw[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    out
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3 && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}

/// tracefs 마운트 경로를 반환하는 trait
pub trait MountpointRetriever: Send + Sync {
    /// # Errors
    /// 마운트 경로를 알 수 없으면 에러를 반환합니다.
    fn retrieve_mountpoint(&self) -> Result<PathBuf, TraceFsError>;
}

/// 고정 마운트 경로
#[derive(Debug, Clone)]
pub struct StaticMountpoint(PathBuf);

impl StaticMountpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

impl MountpointRetriever for StaticMountpoint {
    fn retrieve_mountpoint(&self) -> Result<PathBuf, TraceFsError> {
        Ok(self.0.clone())
    }
}

/// 마운트 테이블 기반 tracefs 경로 탐색
///
/// tracefs는 경로에 처음 접근할 때 커널이 자동 마운트하므로,
/// 마운트 테이블을 읽기 전에 `probe_paths`를 차례로 열어 봅니다.
/// 첫 성공 결과는 캐시되어 이후 호출은 파일시스템에 접근하지 않습니다.
pub struct ProcMountsRetriever<P = ProcMountsParser> {
    parser: P,
    mounts_file: PathBuf,
    probe_paths: Vec<PathBuf>,
    cached: OnceLock<PathBuf>,
}

impl ProcMountsRetriever<ProcMountsParser> {
    /// 기본 파서로 생성합니다.
    pub fn new(mounts_file: impl Into<PathBuf>, probe_paths: Vec<PathBuf>) -> Self {
        Self::with_parser(
            ProcMountsParser::new(SlicingFieldParser),
            mounts_file,
            probe_paths,
        )
    }
}

impl<P: MountsParser> ProcMountsRetriever<P> {
    pub fn with_parser(
        parser: P,
        mounts_file: impl Into<PathBuf>,
        probe_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            parser,
            mounts_file: mounts_file.into(),
            probe_paths,
            cached: OnceLock::new(),
        }
    }

    fn poke_probe_paths(&self) {
        for path in &self.probe_paths {
            match std::fs::read_dir(path) {
                Ok(_) => {
                    debug!(path = %path.display(), "probe path accessible");
                    return;
                }
                Err(e) => debug!(path = %path.display(), error = %e, "probe path not accessible"),
            }
        }
    }
}

impl<P: MountsParser> MountpointRetriever for ProcMountsRetriever<P> {
    fn retrieve_mountpoint(&self) -> Result<PathBuf, TraceFsError> {
        if let Some(path) = self.cached.get() {
            return Ok(path.clone());
        }

        self.poke_probe_paths();

        let file = File::open(&self.mounts_file).map_err(|e| {
            TraceFsError::io(format!("opening mounts {}", self.mounts_file.display()), e)
        })?;
        let mut reader = BufReader::new(file);
        let mountpoint = self
            .parser
            .first_mountpoint(&mut reader, TRACEFS)
            .map_err(|e| e.context("reading virtual device mounts"))?;

        debug!(mountpoint = %mountpoint.display(), "tracefs mountpoint found");
        Ok(self.cached.get_or_init(|| mountpoint).clone())
    }
}

/// 설정에 맞는 마운트 경로 탐색기를 만듭니다.
///
/// `mountpoint`가 설정되어 있으면 그 경로를 그대로 사용합니다.
pub fn retriever_from_config(config: &TraceFsConfig) -> Arc<dyn MountpointRetriever> {
    if config.mountpoint.is_empty() {
        Arc::new(ProcMountsRetriever::new(
            &config.mounts_file,
            config.probe_paths.iter().map(PathBuf::from).collect(),
        ))
    } else {
        Arc::new(StaticMountpoint::new(Path::new(&config.mountpoint)))
    }
}
