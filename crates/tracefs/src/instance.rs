//! tracefs 트레이싱 인스턴스 수명주기
//!
//! 인스턴스는 `<mountpoint>/instances/<uid>` 디렉토리 하나이며,
//! 이 구조체가 그 디렉토리를 독점적으로 소유합니다.
//!
//! ```text
//! Uninitialized --enable--> Enabled --open--> Opened --close--> Closed --disable--> Disabled
//! ```
//!
//! `disable`은 `enable`/`open` 실패 후에도 호출할 수 있습니다.

use std::fmt;
use std::fs::{DirBuilder, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sockwatch_core::config::TraceFsConfig;
use tracing::{debug, info, warn};

use crate::error::TraceFsError;
use crate::mounts::{self, MountpointRetriever};
use crate::pipe::{PipeCloser, TracePipe};
use crate::tracepoint::{TraceFsTracepointDeducer, Tracepoint, TracepointDeducer};
use crate::uid::{UidProvider, UuidProvider};

/// 인스턴스 디렉토리 권한 (tracefs는 무시하지만 일반 파일시스템에서는 적용됨)
const INSTANCE_DIR_MODE: u32 = 0o750;

/// 스위치 파일에 쓰는 값
const SWITCH_ON: &[u8] = b"1\n";

/// 트레이싱 인스턴스 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// 메모리에만 존재
    Uninitialized,
    /// 디렉토리 생성, 트레이스포인트와 tracing_on 활성화 완료
    Enabled,
    /// trace_pipe 열림
    Opened,
    /// trace_pipe 닫힘
    Closed,
    /// 디렉토리 제거됨
    Disabled,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Enabled => write!(f, "Enabled"),
            Self::Opened => write!(f, "Opened"),
            Self::Closed => write!(f, "Closed"),
            Self::Disabled => write!(f, "Disabled"),
        }
    }
}

/// TCP 상태 변경 이벤트 링 버퍼를 노출하는 트레이싱 인스턴스
pub trait TracingInstance: Send {
    /// `open`이 반환하는 바이트 스트림
    type Pipe: Read + Send + 'static;

    /// 인스턴스를 만들고 트레이스포인트와 트레이싱을 켭니다.
    ///
    /// 실패해도 이미 만든 리소스를 되돌리지 않습니다. 호출자가 `disable`을 호출해야 합니다.
    fn enable(&mut self) -> Result<(), TraceFsError>;

    /// 링 버퍼 파이프를 엽니다.
    fn open(&mut self) -> Result<Self::Pipe, TraceFsError>;

    /// 열린 파이프를 닫습니다. 블로킹 중인 읽기는 에러로 깨어납니다.
    fn close(&mut self) -> Result<(), TraceFsError>;

    /// 인스턴스 디렉토리를 제거합니다. 존재하지 않는 경로는 에러가 아닙니다.
    fn disable(&mut self) -> Result<(), TraceFsError>;
}

/// tracefs 기반 [`TracingInstance`] 구현
pub struct TraceFsTracingInstance {
    mountpoint: Arc<dyn MountpointRetriever>,
    deducer: Box<dyn TracepointDeducer>,
    uid: Box<dyn UidProvider>,

    state: InstanceState,
    path: Option<PathBuf>,
    tracepoint: Option<Tracepoint>,
    closer: Option<PipeCloser>,
}

impl TraceFsTracingInstance {
    pub fn new(
        mountpoint: Arc<dyn MountpointRetriever>,
        deducer: Box<dyn TracepointDeducer>,
        uid: Box<dyn UidProvider>,
    ) -> Self {
        Self {
            mountpoint,
            deducer,
            uid,
            state: InstanceState::Uninitialized,
            path: None,
            tracepoint: None,
            closer: None,
        }
    }

    /// 설정으로부터 마운트 탐색, 트레이스포인트 결정, 이름 생성기를 조립합니다.
    pub fn from_config(config: &TraceFsConfig) -> Self {
        let mountpoint = mounts::retriever_from_config(config);
        let deducer = TraceFsTracepointDeducer::new(Arc::clone(&mountpoint));
        Self::new(
            mountpoint,
            Box::new(deducer),
            Box::new(UuidProvider::new(config.instance_prefix.as_str())),
        )
    }

    /// 현재 상태
    pub fn state(&self) -> InstanceState {
        self.state
    }

    /// 인스턴스 디렉토리 경로 (`enable` 이후)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 활성화된 트레이스포인트 (`enable` 성공 이후)
    pub fn tracepoint(&self) -> Option<Tracepoint> {
        self.tracepoint
    }

    fn require(
        &self,
        operation: &'static str,
        expected: InstanceState,
    ) -> Result<(), TraceFsError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(TraceFsError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

impl TracingInstance for TraceFsTracingInstance {
    type Pipe = TracePipe;

    fn enable(&mut self) -> Result<(), TraceFsError> {
        self.require("enable", InstanceState::Uninitialized)?;

        let mountpoint = self
            .mountpoint
            .retrieve_mountpoint()
            .map_err(|e| e.context("obtaining tracefs mountpoint"))?;

        let tracepoint = self
            .deducer
            .deduce_tracepoint()
            .map_err(|e| e.context("getting tracepoint"))?;

        let path = mountpoint.join("instances").join(self.uid.uid());
        // mkdir 이후 단계가 실패해도 disable이 정리할 수 있어야 함
        self.path = Some(path.clone());

        match DirBuilder::new().mode(INSTANCE_DIR_MODE).create(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(
                    path = %path.display(),
                    "tracing instance directory already exists, reusing it"
                );
            }
            Err(e) => return Err(TraceFsError::io("making instance directory", e)),
        }

        let enable_file = path.join("events").join(tracepoint.path()).join("enable");
        write_switch(&enable_file)
            .map_err(|e| TraceFsError::io(format!("enabling tracepoint {tracepoint}"), e))?;

        write_switch(&path.join("tracing_on"))
            .map_err(|e| TraceFsError::io("enabling tracing", e))?;

        info!(path = %path.display(), %tracepoint, "tracing instance enabled");
        self.tracepoint = Some(tracepoint);
        self.state = InstanceState::Enabled;
        Ok(())
    }

    fn open(&mut self) -> Result<TracePipe, TraceFsError> {
        self.require("open", InstanceState::Enabled)?;
        let Some(path) = self.path.as_ref() else {
            return Err(TraceFsError::InvalidState {
                operation: "open",
                state: self.state,
            });
        };

        let pipe_path = path.join("trace_pipe");
        let (pipe, closer) =
            TracePipe::open(&pipe_path).map_err(|e| TraceFsError::io("opening trace_pipe", e))?;

        debug!(path = %pipe_path.display(), "trace pipe opened");
        self.closer = Some(closer);
        self.state = InstanceState::Opened;
        Ok(pipe)
    }

    fn close(&mut self) -> Result<(), TraceFsError> {
        let closer = match (self.state, self.closer.take()) {
            (InstanceState::Opened, Some(closer)) => closer,
            _ => return Err(TraceFsError::PipeNotOpen),
        };

        // 닫기 실패와 무관하게 핸들은 폐기됨
        self.state = InstanceState::Closed;
        closer
            .close()
            .map_err(|e| TraceFsError::io("closing trace pipe", e))?;

        info!(path = ?self.path, "trace pipe closed");
        Ok(())
    }

    fn disable(&mut self) -> Result<(), TraceFsError> {
        match self.state {
            InstanceState::Opened => {
                return Err(TraceFsError::InvalidState {
                    operation: "disable",
                    state: self.state,
                });
            }
            InstanceState::Disabled => return Ok(()),
            InstanceState::Uninitialized | InstanceState::Enabled | InstanceState::Closed => {}
        }

        if let Some(path) = self.path.as_ref() {
            remove_instance_dir(path)
                .map_err(|e| TraceFsError::io("removing tracing instance", e))?;
            info!(path = %path.display(), "tracing instance removed");
        }

        self.state = InstanceState::Disabled;
        Ok(())
    }
}

/// 기존 tracefs 파일에 `1\n`을 씁니다. 파일을 새로 만들지 않습니다.
fn write_switch(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;
    file.write_all(SWITCH_ON)
}

/// 인스턴스 디렉토리를 제거합니다.
///
/// tracefs 인스턴스는 내용이 있어도 `rmdir` 한 번으로 제거되며,
/// 하위 파일을 개별 삭제할 수 없습니다. 일반 파일시스템에서는 재귀 삭제로 대체합니다.
fn remove_instance_dir(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(_) => match std::fs::remove_dir_all(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            result => result,
        },
    }
}
