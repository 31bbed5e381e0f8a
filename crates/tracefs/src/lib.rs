//! tracefs 기반 TCP 상태 변경 이벤트 소스
//!
//! 커널 tracefs에 전용 트레이싱 인스턴스를 만들고, TCP 상태 변경
//! 트레이스포인트(`sock/inet_sock_set_state` 또는 `tcp/tcp_set_state`)를 켠 뒤
//! `trace_pipe`의 텍스트 라인을 [`sockwatch_core::Event`]로 변환합니다.
//!
//! # 구성
//!
//! - [`field`]: 바이트 커서 토크나이저
//! - [`parser`]: 트레이스 라인 → 이벤트 변환
//! - [`mounts`]: tracefs 마운트 위치 탐색
//! - [`tracepoint`]: 커널별 트레이스포인트 결정
//! - [`uid`]: 인스턴스 이름 생성
//! - [`instance`]: 인스턴스 디렉토리 수명주기
//! - [`pipe`]: 다른 스레드에서 중단 가능한 `trace_pipe` 리더
//! - [`eventer`]: 위 요소를 묶은 이벤트 스트림
//!
//! # 사용 예시
//!
//! ```no_run
//! use sockwatch_core::TraceFsConfig;
//! use sockwatch_tracefs::Eventer;
//!
//! let eventer = Eventer::from_config(&TraceFsConfig::default())?;
//! let event = eventer.event()?;
//! println!("{event}");
//! eventer.close()?;
//! # Ok::<(), sockwatch_tracefs::EventerError>(())
//! ```

pub mod error;
pub mod eventer;
pub mod field;
pub mod instance;
pub mod mounts;
pub mod parser;
pub mod pipe;
pub mod tracepoint;
pub mod uid;

// --- 주요 타입 re-export ---

// 에러
pub use error::{EventParseError, EventerError, FieldError, TraceFsError};

// 이벤트 스트림
pub use eventer::Eventer;

// 파서
pub use field::{Field, FieldParser, SlicingFieldParser, TaggedFields};
pub use parser::{EventParser, TraceFsEventParser, canonicalise_state};

// tracefs 리소스
pub use instance::{InstanceState, TraceFsTracingInstance, TracingInstance};
pub use mounts::{
    MountpointRetriever, MountsParser, ProcMountsParser, ProcMountsRetriever, StaticMountpoint,
    retriever_from_config,
};
pub use pipe::{PipeCloser, TracePipe};
pub use tracepoint::{FixedTracepoint, TraceFsTracepointDeducer, Tracepoint, TracepointDeducer};
pub use uid::{FixedUid, UidProvider, UuidProvider};
