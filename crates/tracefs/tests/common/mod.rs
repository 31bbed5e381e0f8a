//! 통합 테스트 공용 헬퍼 -- 가짜 tracefs 트리

#![allow(dead_code)]

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sockwatch_tracefs::{
    FixedTracepoint, FixedUid, StaticMountpoint, TraceFsTracingInstance, Tracepoint,
};
use tempfile::TempDir;

pub const UID: &str = "sockwatch-it";

pub const INET_LINE: &str = "<idle>-0       [000] ..s.   995.318985: inet_sock_set_state: family=AF_INET protocol=IPPROTO_TCP sport=44406 dport=80 saddr=192.168.122.38 daddr=172.217.169.4 saddrv6=::ffff:192.168.122.38 daddrv6=::ffff:172.217.169.4 oldstate=TCP_SYN_SENT newstate=TCP_ESTABLISHED";

pub const INET6_LINE: &str = "sshd-1022    [002] ..s1  4120.778301: inet_sock_set_state: family=AF_INET6 protocol=IPPROTO_TCP sport=22 dport=50122 saddr=0.0.0.0 daddr=0.0.0.0 saddrv6=fe80::1 daddrv6=fe80::2 oldstate=TCP_SYN_RECV newstate=TCP_ESTABLISHED";

/// 커널이 만드는 tracefs 구조를 임시 디렉토리에 흉내냅니다.
pub struct FakeTraceFs {
    pub root: TempDir,
    pub instance_dir: PathBuf,
}

impl FakeTraceFs {
    /// `events/`와 인스턴스 디렉토리를 만듭니다. `trace_pipe`는 FIFO입니다.
    pub fn new(tracepoint: Tracepoint) -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("events").join(tracepoint.path())).unwrap();

        let instance_dir = root.path().join("instances").join(UID);
        let events = instance_dir.join("events").join(tracepoint.path());
        std::fs::create_dir_all(&events).unwrap();
        std::fs::write(events.join("enable"), b"0\n").unwrap();
        std::fs::write(instance_dir.join("tracing_on"), b"0\n").unwrap();
        mkfifo(&instance_dir.join("trace_pipe"));

        Self { root, instance_dir }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// FIFO 쓰기 끝을 엽니다. O_RDWR이므로 읽는 쪽이 없어도 블로킹하지 않습니다.
    pub fn writer(&self) -> File {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.instance_dir.join("trace_pipe"))
            .unwrap()
    }

    pub fn instance(&self, tracepoint: Tracepoint) -> TraceFsTracingInstance {
        TraceFsTracingInstance::new(
            Arc::new(StaticMountpoint::new(self.root())),
            Box::new(FixedTracepoint(tracepoint)),
            Box::new(FixedUid(UID.to_owned())),
        )
    }

    pub fn switch(&self, relative: &str) -> String {
        std::fs::read_to_string(self.instance_dir.join(relative)).unwrap()
    }
}

fn mkfifo(path: &Path) {
    let c_path = CString::new(path.as_os_str().as_bytes()).unwrap();
    // SAFETY: c_path는 NUL로 끝나는 유효한 경로입니다.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    assert_eq!(rc, 0, "mkfifo failed: {}", std::io::Error::last_os_error());
}
