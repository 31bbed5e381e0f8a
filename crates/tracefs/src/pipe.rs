//! 중단 가능한 trace pipe 리더
//!
//! `trace_pipe`의 `read(2)`는 데이터가 올 때까지 블로킹하며,
//! 다른 스레드에서 fd를 닫아도 깨어나지 않습니다.
//! [`TracePipe`]는 `poll(2)`로 파이프와 `eventfd`를 함께 기다리고,
//! [`PipeCloser::close`]는 eventfd에 신호를 보낸 뒤 파이프 fd를 닫습니다.
//! 신호 이후 모든 읽기는 에러를 반환합니다.

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Shared {
    file: Mutex<Option<File>>,
    shutdown: OwnedFd,
}

impl Shared {
    fn file(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `trace_pipe` 읽기 핸들
///
/// 같은 파이프의 [`PipeCloser`]가 닫으면 블로킹 중인 읽기도 깨어나 에러를 반환합니다.
pub struct TracePipe {
    shared: Arc<Shared>,
    pipe_fd: RawFd,
}

/// [`TracePipe`]를 다른 스레드에서 닫는 핸들
#[derive(Clone)]
pub struct PipeCloser {
    shared: Arc<Shared>,
}

impl TracePipe {
    /// 경로의 파이프를 읽기 전용으로 엽니다.
    ///
    /// # Errors
    /// 파일 열기나 eventfd 생성에 실패하면 에러를 반환합니다.
    pub fn open(path: impl AsRef<Path>) -> io::Result<(Self, PipeCloser)> {
        Self::from_file(File::open(path)?)
    }

    /// 이미 열린 파일로 생성합니다. fd는 논블로킹 모드로 전환됩니다.
    ///
    /// # Errors
    /// `fcntl(2)` 또는 eventfd 생성에 실패하면 에러를 반환합니다.
    pub fn from_file(file: File) -> io::Result<(Self, PipeCloser)> {
        let pipe_fd = file.as_raw_fd();
        set_nonblocking(pipe_fd)?;

        // SAFETY: eventfd는 인자만 받으며 실패 시 -1을 반환합니다.
        let fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: fd는 방금 생성되어 다른 소유자가 없습니다.
        let shutdown = unsafe { OwnedFd::from_raw_fd(fd) };

        let shared = Arc::new(Shared {
            file: Mutex::new(Some(file)),
            shutdown,
        });
        Ok((
            Self {
                shared: Arc::clone(&shared),
                pipe_fd,
            },
            PipeCloser { shared },
        ))
    }

    /// 파이프가 읽을 수 있게 될 때까지 기다립니다.
    fn wait_readable(&self) -> io::Result<()> {
        let mut fds = [
            libc::pollfd {
                fd: self.pipe_fd,
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: self.shared.shutdown.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];

        loop {
            // SAFETY: fds는 길이 2의 유효한 pollfd 배열입니다.
            let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
            if rc >= 0 {
                break;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }

        // 종료 신호가 파이프 이벤트보다 우선
        if fds[1].revents != 0 {
            return Err(closed_error());
        }
        Ok(())
    }
}

impl Read for TracePipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            self.wait_readable()?;

            let mut guard = self.shared.file();
            let Some(file) = guard.as_mut() else {
                return Err(closed_error());
            };
            match file.read(buf) {
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::Interrupted =>
                {
                    continue;
                }
                result => return result,
            }
        }
    }
}

impl PipeCloser {
    /// 블로킹 중인 읽기를 깨우고 파이프 fd를 닫습니다.
    ///
    /// 두 번째 호출부터는 아무 것도 하지 않습니다.
    ///
    /// # Errors
    /// eventfd 쓰기에 실패하면 에러를 반환하며, 이 경우 fd는 닫지 않습니다.
    pub fn close(&self) -> io::Result<()> {
        let val: u64 = 1;
        // SAFETY: 8바이트 u64를 eventfd에 씁니다.
        let rc = unsafe {
            libc::write(
                self.shared.shutdown.as_raw_fd(),
                &val as *const u64 as *const libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if rc < 0 {
            let err = io::Error::last_os_error();
            // 카운터가 가득 차 있어도 이미 신호된 상태
            if err.kind() != io::ErrorKind::WouldBlock {
                return Err(err);
            }
        }

        drop(self.shared.file().take());
        Ok(())
    }

    /// 파이프가 이미 닫혔는지 확인합니다.
    pub fn is_closed(&self) -> bool {
        self.shared.file().is_none()
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "trace pipe closed")
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fd는 호출자가 소유한 유효한 파일 디스크립터입니다.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: 위와 동일
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
