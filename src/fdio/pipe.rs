//! Anonymous pipe creation (spec.md §4.B `fdopen_pipe`).

use super::auto_fd::AutoFd;
use crate::error::{Error, Result};
use std::os::unix::io::FromRawFd;

pub struct Pipe {
    pub read: AutoFd,
    pub write: AutoFd,
}

/// Whether either end of the pipe should be non-blocking.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipeMode {
    pub nonblocking_read: bool,
    pub nonblocking_write: bool,
}

pub fn open_pipe(mode: PipeMode) -> Result<Pipe> {
    let mut fds = [0i32; 2];
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc != 0 {
        return Err(Error::os_error(std::io::Error::last_os_error()));
    }
    let read = unsafe { AutoFd::from_raw_fd(fds[0]) };
    let write = unsafe { AutoFd::from_raw_fd(fds[1]) };
    if mode.nonblocking_read {
        set_nonblocking(&read)?;
    }
    if mode.nonblocking_write {
        set_nonblocking(&write)?;
    }
    Ok(Pipe { read, write })
}

fn set_nonblocking(fd: &AutoFd) -> Result<()> {
    use std::os::unix::io::AsRawFd;
    let raw = fd.as_raw_fd();
    let flags = unsafe { libc::fcntl(raw, libc::F_GETFL) };
    if flags < 0 {
        return Err(Error::os_error(std::io::Error::last_os_error()));
    }
    let rc = unsafe { libc::fcntl(raw, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(Error::os_error(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdio::streambuf::FdStreamBuf;

    #[test]
    fn pipe_carries_bytes() {
        let pipe = open_pipe(PipeMode::default()).unwrap();
        let mut w = FdStreamBuf::new(pipe.write, 0);
        w.write_all(b"hi").unwrap();
        drop(w);
        let mut r = FdStreamBuf::new(pipe.read, 0);
        let mut buf = [0u8; 2];
        assert_eq!(r.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"hi");
    }

    #[test]
    fn nonblocking_read_end_reports_would_block() {
        let pipe = open_pipe(PipeMode {
            nonblocking_read: true,
            nonblocking_write: false,
        })
        .unwrap();
        let mut r = FdStreamBuf::new(pipe.read, 0);
        let mut buf = [0u8; 8];
        match r.read_nonblocking(&mut buf).unwrap() {
            super::super::streambuf::ReadOutcome::WouldBlock => {}
            other => panic!("expected WouldBlock, got {other:?}"),
        }
        drop(pipe.write);
    }
}
