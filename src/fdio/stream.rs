//! Input/output fd streams (spec.md §4.B `ifdstream`/`ofdstream`): thin
//! `std::io::Read`/`Write` wrappers over [`FdStreamBuf`] that add open-mode
//! bookkeeping (text vs binary, skip-before-close) on top. Grounded in
//! `original_source/libbutl/fdstream.hxx`'s `ifdstream`/`ofdstream`, adapted
//! to Rust's `Read`/`Write` traits rather than `iostream`.

use super::auto_fd::AutoFd;
use super::streambuf::FdStreamBuf;
use crate::error::{Error, Result};
use std::io;

/// Whether line endings are translated (irrelevant on POSIX, kept for parity
/// with the reference's mode flag and for Windows line-ending handling).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Binary,
    Text,
}

/// What happens to unread/unwritten data when a stream is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnClose {
    /// Just close the descriptor (default).
    Close,
    /// Drain the remaining input, or flush pending output, before closing —
    /// mirrors the reference's `fdstream_mode::skip`, used when a stream
    /// feeds a child process that must see EOF rather than EPIPE.
    Skip,
}

pub struct IfdStream {
    buf: FdStreamBuf,
    mode: Mode,
    on_close: OnClose,
    /// Bytes read ahead of a line terminator by [`Self::getline_non_blocking`]
    /// but not yet returned to the caller.
    pending: Vec<u8>,
}

/// Result of a non-blocking line read (spec.md §4.D/§5 Scenario S4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Line(String),
    /// No complete line is available yet; nothing was consumed beyond what
    /// is already buffered internally.
    WouldBlock,
    /// Clean end of stream with no partial line pending.
    Eof,
}

impl IfdStream {
    pub fn new(fd: AutoFd, mode: Mode, on_close: OnClose) -> Self {
        IfdStream {
            buf: FdStreamBuf::new(fd, 0),
            mode,
            on_close,
            pending: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tellg(&self) -> u64 {
        self.buf.tellg()
    }

    /// Read everything remaining into a `String`, validating UTF-8 the way
    /// a text-mode open would (spec.md §4.H `codec::utf8`).
    pub fn read_to_string(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        io::Read::read_to_end(self, &mut bytes).map_err(Error::Io)?;
        String::from_utf8(bytes).map_err(|e| Error::invalid_argument(format!("invalid UTF-8 in stream: {e}")))
    }

    /// Read a single line (without the trailing `\n`) without blocking when
    /// no line is yet available (spec.md §4.D/§5 Scenario S4). Returns
    /// `Ok(None)` on a clean EOF with no partial line pending, or
    /// `Ok(Some(WouldBlock))`-shaped behavior surfaced as `LineOutcome`.
    pub fn getline_non_blocking(&mut self) -> Result<LineOutcome> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let mut line = self.pending.split_off(pos + 1);
                std::mem::swap(&mut line, &mut self.pending);
                line.pop();
                return Ok(LineOutcome::Line(
                    String::from_utf8(line).map_err(|e| Error::invalid_argument(format!("invalid UTF-8 in line: {e}")))?,
                ));
            }
            let mut chunk = [0u8; 4096];
            match self.buf.read_nonblocking(&mut chunk)? {
                super::streambuf::ReadOutcome::WouldBlock => return Ok(LineOutcome::WouldBlock),
                super::streambuf::ReadOutcome::Eof => {
                    if self.pending.is_empty() {
                        return Ok(LineOutcome::Eof);
                    }
                    let line = std::mem::take(&mut self.pending);
                    return Ok(LineOutcome::Line(
                        String::from_utf8(line)
                            .map_err(|e| Error::invalid_argument(format!("invalid UTF-8 in line: {e}")))?,
                    ));
                }
                super::streambuf::ReadOutcome::Data(n) => self.pending.extend_from_slice(&chunk[..n]),
            }
        }
    }

    /// Explicitly close, applying the configured on-close policy and
    /// surfacing any error (the `Drop` impl cannot do this).
    pub fn close(mut self) -> Result<()> {
        if self.on_close == OnClose::Skip {
            let mut sink = [0u8; 4096];
            loop {
                let n = self.buf.read(&mut sink)?;
                if n == 0 {
                    break;
                }
            }
        }
        Ok(())
    }
}

impl io::Read for IfdStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.buf.read(buf).map_err(to_io_error)
    }
}

pub struct OfdStream {
    buf: FdStreamBuf,
    mode: Mode,
    closed: bool,
}

impl OfdStream {
    pub fn new(fd: AutoFd, mode: Mode) -> Self {
        OfdStream {
            buf: FdStreamBuf::new(fd, 0),
            mode,
            closed: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tellp(&self) -> u64 {
        self.buf.tellp()
    }

    /// Explicitly close the stream, surfacing any OS error from the final
    /// `close(2)` (the `Drop` impl cannot surface errors, it can only
    /// assert that this was called — spec.md §4.D).
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.buf.fd_mut().close()
    }
}

impl io::Write for OfdStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.write(buf).map_err(to_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for OfdStream {
    /// spec.md §4.D: "`ofdstream` requires explicit `close` if it was opened
    /// and is not in a failed state and the destructor is not running due to
    /// exception unwinding; it asserts on violation." A panic already
    /// unwinding must not itself panic again (that aborts the process), so
    /// this only asserts when the drop is "clean".
    fn drop(&mut self) {
        if !self.closed && !self.buf.fd().is_null() && !std::thread::panicking() {
            panic!("OfdStream dropped without an explicit close()");
        }
    }
}

fn to_io_error(e: Error) -> io::Error {
    match e {
        Error::Os(e) | Error::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn pipe_pair() -> (AutoFd, AutoFd) {
        let mut fds = [0i32; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0);
        unsafe { (AutoFd::from_raw(fds[0]), AutoFd::from_raw(fds[1])) }
    }

    #[test]
    fn round_trips_through_a_pipe() {
        let (r, w) = pipe_pair();
        let mut out = OfdStream::new(w, Mode::Binary);
        out.write_all(b"ping").unwrap();
        out.close().unwrap();

        let mut input = IfdStream::new(r, Mode::Binary, OnClose::Close);
        let got = input.read_to_string().unwrap();
        assert_eq!(got, "ping");
    }

    #[test]
    fn read_to_string_validates_utf8() {
        let (r, w) = pipe_pair();
        let mut out = OfdStream::new(w, Mode::Text);
        out.write_all("héllo".as_bytes()).unwrap();
        out.close().unwrap();
        let mut input = IfdStream::new(r, Mode::Text, OnClose::Close);
        assert_eq!(input.read_to_string().unwrap(), "héllo");
    }

    #[test]
    #[should_panic(expected = "explicit close")]
    fn dropping_an_unclosed_ofdstream_panics() {
        let (_r, w) = pipe_pair();
        let out = OfdStream::new(w, Mode::Binary);
        drop(out);
    }

    #[test]
    fn getline_non_blocking_reports_would_block_then_yields_complete_lines() {
        let (r, w) = pipe_pair();
        unsafe {
            let flags = libc::fcntl(r.get(), libc::F_GETFL);
            libc::fcntl(r.get(), libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
        let mut input = IfdStream::new(r, Mode::Text, OnClose::Close);

        assert_eq!(input.getline_non_blocking().unwrap(), LineOutcome::WouldBlock);

        let mut out = OfdStream::new(w, Mode::Text);
        out.write_all(b"first\nseco").unwrap();

        assert_eq!(
            input.getline_non_blocking().unwrap(),
            LineOutcome::Line("first".to_string())
        );
        assert_eq!(input.getline_non_blocking().unwrap(), LineOutcome::WouldBlock);

        out.write_all(b"nd\n").unwrap();
        assert_eq!(
            input.getline_non_blocking().unwrap(),
            LineOutcome::Line("second".to_string())
        );

        out.close().unwrap();
        assert_eq!(input.getline_non_blocking().unwrap(), LineOutcome::Eof);
    }
}
