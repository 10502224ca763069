//! Owning file-descriptor streams, pipes, and readiness multiplexing
//! (spec.md §4.B), grounded in `original_source/libbutl/fdstream.hxx`.
//!
//! POSIX only for now (spec.md §11 carries forward the reference's
//! Windows-wide-char-path non-goal; the `cfg(unix)` gate here additionally
//! reflects that the reference's non-blocking-pipe semantics differ enough
//! on Windows to warrant a distinct implementation this crate does not yet
//! provide).

pub mod auto_fd;
pub mod pipe;
pub mod select;
pub mod streambuf;
pub mod stream;

pub use auto_fd::AutoFd;
pub use pipe::{open_pipe, Pipe, PipeMode};
pub use select::{select, wait_readable, Interest, Readiness};
pub use stream::{IfdStream, LineOutcome, Mode, OfdStream, OnClose};
pub use streambuf::{FdStreamBuf, ReadOutcome};
