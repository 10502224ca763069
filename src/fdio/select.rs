//! Multiplexed readiness wait over several descriptors (spec.md §4.B
//! `fdselect`), built on `poll(2)` via the `nix` crate rather than raw
//! `select(2)` (matches the reference's fallback to `poll` on platforms
//! where `FD_SETSIZE` is a concern).

use super::auto_fd::AutoFd;
use crate::error::{Error, Result};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::os::fd::BorrowedFd;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
    pub hup: bool,
}

/// Wait for any of `fds` to become ready for the paired interest, or until
/// `timeout` elapses (`None` blocks indefinitely). Returns one [`Readiness`]
/// per input descriptor, in order.
pub fn select(fds: &[(&AutoFd, Interest)], timeout: Option<Duration>) -> Result<Vec<Readiness>> {
    let mut pollfds: Vec<PollFd> = fds
        .iter()
        .map(|(fd, interest)| {
            let flags = match interest {
                Interest::Read => PollFlags::POLLIN,
                Interest::Write => PollFlags::POLLOUT,
            };
            let borrowed: BorrowedFd = unsafe { BorrowedFd::borrow_raw(fd.get()) };
            PollFd::new(borrowed, flags)
        })
        .collect();

    let timeout = match timeout {
        Some(d) => PollTimeout::try_from(d).unwrap_or(PollTimeout::MAX),
        None => PollTimeout::NONE,
    };

    poll(&mut pollfds, timeout).map_err(|e| Error::os_error(std::io::Error::from(e)))?;

    Ok(pollfds
        .iter()
        .map(|p| {
            let revents = p.revents().unwrap_or(PollFlags::empty());
            Readiness {
                readable: revents.contains(PollFlags::POLLIN),
                writable: revents.contains(PollFlags::POLLOUT),
                hup: revents.contains(PollFlags::POLLHUP) || revents.contains(PollFlags::POLLERR),
            }
        })
        .collect())
}

/// Convenience form for the common "wait until one read-fd has data"
/// scenario used by the fdstream non-blocking read paths.
pub fn wait_readable(fd: &AutoFd, timeout: Option<Duration>) -> Result<Readiness> {
    Ok(select(&[(fd, Interest::Read)], timeout)?.remove(0))
}
