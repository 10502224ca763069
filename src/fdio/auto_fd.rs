//! Move-only owning file descriptor (spec.md §4.B `auto_fd`). Grounded in
//! `original_source/libbutl/fdstream.hxx`'s `auto_fd`/`nullfd_t`: a negative
//! descriptor is "unopened" and closing it is a no-op, and failure to close
//! on drop is silently swallowed (the caller who cares calls [`AutoFd::close`]
//! explicitly and handles the error).

use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, RawFd};

/// Sentinel for "no descriptor" (mirrors `nullfd`), distinct from a real fd.
pub const NULLFD: RawFd = -1;

/// An owned, move-only file descriptor that closes itself on drop.
#[derive(Debug)]
pub struct AutoFd(RawFd);

impl AutoFd {
    pub const fn null() -> Self {
        AutoFd(NULLFD)
    }

    /// Take ownership of an already-open descriptor.
    ///
    /// # Safety
    /// `fd` must either be `NULLFD` or a descriptor this process owns and is
    /// not tracked by any other owning wrapper.
    pub unsafe fn from_raw(fd: RawFd) -> Self {
        AutoFd(fd)
    }

    pub fn get(&self) -> RawFd {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 < 0
    }

    /// Give up ownership without closing, returning the raw descriptor.
    pub fn release(&mut self) -> RawFd {
        std::mem::replace(&mut self.0, NULLFD)
    }

    /// Replace the held descriptor with `fd`, closing the previous one if it
    /// was open. Close failures are ignored (mirrors `auto_fd::reset`).
    pub fn reset(&mut self, fd: RawFd) {
        self.close_quiet();
        self.0 = fd;
    }

    fn close_quiet(&mut self) {
        if self.0 >= 0 {
            unsafe {
                libc::close(self.0);
            }
        }
    }

    /// Close the descriptor, surfacing any OS error. The descriptor is
    /// considered closed (reset to null) whether or not an error occurred.
    pub fn close(&mut self) -> crate::error::Result<()> {
        let fd = std::mem::replace(&mut self.0, NULLFD);
        if fd < 0 {
            return Ok(());
        }
        let rc = unsafe { libc::close(fd) };
        if rc != 0 {
            return Err(crate::error::Error::os_error(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Duplicate this descriptor (`dup`).
    pub fn try_clone(&self) -> crate::error::Result<AutoFd> {
        if self.0 < 0 {
            return Ok(AutoFd::null());
        }
        let fd = unsafe { libc::dup(self.0) };
        if fd < 0 {
            return Err(crate::error::Error::os_error(std::io::Error::last_os_error()));
        }
        Ok(AutoFd(fd))
    }
}

impl Drop for AutoFd {
    fn drop(&mut self) {
        self.close_quiet();
    }
}

impl AsRawFd for AutoFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl FromRawFd for AutoFd {
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        AutoFd(fd)
    }
}

impl IntoRawFd for AutoFd {
    fn into_raw_fd(mut self) -> RawFd {
        self.release()
    }
}

impl PartialEq for AutoFd {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for AutoFd {}
