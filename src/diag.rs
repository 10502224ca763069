//! Diagnostics facility (spec.md §5, §9 "Cyclic structures").
//!
//! The reference keeps a process-global output stream guarded by a lock, and
//! a thread-local stack of "frames" that get replayed onto every diagnostic
//! record so nested call sites can attach context (e.g. "while parsing
//! manifest foo.manifest") without threading it through every return type.
//! We model the stack as a thread-local `Vec` of borrowed closures: pushing
//! a frame returns a guard that pops it back off on scope exit, so there is
//! no ownership cycle to manage.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Mutex;

thread_local! {
    static FRAMES: RefCell<Vec<Box<dyn Fn(&mut String)>>> = RefCell::new(Vec::new());
}

/// RAII guard returned by [`push_frame`]; pops the frame on drop.
pub struct FrameGuard {
    _private: (),
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|f| {
            f.borrow_mut().pop();
        });
    }
}

/// Push a diagnostic frame for the remainder of the current scope. The
/// closure is invoked (in innermost-to-outermost order) whenever
/// [`with_frames`] renders the current stack.
pub fn push_frame(f: impl Fn(&mut String) + 'static) -> FrameGuard {
    FRAMES.with(|frames| frames.borrow_mut().push(Box::new(f)));
    FrameGuard { _private: () }
}

/// Render the current thread's frame stack (innermost first) into `out`,
/// one `"\n  "`-indented line per frame, mirroring the reference's default
/// `diag_prologue` indent.
pub fn render_frames(out: &mut String) {
    FRAMES.with(|frames| {
        for frame in frames.borrow().iter().rev() {
            out.push_str("\n  ");
            frame(out);
        }
    });
}

/// Build a complete diagnostic message: `head` followed by the current
/// frame stack.
pub fn record(head: &str) -> String {
    let mut s = String::new();
    let _ = write!(s, "{head}");
    render_frames(&mut s);
    s
}

/// Serializes writes to the process-global diagnostics stream (spec.md §5:
/// "diag_stream_lock (RAII) serializes diagnostics output"). Progress-line
/// coordination from the reference is out of scope here (spec.md §1: CLI
/// drivers are external collaborators); this purely guards interleaving.
static STDERR_LOCK: Mutex<()> = Mutex::new(());

pub struct StderrLock<'a> {
    _guard: std::sync::MutexGuard<'a, ()>,
}

impl<'a> StderrLock<'a> {
    pub fn acquire() -> Self {
        let guard = STDERR_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        StderrLock { _guard: guard }
    }

    pub fn write(&self, msg: &str) -> io::Result<()> {
        let mut stderr = io::stderr();
        writeln!(stderr, "{msg}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_render_innermost_first() {
        let _outer = push_frame(|s| s.push_str("while building project"));
        let mut msg = String::new();
        {
            let _inner = push_frame(|s| s.push_str("while loading manifest"));
            render_frames(&mut msg);
        }
        assert_eq!(msg, "\n  while loading manifest\n  while building project");
    }

    #[test]
    fn guard_pops_frame_on_drop() {
        {
            let _g = push_frame(|s| s.push_str("x"));
        }
        let mut msg = String::new();
        render_frames(&mut msg);
        assert_eq!(msg, "");
    }
}
