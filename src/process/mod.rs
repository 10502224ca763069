//! Process spawning and control (spec.md §4.D), grounded in
//! `original_source/tests/process/driver.cxx` and `tests/process-term/driver.cxx`:
//! stdio plumbing via duck-typed [`Stdio`] values (spec.md §9 "Duck typing"),
//! cwd/env overrides, wait/try_wait/timed_wait, term/kill, and pipelining one
//! process's output into another's input.

pub mod search;

pub use search::path_search;

use crate::error::{Error, ProcessError, Result};
use crate::fdio::AutoFd;
use crate::path::{DirPath, Path as FPath};
use std::collections::HashMap;
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd};
use std::process::Command;
use std::time::Duration;

/// How a child's stdin/stdout/stderr is wired up. The "duck typing" from the
/// reference (anything fd-like can be passed as a redirect target) becomes,
/// in Rust, an explicit small enum rather than an overload set.
pub enum Stdio {
    Inherit,
    Null,
    Pipe,
    /// Hand the child an already-open descriptor (e.g. to chain two
    /// processes together without going through the parent).
    Fd(AutoFd),
}

impl Stdio {
    fn into_std(self) -> (std::process::Stdio, Option<AutoFd>) {
        match self {
            Stdio::Inherit => (std::process::Stdio::inherit(), None),
            Stdio::Null => (std::process::Stdio::null(), None),
            Stdio::Pipe => (std::process::Stdio::piped(), None),
            Stdio::Fd(fd) => {
                let raw = fd.as_raw_fd();
                let dup = unsafe { libc::dup(raw) };
                (unsafe { std::process::Stdio::from_raw_fd(dup) }, Some(fd))
            }
        }
    }
}

/// Parameters for [`spawn`] (spec.md §4.D "Configuration" — no single
/// context object; each call takes the overrides it needs explicitly).
pub struct SpawnOptions<'a> {
    pub cwd: Option<&'a DirPath>,
    pub env: Option<&'a HashMap<String, String>>,
    pub stdin: Stdio,
    pub stdout: Stdio,
    pub stderr: Stdio,
}

impl<'a> Default for SpawnOptions<'a> {
    fn default() -> Self {
        SpawnOptions {
            cwd: None,
            env: None,
            stdin: Stdio::Inherit,
            stdout: Stdio::Inherit,
            stderr: Stdio::Inherit,
        }
    }
}

/// A running or exited child process.
pub struct Process {
    child: std::process::Child,
    /// The parent-side end of the child's stdin pipe, if requested.
    pub in_ofd: Option<AutoFd>,
    /// The parent-side end of the child's stdout pipe, if requested.
    pub out_ifd: Option<AutoFd>,
    /// The parent-side end of the child's stderr pipe, if requested.
    pub err_ifd: Option<AutoFd>,
    exited: Option<std::process::ExitStatus>,
}

/// Spawn `program` with `args`, honoring `options`. Failure to exec is
/// reported as a [`ProcessError`] with `in_child = false` since it is
/// detected in the parent (spec.md §7).
pub fn spawn(program: &FPath, args: &[&str], options: SpawnOptions<'_>) -> Result<Process> {
    let mut cmd = Command::new(program.as_str());
    cmd.args(args);

    if let Some(cwd) = options.cwd {
        cmd.current_dir(cwd.as_str());
    }
    if let Some(env) = options.env {
        cmd.env_clear();
        cmd.envs(env.iter());
    }

    let (stdin, stdin_fd) = options.stdin.into_std();
    let (stdout, stdout_fd) = options.stdout.into_std();
    let (stderr, stderr_fd) = options.stderr.into_std();
    cmd.stdin(stdin).stdout(stdout).stderr(stderr);
    drop((stdin_fd, stdout_fd, stderr_fd)); // closed after Command dup'd them

    let mut child = cmd.spawn().map_err(|e| {
        Error::Process(ProcessError {
            in_child: false,
            source: e,
        })
    })?;

    let in_ofd = child.stdin.take().map(|s| unsafe { AutoFd::from_raw_fd(s.into_raw_fd()) });
    let out_ifd = child.stdout.take().map(|s| unsafe { AutoFd::from_raw_fd(s.into_raw_fd()) });
    let err_ifd = child.stderr.take().map(|s| unsafe { AutoFd::from_raw_fd(s.into_raw_fd()) });

    Ok(Process {
        child,
        in_ofd,
        out_ifd,
        err_ifd,
        exited: None,
    })
}

/// Spawn `second` with its stdin fed by `first`'s stdout (spec.md §4.D
/// "pipelining one process into another").
pub fn spawn_pipeline(
    first: (&FPath, &[&str], SpawnOptions<'_>),
    second: (&FPath, &[&str], SpawnOptions<'_>),
) -> Result<(Process, Process)> {
    let (prog1, args1, mut opt1) = first;
    opt1.stdout = Stdio::Pipe;
    let p1 = spawn(prog1, args1, opt1)?;
    let out_fd = p1
        .out_ifd
        .as_ref()
        .ok_or_else(|| Error::invalid_argument("pipeline: first process has no stdout pipe"))?
        .try_clone()?;

    let (prog2, args2, mut opt2) = second;
    opt2.stdin = Stdio::Fd(out_fd);
    let p2 = spawn(prog2, args2, opt2)?;
    Ok((p1, p2))
}

impl Process {
    /// Block until the child exits, returning whether it exited with status
    /// zero.
    pub fn wait(&mut self) -> Result<bool> {
        let status = self.child.wait().map_err(|e| Error::Process(ProcessError { in_child: false, source: e }))?;
        self.exited = Some(status);
        Ok(status.success())
    }

    /// Non-blocking poll: `Some(success)` if the child has already exited.
    pub fn try_wait(&mut self) -> Result<Option<bool>> {
        let status = self
            .child
            .try_wait()
            .map_err(|e| Error::Process(ProcessError { in_child: false, source: e }))?;
        if let Some(status) = status {
            self.exited = Some(status);
            return Ok(Some(status.success()));
        }
        Ok(None)
    }

    /// Poll repeatedly until the child exits or `timeout` elapses.
    pub fn timed_wait(&mut self, timeout: Duration) -> Result<Option<bool>> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Some(r) = self.try_wait()? {
                return Ok(Some(r));
            }
            if std::time::Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exited.and_then(|s| s.code())
    }

    /// Send `SIGTERM`, requesting graceful shutdown.
    #[cfg(unix)]
    pub fn term(&mut self) -> Result<()> {
        self.signal(nix::sys::signal::Signal::SIGTERM)
    }

    /// Send `SIGKILL`.
    #[cfg(unix)]
    pub fn kill(&mut self) -> Result<()> {
        self.signal(nix::sys::signal::Signal::SIGKILL)
    }

    #[cfg(unix)]
    fn signal(&mut self, sig: nix::sys::signal::Signal) -> Result<()> {
        let pid = nix::unistd::Pid::from_raw(self.child.id() as i32);
        nix::sys::signal::kill(pid, sig).map_err(|e| Error::os_error(std::io::Error::from(e)))
    }
}

impl Drop for Process {
    /// spec.md §4.E: "Destruction of a running process waits silently and
    /// discards errors." Prevents leaving a zombie behind when the caller
    /// drops a `Process` it never explicitly waited on.
    fn drop(&mut self) {
        if self.exited.is_none() {
            let _ = self.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Platform;
    use std::io::{Read, Write};

    fn sh() -> FPath {
        FPath::host("/bin/sh").unwrap()
    }

    #[test]
    fn captures_stdout_of_child() {
        let mut opts = SpawnOptions::default();
        opts.stdout = Stdio::Pipe;
        let mut p = spawn(&sh(), &["-c", "echo hello"], opts).unwrap();
        let raw = p.out_ifd.take().unwrap().into_raw_fd();
        let mut f = unsafe { std::fs::File::from_raw_fd(raw) };
        let mut out = String::new();
        f.read_to_string(&mut out).unwrap();
        assert!(p.wait().unwrap());
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn wait_reports_exit_status() {
        let p1 = spawn(&sh(), &["-c", "exit 0"], SpawnOptions::default());
        let mut p1 = p1.unwrap();
        assert!(p1.wait().unwrap());

        let mut p2 = spawn(&sh(), &["-c", "exit 3"], SpawnOptions::default()).unwrap();
        assert!(!p2.wait().unwrap());
        assert_eq!(p2.exit_code(), Some(3));
    }

    #[test]
    fn pipeline_feeds_second_process_from_first() {
        let opts1 = SpawnOptions::default();
        let opts2 = SpawnOptions { stdout: Stdio::Pipe, ..SpawnOptions::default() };
        let (mut p1, mut p2) = spawn_pipeline(
            (&sh(), &["-c", "printf 'a\\nb\\nc\\n'"], opts1),
            (&sh(), &["-c", "wc -l"], opts2),
        )
        .unwrap();
        assert!(p1.wait().unwrap());

        let mut out = String::new();
        let raw = p2.out_ifd.take().unwrap().into_raw_fd();
        let mut f = unsafe { std::fs::File::from_raw_fd(raw) };
        f.read_to_string(&mut out).unwrap();
        assert!(p2.wait().unwrap());
        assert_eq!(out.trim(), "3");
    }

    #[test]
    fn term_stops_a_sleeping_child() {
        let mut opts = SpawnOptions::default();
        opts.stdout = Stdio::Null;
        let mut p = spawn(&sh(), &["-c", "sleep 30"], opts).unwrap();
        p.term().unwrap();
        let ok = p.wait().unwrap();
        assert!(!ok);
    }

    #[test]
    fn path_search_finds_sh() {
        let found = search::path_search("sh", None);
        assert!(found.is_some() || Platform::HOST != Platform::Posix);
    }

    #[test]
    fn in_ofd_feeds_child_stdin() {
        let mut opts = SpawnOptions::default();
        opts.stdin = Stdio::Pipe;
        opts.stdout = Stdio::Pipe;
        let mut p = spawn(&sh(), &["-c", "cat"], opts).unwrap();
        let raw_in = p.in_ofd.take().unwrap().into_raw_fd();
        let mut w = unsafe { std::fs::File::from_raw_fd(raw_in) };
        w.write_all(b"echoed\n").unwrap();
        drop(w);

        let raw_out = p.out_ifd.take().unwrap().into_raw_fd();
        let mut r = unsafe { std::fs::File::from_raw_fd(raw_out) };
        let mut got = String::new();
        r.read_to_string(&mut got).unwrap();
        assert!(p.wait().unwrap());
        assert_eq!(got, "echoed\n");
    }
}
