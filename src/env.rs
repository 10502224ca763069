//! Small utility layer (spec.md §4.J): environment access with thread-local
//! overrides, case folding, and the thread-local current-directory override.
//!
//! Per spec.md §9 ("Global mutable state"): the process environment and CWD
//! are externally mutable. We represent them as accessor functions that
//! consult, in order, a thread-local override and then the OS; neither is
//! ever cached.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
struct EnvOverride {
    sets: HashMap<String, String>,
    unsets: std::collections::HashSet<String>,
}

thread_local! {
    static THREAD_ENV: RefCell<Vec<EnvOverride>> = RefCell::new(Vec::new());
    static THREAD_CWD: RefCell<Vec<PathBuf>> = RefCell::new(Vec::new());
}

/// Look up `name`, consulting the current thread's override stack (topmost
/// first) before falling back to the real process environment.
pub fn getenv(name: &str) -> Option<String> {
    THREAD_ENV.with(|stack| {
        for over in stack.borrow().iter().rev() {
            if over.unsets.contains(name) {
                return None;
            }
            if let Some(v) = over.sets.get(name) {
                return Some(v.clone());
            }
        }
        std::env::var(name).ok()
    })
}

/// Set a process-global environment variable. Per spec.md §5, this is not
/// thread-safe and should happen before other threads start; prefer
/// [`auto_thread_env`] to override environment for a spawned child instead.
pub fn setenv(name: &str, value: &str) {
    std::env::set_var(name, value);
}

pub fn unsetenv(name: &str) {
    std::env::remove_var(name);
}

/// RAII scope that layers a thread-local environment override on top of
/// whatever is already in effect for this thread (spec.md §4.J
/// `auto_thread_env`, §5 `thread_env`).
pub struct AutoThreadEnv {
    _private: (),
}

impl AutoThreadEnv {
    /// `entries` follows the process-env override array convention
    /// (spec.md §6): `"NAME=VALUE"` sets, bare `"NAME"` unsets. Later
    /// entries win over earlier ones within the same call.
    pub fn new<'a>(entries: impl IntoIterator<Item = &'a str>) -> Self {
        let mut over = EnvOverride::default();
        for entry in entries {
            match entry.split_once('=') {
                Some((name, value)) => {
                    over.unsets.remove(name);
                    over.sets.insert(name.to_string(), value.to_string());
                }
                None => {
                    over.sets.remove(entry);
                    over.unsets.insert(entry.to_string());
                }
            }
        }
        THREAD_ENV.with(|stack| stack.borrow_mut().push(over));
        AutoThreadEnv { _private: () }
    }
}

impl Drop for AutoThreadEnv {
    fn drop(&mut self) {
        THREAD_ENV.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Snapshot the effective environment (real process environment with the
/// current thread's overrides applied), in the shape a child-process
/// environment block is built from.
pub fn effective_env() -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    THREAD_ENV.with(|stack| {
        for over in stack.borrow().iter() {
            for name in &over.unsets {
                env.remove(name);
            }
            for (k, v) in &over.sets {
                env.insert(k.clone(), v.clone());
            }
        }
    });
    env
}

/// Thread-local override of the current working directory, consulted by
/// path completion (spec.md §5 `thread_current_directory`).
pub struct ThreadCurrentDirectory {
    _private: (),
}

impl ThreadCurrentDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        THREAD_CWD.with(|stack| stack.borrow_mut().push(dir.into()));
        ThreadCurrentDirectory { _private: () }
    }
}

impl Drop for ThreadCurrentDirectory {
    fn drop(&mut self) {
        THREAD_CWD.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub fn current_directory() -> std::io::Result<PathBuf> {
    if let Some(dir) = THREAD_CWD.with(|stack| stack.borrow().last().cloned()) {
        return Ok(dir);
    }
    std::env::current_dir()
}

/// Case functions operating under the POSIX ("C") locale (spec.md §4.J):
/// plain ASCII case folding, not locale-sensitive Unicode case folding.
pub fn ucase(s: &str) -> String {
    s.chars().map(|c| c.to_ascii_uppercase()).collect()
}

pub fn lcase(s: &str) -> String {
    s.chars().map(|c| c.to_ascii_lowercase()).collect()
}

pub fn icasecmp(a: &str, b: &str) -> std::cmp::Ordering {
    let a = a.as_bytes().iter().map(u8::to_ascii_lowercase);
    let b = b.as_bytes().iter().map(u8::to_ascii_lowercase);
    a.cmp(b)
}

pub fn icasecmp_path(a: &Path, b: &Path) -> std::cmp::Ordering {
    icasecmp(&a.to_string_lossy(), &b.to_string_lossy())
}
