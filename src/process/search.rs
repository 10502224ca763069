//! Locate an executable on `PATH` (spec.md §4.D `process::path_search`).
//! POSIX checks the executable bit; Windows additionally tries each
//! `PATHEXT` suffix when the candidate has no extension of its own.

use crate::path::{DirPath, Path as FPath, Platform};
use std::path::{Path as StdPath, PathBuf};

/// Resolve `name` against `path_dirs` (defaulting to the `PATH` environment
/// variable, consulting the thread-local override via
/// [`crate::env::getenv`]). Returns `None` if no executable match is found.
/// A `name` that already contains a separator is checked directly, as-is,
/// without consulting `PATH` (mirrors the reference and common shell
/// behavior).
pub fn path_search(name: &str, path_dirs: Option<&[DirPath]>) -> Option<FPath> {
    let platform = Platform::HOST;
    if name.chars().any(|c| platform.is_separator(c)) {
        return is_executable(StdPath::new(name)).then(|| FPath::host(name).ok()).flatten();
    }

    let owned_dirs;
    let dirs: &[DirPath] = match path_dirs {
        Some(d) => d,
        None => {
            owned_dirs = env_path_dirs(platform);
            &owned_dirs
        }
    };

    for dir in dirs {
        for candidate in candidates(name) {
            let full = StdPath::new(dir.as_str()).join(&candidate);
            if is_executable(&full) {
                return FPath::host(full.to_string_lossy().into_owned()).ok();
            }
        }
    }
    None
}

fn env_path_dirs(platform: Platform) -> Vec<DirPath> {
    let raw = crate::env::getenv("PATH").unwrap_or_default();
    raw.split(platform.list_separator())
        .filter(|s| !s.is_empty())
        .filter_map(|s| DirPath::new(s, platform).ok())
        .collect()
}

#[cfg(unix)]
fn candidates(name: &str) -> Vec<PathBuf> {
    vec![PathBuf::from(name)]
}

#[cfg(windows)]
fn candidates(name: &str) -> Vec<PathBuf> {
    if StdPath::new(name).extension().is_some() {
        return vec![PathBuf::from(name)];
    }
    let pathext = crate::env::getenv("PATHEXT").unwrap_or_else(|| ".COM;.EXE;.BAT;.CMD".to_string());
    pathext
        .split(';')
        .filter(|s| !s.is_empty())
        .map(|ext| PathBuf::from(format!("{name}{ext}")))
        .collect()
}

#[cfg(unix)]
fn is_executable(path: &StdPath) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(windows)]
fn is_executable(path: &StdPath) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
