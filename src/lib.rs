//! forgekit: core systems utility library for a build toolchain and its
//! satellite tools (spec.md §1 OVERVIEW), grounded in `original_source/libbutl`.
//!
//! The crate is organized the way the reference library is: a path layer
//! (generic paths, directory paths, wildcard patterns), a filesystem layer,
//! an owning-fd stream layer with pipes and readiness multiplexing, process
//! spawning/control, and a set of data-format codecs (UTF-8, base64, LZ4,
//! manifest, JSON, standard version). `fdio` and `process` are POSIX-only
//! for now (spec.md §11).

pub mod codec;
pub mod diag;
pub mod env;
pub mod error;
#[cfg(unix)]
pub mod fdio;
pub mod fs;
pub mod json;
pub mod manifest;
pub mod path;
#[cfg(unix)]
pub mod process;
pub mod version;

pub use error::{Error, Result};
