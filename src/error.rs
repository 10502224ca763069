//! Error taxonomy (spec.md §7): invalid argument, OS error, I/O failure,
//! parsing error, process error. The core recovers nothing; every failure
//! path in this crate returns one of these instead of panicking.

use std::fmt;
use std::io;

/// A parse failure carrying source coordinates, shared by the manifest and
/// JSON parsers (spec.md §7 "Parsing error").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub source_name: String,
    pub line: u64,
    pub column: u64,
    pub description: String,
}

impl ParseError {
    pub fn new(source_name: impl Into<String>, line: u64, column: u64, description: impl Into<String>) -> Self {
        ParseError {
            source_name: source_name.into(),
            line,
            column,
            description: description.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.source_name.is_empty() {
            write!(f, "{}:", self.source_name)?;
        }
        write!(f, "{}:{}: error: {}", self.line, self.column, self.description)
    }
}

impl std::error::Error for ParseError {}

/// Failure to spawn or control a child process (spec.md §7 "Process error").
/// `in_child` mirrors the reference's `process_error::child`: when true, the
/// failure happened after the fork, in the child process, and the caller
/// must treat itself as that child and exit rather than propagate further up
/// a parent call stack.
#[derive(Debug)]
pub struct ProcessError {
    pub in_child: bool,
    pub source: io::Error,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", sanitize_message(&self.source.to_string()))
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Os(io::Error),

    #[error("{0}")]
    Io(io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Raise an OS-level error, carrying the platform error code, as distinct
    /// from a generic stream I/O failure (spec.md §7 distinguishes the two
    /// with separate throw helpers at the call site).
    pub fn os_error(e: io::Error) -> Self {
        Error::Os(e)
    }
}

/// Normalize an exception/error message the way the reference's
/// `operator<<(ostream&, const exception&)` does (spec.md §4.J, §7):
/// strip a leading `": "`, strip trailing punctuation/space/newline, strip
/// a platform "success" suffix, and lowercase the first letter of the first
/// word so composed messages like `"unable to open X: <e>"` read naturally.
pub fn sanitize_message(msg: &str) -> String {
    let mut s = msg;
    if let Some(rest) = s.strip_prefix(": ") {
        s = rest;
    }
    let s = s.trim_end_matches(|c: char| c == '.' || c == ' ' || c == '\n' || c == '\r');
    let s = s.strip_suffix(" (os error 0)").unwrap_or(s);
    let s = s.strip_suffix(": Success").unwrap_or(s);

    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
