//! Manifest format (spec.md §4.G): an RFC822-like sequence of name/value
//! records, grounded in `original_source/libbutl/manifest-parser.cxx`. A
//! manifest stream is a sequence of one or more manifests, each starting
//! with the special empty-name format-version pair and ending at a blank
//! (empty name, empty value) record.

use crate::error::{Error, ParseError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameValue {
    pub name: String,
    pub value: String,
    pub name_line: u64,
    pub name_column: u64,
    pub value_line: u64,
    pub value_column: u64,
}

/// One manifest: its format version and the name/value pairs in its body,
/// in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    pub version: String,
    pub values: Vec<(String, String)>,
}

struct Cursor<'a> {
    source_name: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u64,
    column: u64,
}

impl<'a> Cursor<'a> {
    fn new(source_name: &'a str, text: &'a str) -> Self {
        Cursor {
            source_name,
            bytes: text.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn err(&self, line: u64, column: u64, description: impl Into<String>) -> Error {
        Error::Parse(ParseError::new(self.source_name, line, column, description))
    }
}

/// Split a manifest value into its meaningful part and trailing comment,
/// unescaping `\;` and `\\` along the way (ported verbatim from
/// `manifest_parser::split_comment`).
pub fn split_comment(v: &str) -> (String, String) {
    if !v.contains('\n') {
        let chars: Vec<char> = v.chars().collect();
        let mut i = 0;
        let mut r = String::new();
        let mut n = 0usize;
        while i < chars.len() {
            let mut c = chars[i];
            if c == ';' {
                break;
            }
            if c == '\\' && i + 1 < chars.len() && (chars[i + 1] == ';' || chars[i + 1] == '\\') {
                i += 1;
                c = chars[i];
            }
            r.push(c);
            if c != ' ' && c != '\t' {
                n = r.chars().count();
            }
            i += 1;
        }
        if r.chars().count() != n {
            r = r.chars().take(n).collect();
        }
        if i < chars.len() {
            i += 1; // skip ';'
            while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
                i += 1;
            }
        }
        let comment: String = chars[i.min(chars.len())..].iter().collect();
        (r, comment)
    } else {
        let lines: Vec<&str> = v.split('\n').collect();
        let mut r = String::new();
        let mut comment = String::new();
        let mut found = false;
        for (idx, line) in lines.iter().enumerate() {
            let is_last = idx + 1 == lines.len();
            let chars: Vec<char> = line.chars().collect();
            // Find first non-backslash character.
            let nb = chars.iter().position(|&c| c != '\\');
            if let Some(nb) = nb {
                if chars[nb] == ';' && nb + 1 == chars.len() {
                    if nb == 0 {
                        if r.ends_with('\n') {
                            r.pop();
                        }
                        comment = lines[idx + 1..].join("\n");
                        found = true;
                        break;
                    } else {
                        // Escape sequence: unescape by taking the right half.
                        let half = nb / 2;
                        let unescaped: String = chars[half..].iter().collect();
                        r.push_str(&unescaped);
                        if !is_last {
                            r.push('\n');
                        }
                        continue;
                    }
                }
            }
            r.push_str(line);
            if !is_last {
                r.push('\n');
            }
        }
        let _ = found;
        (r, comment)
    }
}

fn parse_name(c: &mut Cursor<'_>) -> Result<(String, u64, u64)> {
    let line = c.line;
    let column = c.column;
    let mut name = String::new();
    while let Some(b) = c.peek() {
        if b == b':' || b == b' ' || b == b'\t' || b == b'\n' {
            break;
        }
        name.push(b as char);
        c.advance();
    }
    Ok((name, line, column))
}

fn parse_value(c: &mut Cursor<'_>) -> Result<(String, u64, u64)> {
    // Skip ':' and horizontal whitespace following the name.
    if c.peek() == Some(b':') {
        c.advance();
    }
    while matches!(c.peek(), Some(b' ') | Some(b'\t')) {
        c.advance();
    }

    let line = c.line;
    let column = c.column;

    // Old-fashioned multi-line introducer: `\<newline>` right after the
    // name (spec.md §4.G "A value introduced by `\<newline>`").
    if c.peek() == Some(b'\\') && c.peek_at(1) == Some(b'\n') {
        c.advance();
        c.advance();
        return Ok((parse_multiline_value(c)?, line, column));
    }

    // New-fashioned multi-line introducer: a blank line immediately
    // followed by a line that is exactly `\` (spec.md §4.G "or,
    // alternatively, `<newline>\<newline>` immediately after `:`").
    if c.peek() == Some(b'\n') && c.peek_at(1) == Some(b'\\') && c.peek_at(2) == Some(b'\n') {
        c.advance();
        c.advance();
        c.advance();
        return Ok((parse_multiline_value(c)?, line, column));
    }

    let mut value = String::new();
    loop {
        match c.peek() {
            None => break,
            Some(b'\n') => {
                c.advance();
                break;
            }
            Some(b'\\') if c.peek_at(1) == Some(b'\n') => {
                // Soft line wrap: the backslash-newline pair is dropped and
                // parsing continues on the next physical line as if it were
                // a continuation of this one.
                c.advance();
                c.advance();
                value.push('\n');
            }
            Some(b) => {
                value.push(b as char);
                c.advance();
            }
        }
    }
    Ok((value, line, column))
}

/// Read a multi-line value's body (spec.md §4.G): whole physical lines
/// joined by `\n`, ending at a line that is exactly a lone `\` (consumed,
/// not included in the value). A line ending in an escaped `\\` keeps a
/// literal trailing `\` instead of being mistaken for that terminator.
fn parse_multiline_value(c: &mut Cursor<'_>) -> Result<String> {
    let mut lines: Vec<String> = Vec::new();
    loop {
        let mut current = String::new();
        loop {
            match c.peek() {
                None => {
                    lines.push(current);
                    return Ok(lines.join("\n"));
                }
                Some(b'\n') => {
                    c.advance();
                    break;
                }
                Some(b) => {
                    current.push(b as char);
                    c.advance();
                }
            }
        }
        if current == "\\" {
            return Ok(lines.join("\n"));
        }
        if let Some(stripped) = current.strip_suffix("\\\\") {
            current = format!("{stripped}\\");
        }
        lines.push(current);
    }
}

fn parse_pair(c: &mut Cursor<'_>) -> Result<NameValue> {
    let (name, name_line, name_column) = parse_name(c)?;
    let (value, value_line, value_column) = parse_value(c)?;
    Ok(NameValue {
        name,
        value,
        name_line,
        name_column,
        value_line,
        value_column,
    })
}

#[derive(PartialEq, Eq)]
enum State {
    /// Expecting the next manifest's special empty-name version pair.
    Start,
    /// Parsing the name/value pairs that make up a manifest's body.
    Body,
}

/// Parse a stream containing one or more manifests separated by a blank
/// (empty name, empty value) record. Mirrors the reference state machine:
/// a manifest opens on the empty-name version pair (inheriting the previous
/// manifest's version if the value is itself empty) and closes on a blank
/// record while in its body.
pub fn parse_manifests(source_name: &str, text: &str) -> Result<Vec<Manifest>> {
    let mut cursor = Cursor::new(source_name, text);
    let mut manifests = Vec::new();
    let mut current = Manifest::default();
    let mut last_version = String::new();
    let mut state = State::Start;

    while cursor.peek().is_some() {
        let pair = parse_pair(&mut cursor)?;

        match state {
            State::Start => {
                if !pair.name.is_empty() {
                    return Err(cursor.err(pair.name_line, pair.name_column, "format version pair expected"));
                }
                let version = if pair.value.is_empty() {
                    if last_version.is_empty() {
                        return Err(cursor.err(pair.value_line, pair.value_column, "format version value expected"));
                    }
                    last_version.clone()
                } else {
                    pair.value
                };
                if version != "1" {
                    return Err(cursor.err(
                        pair.value_line,
                        pair.value_column,
                        format!("unsupported format version {version}"),
                    ));
                }
                last_version = version.clone();
                current = Manifest {
                    version,
                    values: Vec::new(),
                };
                state = State::Body;
            }
            State::Body => {
                if pair.name.is_empty() {
                    manifests.push(std::mem::take(&mut current));
                    state = State::Start;
                } else {
                    current.values.push((pair.name, pair.value));
                }
            }
        }
    }

    if state == State::Body {
        manifests.push(current);
    }
    Ok(manifests)
}

pub fn parse_manifest(source_name: &str, text: &str) -> Result<Manifest> {
    let mut manifests = parse_manifests(source_name, text)?;
    if manifests.is_empty() {
        return Err(Error::Parse(ParseError::new(source_name, 1, 1, "manifest expected")));
    }
    Ok(manifests.remove(0))
}

/// Column at which the serializer wraps a long value onto a continuation
/// line (spec.md §10 supplemented serializer behavior).
pub const WRAP_COLUMN: usize = 77;

fn escape_value(v: &str) -> String {
    v.replace('\\', "\\\\").replace(';', "\\;")
}

/// Serialize a single manifest, wrapping values that exceed [`WRAP_COLUMN`]
/// codepoints using the soft backslash-newline continuation form.
pub fn serialize_manifest(m: &Manifest) -> String {
    let mut out = String::new();
    out.push_str(&format!(": {}\n", m.version));
    for (name, value) in &m.values {
        let escaped = escape_value(value);
        let prefix_len = name.chars().count() + 2; // "name: "
        if prefix_len + escaped.chars().count() <= WRAP_COLUMN {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(&escaped);
            out.push('\n');
        } else {
            out.push_str(name);
            out.push_str(":\\\n");
            for chunk in wrap_chunks(&escaped, WRAP_COLUMN) {
                out.push_str(&chunk);
                out.push_str("\\\n");
            }
            // Remove the trailing continuation marker on the last line.
            out.truncate(out.len() - 2);
            out.push('\n');
        }
    }
    out
}

fn wrap_chunks(s: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .chunks(width.saturating_sub(1).max(1))
        .map(|c| c.iter().collect())
        .collect()
}

pub fn serialize_manifests(manifests: &[Manifest]) -> String {
    manifests
        .iter()
        .map(serialize_manifest)
        .collect::<Vec<_>>()
        .join("\n")
}
