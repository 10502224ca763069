//! Base64 and base64url codecs (spec.md §4.H), built on the `data-encoding`
//! crate (already in the dependency stack for its RFC 4648 alphabets) with
//! the reference's line-wrapping behavior layered on top.

use crate::error::{Error, Result};
use data_encoding::{BASE64, BASE64URL_NOPAD};

/// Reference line width for wrapped base64 output (RFC 2045 / MIME).
pub const WRAP_COLUMN: usize = 76;

/// Encode `data` as standard (padded) base64, wrapped at [`WRAP_COLUMN`]
/// columns with `\n` line endings.
pub fn encode_wrapped(data: &[u8]) -> String {
    let flat = BASE64.encode(data);
    wrap(&flat, WRAP_COLUMN)
}

/// Encode `data` as standard padded base64 on a single line.
pub fn encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Decode standard base64, ignoring embedded newlines (so wrapped input
/// round-trips through [`decode`]).
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64
        .decode(stripped.as_bytes())
        .map_err(|e| Error::invalid_argument(format!("invalid base64: {e}")))
}

/// Encode using the URL-safe, unpadded alphabet (spec.md §4.H `base64url`).
pub fn encode_url(data: &[u8]) -> String {
    BASE64URL_NOPAD.encode(data)
}

pub fn decode_url(text: &str) -> Result<Vec<u8>> {
    BASE64URL_NOPAD
        .decode(text.as_bytes())
        .map_err(|e| Error::invalid_argument(format!("invalid base64url: {e}")))
}

fn wrap(s: &str, width: usize) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / width + 1);
    for chunk in s.as_bytes().chunks(width) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(std::str::from_utf8(chunk).expect("base64 alphabet is ASCII"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wrapped_encoding() {
        let data: Vec<u8> = (0..200).map(|i| i as u8).collect();
        let encoded = encode_wrapped(&data);
        assert!(encoded.lines().all(|l| l.len() <= WRAP_COLUMN));
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn url_variant_has_no_padding_and_is_url_safe() {
        let data = b"\xfb\xff\xfe";
        let encoded = encode_url(data);
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        assert_eq!(decode_url(&encoded).unwrap(), data);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(decode("not valid base64!!").is_err());
    }
}
