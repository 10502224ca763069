//! Data format codecs (spec.md §4.H): UTF-8 validation, base64/base64url,
//! and LZ4 frame compression.

pub mod base64;
pub mod lz4;
pub mod utf8;
