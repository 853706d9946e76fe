// src/utils/codec.rs
//! Transport codec for status lists.
//!
//! The raw status bytes are gzip-compressed (single-pass stream, default
//! level) and then encoded with the standard base64 alphabet without line
//! wrapping. Both stages are deterministic, so `decode(encode(b)) == b`
//! for every byte buffer and re-encoding a decoded list reproduces the
//! stored text.
//!
//! Note the alphabet: the codec output uses *standard* base64, distinct
//! from the base64url segments of the outer assertion token.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::errors::StatusError;

/// Encodes raw status bytes into the compressed, text-safe transport form.
///
/// # Errors
/// Returns [`StatusError::Encode`] only on an underlying stream fault;
/// valid input never fails in practice.
pub fn encode(bytes: &[u8]) -> Result<String, StatusError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| StatusError::Encode(format!("failed to write to gzip stream: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| StatusError::Encode(format!("failed to close gzip stream: {}", e)))?;

    Ok(base64::encode(compressed))
}

/// Decodes the transport form back into raw status bytes.
///
/// The decoded byte length is not validated against any expected count;
/// callers bounds-check bit indices through the status list itself.
///
/// # Errors
/// Returns [`StatusError::Decode`] if the text is not valid standard
/// base64 or the gzip stream is malformed or truncated.
pub fn decode(encoded: &str) -> Result<Vec<u8>, StatusError> {
    let compressed = base64::decode(encoded)
        .map_err(|e| StatusError::Decode(format!("invalid base64: {}", e)))?;

    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut bytes = Vec::new();
    decoder
        .read_to_end(&mut bytes)
        .map_err(|e| StatusError::Decode(format!("invalid gzip stream: {}", e)))?;

    Ok(bytes)
}
