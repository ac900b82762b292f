//! Text-safe encoding for binary secrets.
//!
//! Document stores hold JSON, so ciphertext and wrapped keys travel as padded
//! standard base64. `decode(encode(x)) == x` for every byte string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::DecodeError;

/// Field label used when the caller has no more specific name.
pub const UNNAMED_FIELD: &str = "value";

/// Encode raw bytes as base64 text.
pub fn encode(raw: &[u8]) -> String {
    STANDARD.encode(raw)
}

/// Decode base64 text back to raw bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    decode_field(UNNAMED_FIELD, text)
}

/// Decode base64 text, labelling any failure with `field`.
pub fn decode_field(field: &'static str, text: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD
        .decode(text)
        .map_err(|e| DecodeError::new(field, e))
}
