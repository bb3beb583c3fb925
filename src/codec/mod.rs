//! Binary decoders for identity-carrying packets
//!
//! - [`decode_content_id_mapping`] - the fixed 40-byte content id to name packet
//! - [`decode_social_list_page`] - a social list result page, layout supplied by the caller
//!
//! Decoders are pure and never panic on short or malformed input; callers
//! treat a [`DecodeError`] as "no fact" and keep going.

mod content_id;
mod social_list;

pub use content_id::*;
pub use social_list::*;

use thiserror::Error;

/// Errors produced while decoding a packet buffer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer is smaller than the layout requires
    #[error("buffer too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// Name bytes before the first NUL are not UTF-8
    #[error("name field is not valid UTF-8 (error at byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },

    /// Layout parameters do not describe a consistent page
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
}

/// Decode a NUL-padded fixed-width name field
///
/// Everything from the first NUL onward is padding and is ignored, so garbage
/// after the terminator does not invalidate the name.
pub fn decode_fixed_name(field: &[u8]) -> Result<String, DecodeError> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let name = std::str::from_utf8(&field[..end]).map_err(|e| DecodeError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })?;
    Ok(name.trim_end_matches('\0').to_string())
}

/// Read a little-endian u64 at `offset`
pub fn read_u64_le(buf: &[u8], offset: usize) -> Result<u64, DecodeError> {
    let end = offset.saturating_add(8);
    let bytes: [u8; 8] = buf
        .get(offset..end)
        .and_then(|s| s.try_into().ok())
        .ok_or(DecodeError::TooShort {
            expected: end,
            actual: buf.len(),
        })?;
    Ok(u64::from_le_bytes(bytes))
}
