//! Content id to character name packet
//!
//! ```text
//! offset  size  field
//! 0x00    8     content id (u64, little-endian)
//! 0x08    32    character name (UTF-8, NUL padded)
//! ```

use super::{decode_fixed_name, read_u64_le, DecodeError};
use crate::domain::{ContentId, ContentIdMapping};

/// Size of the content id mapping packet body
pub const CONTENT_ID_MAPPING_SIZE: usize = 40;

const NAME_OFFSET: usize = 8;

/// Decode one content id mapping packet
///
/// Only the first [`CONTENT_ID_MAPPING_SIZE`] bytes are read; trailing bytes
/// are ignored. An empty name decodes successfully and is filtered later by
/// ingestion.
pub fn decode_content_id_mapping(buf: &[u8]) -> Result<ContentIdMapping, DecodeError> {
    if buf.len() < CONTENT_ID_MAPPING_SIZE {
        return Err(DecodeError::TooShort {
            expected: CONTENT_ID_MAPPING_SIZE,
            actual: buf.len(),
        });
    }

    let content_id = read_u64_le(buf, 0)?;
    let player_name = decode_fixed_name(&buf[NAME_OFFSET..CONTENT_ID_MAPPING_SIZE])?;

    Ok(ContentIdMapping {
        content_id: ContentId(content_id),
        player_name,
    })
}
