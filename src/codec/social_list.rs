//! Social list result pages
//!
//! The social list result carries party, friend list, linkshell, player
//! search and free company rosters in one page shape. Each page holds a fixed
//! number of slots; a slot starts with the content id and carries the character
//! name at a fixed offset.
//!
//! The width of the name field differs between observed client builds (a
//! 32 byte name versus the 39 bytes left in the slot after `name_offset`), so
//! the geometry is a [`SocialListLayout`] supplied by the caller rather than a
//! constant.

use tracing::debug;

use super::{decode_fixed_name, read_u64_le, DecodeError};
use crate::domain::{ContentId, ContentIdMapping};

/// Page geometry for [`decode_social_list_page`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocialListLayout {
    /// Offset of the first slot within the page
    pub page_offset: usize,
    /// Number of slots per page
    pub slot_count: usize,
    /// Size of one slot
    pub slot_size: usize,
    /// Offset of the name field within a slot
    pub name_offset: usize,
    /// Width of the name field
    pub name_len: usize,
}

impl SocialListLayout {
    /// Total number of bytes a page must have, saturating at `usize::MAX`
    pub fn page_size(&self) -> usize {
        self.slot_count
            .saturating_mul(self.slot_size)
            .saturating_add(self.page_offset)
    }

    /// Largest name width that still fits in a slot
    pub fn max_name_len(&self) -> usize {
        self.slot_size.saturating_sub(self.name_offset)
    }

    /// Same geometry with a different name width
    pub fn with_name_len(mut self, name_len: usize) -> Self {
        self.name_len = name_len;
        self
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.slot_size < 8 {
            return Err(DecodeError::InvalidLayout(format!(
                "slot size {} cannot hold a content id",
                self.slot_size
            )));
        }
        if self.name_offset < 8 {
            return Err(DecodeError::InvalidLayout(format!(
                "name offset {:#x} overlaps the content id",
                self.name_offset
            )));
        }
        if self
            .name_offset
            .checked_add(self.name_len)
            .map_or(true, |end| end > self.slot_size)
        {
            return Err(DecodeError::InvalidLayout(format!(
                "name field {:#x}+{} exceeds slot size {:#x}",
                self.name_offset, self.name_len, self.slot_size
            )));
        }
        let pages_fit = self
            .slot_count
            .checked_mul(self.slot_size)
            .and_then(|slots| slots.checked_add(self.page_offset))
            .is_some();
        if !pages_fit {
            return Err(DecodeError::InvalidLayout(format!(
                "{} slots of {:#x} bytes at {:#x} overflow the address space",
                self.slot_count, self.slot_size, self.page_offset
            )));
        }
        Ok(())
    }
}

impl Default for SocialListLayout {
    fn default() -> Self {
        Self {
            page_offset: 0x10,
            slot_count: 10,
            slot_size: 0x58,
            name_offset: 0x31,
            name_len: 32,
        }
    }
}

/// Decode every populated slot of a social list page
///
/// Empty slots (content id 0), slots without a name (e.g. friends on another
/// world) and slots whose name fails to decode are skipped individually.
pub fn decode_social_list_page(
    page: &[u8],
    layout: &SocialListLayout,
) -> Result<Vec<ContentIdMapping>, DecodeError> {
    layout.validate()?;

    let expected = layout.page_size();
    if page.len() < expected {
        return Err(DecodeError::TooShort {
            expected,
            actual: page.len(),
        });
    }

    let mut mappings = Vec::with_capacity(layout.slot_count);
    for index in 0..layout.slot_count {
        let start = layout.page_offset + index * layout.slot_size;
        let slot = &page[start..start + layout.slot_size];

        let content_id = ContentId(read_u64_le(slot, 0)?);
        if content_id.is_zero() {
            continue;
        }

        let name_field = &slot[layout.name_offset..layout.name_offset + layout.name_len];
        match decode_fixed_name(name_field) {
            Ok(name) if !name.is_empty() => {
                mappings.push(ContentIdMapping {
                    content_id,
                    player_name: name,
                });
            }
            Ok(_) => {
                debug!(%content_id, "Content id didn't resolve to a player name, ignoring");
            }
            Err(e) => {
                debug!(%content_id, slot = index, error = %e, "Skipping undecodable social list slot");
            }
        }
    }

    Ok(mappings)
}
