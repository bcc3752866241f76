//! Splitting an MPEG audio file into its leading ID3v2 tag region and the audio payload.

use crate::{Error, Result};

const HEADER_LEN: usize = 10;
const FOOTER_FLAG: u8 = 0x10;

/// How far into the payload we look for the first MPEG frame sync.
const SYNC_SCAN_LIMIT: usize = 1 << 20;

/// A view of a file split at the end of its leading tag region.
#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    /// All leading ID3v2 tag blocks, possibly empty.
    pub tag: &'a [u8],
    /// Everything after the tag region, left byte-for-byte untouched by a rewrite.
    pub payload: &'a [u8],
}

impl<'a> Layout<'a> {
    /// Splits `data` and checks that the payload looks like MPEG audio.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedContainer`] when no MPEG frame sync can be found.
    pub fn split(data: &'a [u8]) -> Result<Self> {
        let mut end = 0;
        // Some broken taggers prepend a fresh tag in front of the old one.
        while let Some(len) = tag_len(&data[end..]) {
            end += len;
        }
        let layout = Self {
            tag: &data[..end],
            payload: &data[end..],
        };
        if !has_frame_sync(layout.payload) {
            return Err(Error::UnsupportedContainer);
        }
        Ok(layout)
    }

    #[must_use]
    pub fn has_tag(&self) -> bool {
        !self.tag.is_empty()
    }
}

/// Total size of the ID3v2 block at the start of `data`, header and footer included.
///
/// Returns `None` when `data` does not start with a well formed header or the
/// declared size runs past the end of the buffer.
#[must_use]
pub fn tag_len(data: &[u8]) -> Option<usize> {
    let header = data.get(..HEADER_LEN)?;
    if &header[..3] != b"ID3" || !(2..=4).contains(&header[3]) || header[4] == 0xFF {
        return None;
    }
    let size = syncsafe(&header[6..10])?;
    let footer = if header[3] == 4 && header[5] & FOOTER_FLAG != 0 {
        HEADER_LEN
    } else {
        0
    };
    let total = HEADER_LEN + size + footer;
    (total <= data.len()).then_some(total)
}

fn syncsafe(bytes: &[u8]) -> Option<usize> {
    bytes.iter().try_fold(0usize, |acc, &b| {
        (b & 0x80 == 0).then_some((acc << 7) | usize::from(b))
    })
}

/// Looks for an MPEG audio frame header: 11 sync bits, a valid version and a non-reserved layer.
fn has_frame_sync(payload: &[u8]) -> bool {
    let window = &payload[..payload.len().min(SYNC_SCAN_LIMIT)];
    window.windows(2).any(|w| {
        w[0] == 0xFF && w[1] & 0xE0 == 0xE0 && w[1] & 0x18 != 0x08 && w[1] & 0x06 != 0
    })
}
