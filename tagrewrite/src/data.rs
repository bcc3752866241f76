//! Plain data types describing the desired and current state of a tag.

use std::fmt;

/// The default MIME type used for embedded covers.
pub const DEFAULT_COVER_MIME: &str = "image/jpeg";

/// Track position within a release, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackNumber {
    pub index: u32,
    pub total: Option<u32>,
}

impl TrackNumber {
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self { index, total: None }
    }

    #[must_use]
    pub const fn of(index: u32, total: u32) -> Self {
        Self {
            index,
            total: Some(total),
        }
    }

    /// Parses `"3"` or `"3/12"`. Returns `None` for anything else.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().splitn(2, '/');
        let index = parts.next()?.trim().parse().ok()?;
        let total = match parts.next() {
            Some(t) => Some(t.trim().parse().ok()?),
            None => None,
        };
        Some(Self { index, total })
    }
}

impl fmt::Display for TrackNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "{}/{}", self.index, total),
            None => write!(f, "{}", self.index),
        }
    }
}

/// The four-digit year a date string starts with (`"1975"`, `"1975-11-21"`).
#[must_use]
pub fn year_prefix(s: &str) -> Option<String> {
    let year: String = s.trim().chars().take(4).collect();
    (year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit())).then_some(year)
}

/// Already-encoded cover image bytes.
///
/// The rewriter never decodes this data; see [`crate::artwork::normalize_cover`]
/// for producing it from arbitrary image input.
#[derive(Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl CoverArt {
    /// Wraps JPEG bytes.
    #[must_use]
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            data,
            mime_type: DEFAULT_COVER_MIME.to_string(),
        }
    }
}

impl fmt::Debug for CoverArt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoverArt")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// What a rewrite should do with the embedded pictures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CoverChange {
    /// Leave every existing picture as it is.
    #[default]
    Keep,
    /// Remove every attached picture.
    Clear,
    /// Remove every attached picture, then embed exactly this one as the front cover.
    Replace(CoverArt),
}

/// Desired target state for one file.
///
/// A `None` text field leaves the corresponding frame untouched. `Some("")`
/// writes an empty frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRecord {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track: Option<TrackNumber>,
    pub year: Option<String>,
    pub cover: CoverChange,
}

impl TagRecord {
    /// A record that changes nothing.
    #[must_use]
    pub fn unchanged() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cover(mut self, cover: CoverChange) -> Self {
        self.cover = cover;
        self
    }
}

/// Snapshot of the values found in an existing tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track: Option<TrackNumber>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub picture_count: usize,
}
