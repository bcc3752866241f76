//! The tag rewriter: read-modify-write of the leading ID3v2 tag of an MP3 file.

use std::io::Cursor;
use std::path::Path;

use id3::frame::Content;
use id3::{Frame, Tag, TagLike, Version};
use log::{debug, info, warn};

use crate::container::Layout;
use crate::cover::{self, PictureRemoval};
use crate::data::{year_prefix, CoverChange, CurrentTags, TagRecord, TrackNumber};
use crate::{encoding, genre, persist, Error, Result};

/// The tag version written unless configured otherwise. Understood by nearly every player.
pub const DEFAULT_VERSION: Version = Version::Id3v23;

/// Rewrites tags to match a [`TagRecord`].
///
/// Holds configuration only; every call works on its own copy of the tag, so
/// one rewriter can be shared between threads.
pub struct TagRewriter {
    version: Version,
    strategies: Vec<Box<dyn PictureRemoval + Send + Sync>>,
}

impl Default for TagRewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TagRewriter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_version(DEFAULT_VERSION)
    }

    /// Writes `version` instead of ID3v2.3. ID3v2.2 is not written; it falls back to v2.3.
    #[must_use]
    pub fn with_version(version: Version) -> Self {
        let version = match version {
            Version::Id3v22 => DEFAULT_VERSION,
            v => v,
        };
        Self {
            version,
            strategies: cover::default_strategies(),
        }
    }

    /// Replaces the picture removal strategies.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn PictureRemoval + Send + Sync>>) -> Self {
        self.strategies = strategies;
        self
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Rewrites the tag of the file at `path` in place.
    ///
    /// The file is replaced atomically; on error it is left untouched.
    ///
    /// # Errors
    /// [`Error::Unreadable`] if the file cannot be read,
    /// [`Error::UnsupportedContainer`] if it holds no MPEG audio,
    /// [`Error::WriteFailed`] if the new content cannot be stored.
    pub fn rewrite_path(&self, path: &Path, record: &TagRecord) -> Result<()> {
        let data = std::fs::read(path).map_err(|source| Error::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let out = self.rewrite_bytes(&data, record)?;
        if out == data {
            debug!("Tag of {} already up to date", path.display());
            return Ok(());
        }

        persist::replace(path, &out)?;
        info!("Rewrote tag of {}", path.display());
        Ok(())
    }

    /// Returns a copy of `data` with its tag rewritten. The audio payload is copied unchanged.
    ///
    /// # Errors
    /// [`Error::UnsupportedContainer`] if `data` holds no MPEG audio, or
    /// [`Error::Encode`] if the tag could not be serialized with any encoding.
    pub fn rewrite_bytes(&self, data: &[u8], record: &TagRecord) -> Result<Vec<u8>> {
        let layout = Layout::split(data)?;
        let mut tag = load_tag(&layout);

        if let Some(genre) = genre::clear_if_corrupt(&mut tag) {
            warn!("Cleared corrupt genre {genre:?}");
        }

        self.apply_text(&mut tag, record);
        self.apply_cover(&mut tag, &record.cover);
        self.convert_year(&mut tag);

        if !layout.has_tag() && tag.frames().next().is_none() {
            return Ok(data.to_vec());
        }

        let mut out = self.serialize(&tag)?;
        out.extend_from_slice(layout.payload);
        Ok(out)
    }

    fn apply_text(&self, tag: &mut Tag, record: &TagRecord) {
        set_text(tag, "TIT2", record.title.as_deref());
        set_text(tag, "TPE1", record.artist.as_deref());
        set_text(tag, "TALB", record.album.as_deref());
        set_text(
            tag,
            "TRCK",
            record.track.map(|t| t.to_string()).as_deref(),
        );

        if let Some(year) = record.year.as_deref() {
            tag.remove("TYER");
            tag.remove("TDRC");
            // TYER only holds the year itself
            let year = match self.version {
                Version::Id3v24 => year.trim().to_string(),
                _ => year_prefix(year).unwrap_or_else(|| year.trim().to_string()),
            };
            tag.set_text(self.year_frame(), year);
        }
    }

    fn apply_cover(&self, tag: &mut Tag, change: &CoverChange) {
        match change {
            CoverChange::Keep => {}
            CoverChange::Clear => {
                cover::remove_all(tag, &self.strategies);
            }
            CoverChange::Replace(art) => {
                cover::remove_all(tag, &self.strategies);
                cover::insert(tag, art);
            }
        }
    }

    fn year_frame(&self) -> &'static str {
        match self.version {
            Version::Id3v24 => "TDRC",
            _ => "TYER",
        }
    }

    /// Moves a year left in the other version's frame into the one we write.
    fn convert_year(&self, tag: &mut Tag) {
        let (from, to) = match self.version {
            Version::Id3v24 => ("TYER", "TDRC"),
            _ => ("TDRC", "TYER"),
        };
        if tag.get(to).is_some() {
            return;
        }
        let Some(year) = text_frame(tag, from).and_then(year_prefix) else {
            return;
        };
        tag.remove(from);
        tag.set_text(to, year);
    }

    fn serialize(&self, tag: &Tag) -> Result<Vec<u8>> {
        let canonical = canonical(tag, self.version);

        let mut last_err = None;
        for attempt in encoding::attempts(self.version) {
            if !(attempt.applies)(&canonical) {
                continue;
            }
            let encoded = encoding::with_encoding(&canonical, attempt.encoding);
            let mut buf = Vec::new();
            match encoded.write_to(&mut buf, self.version) {
                Ok(()) => {
                    debug!("Serialized tag as {:?} with {:?}", self.version, attempt.encoding);
                    return Ok(buf);
                }
                Err(e) => {
                    debug!("Encoding with {:?} failed: {e}", attempt.encoding);
                    last_err = Some(e);
                }
            }
        }

        Err(Error::Encode(last_err.unwrap_or_else(|| {
            id3::Error::new(id3::ErrorKind::InvalidInput, "no applicable text encoding")
        })))
    }
}

/// Parses the existing tag, treating anything unreadable as no tag at all.
fn load_tag(layout: &Layout<'_>) -> Tag {
    if !layout.has_tag() {
        return Tag::new();
    }
    match Tag::read_from2(Cursor::new(layout.tag)) {
        Ok(tag) => tag,
        Err(e) => {
            warn!("Discarding unreadable tag: {e}");
            Tag::new()
        }
    }
}

/// Sets one text frame, replacing any previous ones. `None` leaves the tag alone.
fn set_text(tag: &mut Tag, id: &str, value: Option<&str>) {
    if let Some(value) = value {
        tag.remove(id);
        tag.set_text(id, value);
    }
}

fn text_frame<'a>(tag: &'a Tag, id: &str) -> Option<&'a str> {
    match tag.get(id)?.content() {
        Content::Text(s) => Some(s.as_str()),
        _ => None,
    }
}

/// The frames of `tag` in a stable order, without leftovers a 4-character-id version cannot hold.
fn canonical(tag: &Tag, version: Version) -> Tag {
    let mut frames: Vec<Frame> = tag
        .frames()
        .filter(|f| {
            let keep = f.id().len() == 4;
            if !keep {
                debug!("Dropping legacy frame {}", f.id());
            }
            keep
        })
        .cloned()
        .collect();
    frames.sort_by(|a, b| a.id().cmp(b.id()));

    let mut out = Tag::with_version(version);
    for frame in frames {
        out.add_frame(frame);
    }
    out
}

/// Reads the tag values of the file at `path`.
///
/// # Errors
/// Returns [`Error::Unreadable`] if the file cannot be read. A missing or
/// corrupt tag is not an error.
pub fn read_current(path: &Path) -> Result<CurrentTags> {
    let data = std::fs::read(path).map_err(|source| Error::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(read_current_bytes(&data))
}

/// Reads the tag values at the start of `data`.
#[must_use]
pub fn read_current_bytes(data: &[u8]) -> CurrentTags {
    let Ok(tag) = Tag::read_from2(Cursor::new(data)) else {
        return CurrentTags::default();
    };
    CurrentTags {
        title: tag.title().map(str::to_owned),
        artist: tag.artist().map(str::to_owned),
        album: tag.album().map(str::to_owned),
        track: tag.track().map(|index| TrackNumber {
            index,
            total: tag.total_tracks(),
        }),
        year: text_frame(&tag, "TYER")
            .or_else(|| text_frame(&tag, "TDRC"))
            .map(str::to_owned),
        genre: tag.genre().map(str::to_owned),
        picture_count: cover::residual_pictures(&tag),
    }
}
