//! Text encoding negotiation for serialized tags.

use id3::frame::Content;
use id3::{Encoding, Tag, TagLike, Version};

/// One candidate encoding and the condition under which it can represent a tag.
#[derive(Clone, Copy)]
pub struct Attempt {
    pub encoding: Encoding,
    pub applies: fn(&Tag) -> bool,
}

impl std::fmt::Debug for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attempt")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

/// Candidates for `version`, most compact first. The last one always applies.
///
/// ID3v2.3 only knows ISO-8859-1 and UTF-16, so the single-byte encoding is
/// tried first there; ID3v2.4 writes UTF-8.
#[must_use]
pub fn attempts(version: Version) -> Vec<Attempt> {
    match version {
        Version::Id3v24 => vec![Attempt {
            encoding: Encoding::UTF8,
            applies: always,
        }],
        Version::Id3v22 | Version::Id3v23 => vec![
            Attempt {
                encoding: Encoding::Latin1,
                applies: latin1_representable,
            },
            Attempt {
                encoding: Encoding::UTF16,
                applies: always,
            },
        ],
    }
}

fn always(_: &Tag) -> bool {
    true
}

fn latin1_representable(tag: &Tag) -> bool {
    tag.frames()
        .flat_map(|frame| text_of(frame.content()))
        .all(|s| s.chars().all(|c| u32::from(c) <= 0xFF))
}

/// Every piece of encoded text a frame carries.
fn text_of(content: &Content) -> Vec<&str> {
    match content {
        Content::Text(s) => vec![s.as_str()],
        Content::ExtendedText(t) => vec![t.description.as_str(), t.value.as_str()],
        Content::Comment(c) => vec![c.description.as_str(), c.text.as_str()],
        Content::Lyrics(l) => vec![l.description.as_str(), l.text.as_str()],
        Content::Picture(p) => vec![p.description.as_str()],
        Content::ExtendedLink(l) => vec![l.description.as_str()],
        _ => Vec::new(),
    }
}

/// Applies `encoding` to every frame of `tag`.
#[must_use]
pub fn with_encoding(tag: &Tag, encoding: Encoding) -> Tag {
    let mut out = Tag::with_version(tag.version());
    for frame in tag.frames() {
        out.add_frame(frame.clone().set_encoding(Some(encoding)));
    }
    out
}
