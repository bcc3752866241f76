//! Attached picture removal and insertion.
//!
//! Pictures can hide in a tag in several shapes: decoded APIC frames, legacy
//! ID3v2.2 `PIC` frames, or APIC frames whose body the decoder could not parse
//! and kept as opaque bytes. No single removal call reaches all of them, so
//! removal runs through an ordered list of [`PictureRemoval`] strategies and
//! stops as soon as a strategy leaves no residue behind.

use id3::frame::{Content, Picture, PictureType};
use id3::{Frame, Tag, TagLike};
use log::{debug, warn};

use crate::data::CoverArt;

/// Description written on every cover this crate embeds.
pub const COVER_DESCRIPTION: &str = "Cover";

const PICTURE_IDS: [&str; 2] = ["APIC", "PIC"];

fn is_picture_frame(frame: &Frame) -> bool {
    PICTURE_IDS.contains(&frame.id()) || matches!(frame.content(), Content::Picture(_))
}

/// Number of frames that still carry an attached picture in any form.
#[must_use]
pub fn residual_pictures(tag: &Tag) -> usize {
    tag.frames().filter(|f| is_picture_frame(f)).count()
}

/// One way of stripping pictures from a tag.
pub trait PictureRemoval {
    fn name(&self) -> &'static str;

    /// Whether this strategy has anything it could act on.
    fn can_attempt(&self, tag: &Tag) -> bool;

    fn apply(&self, tag: &mut Tag);
}

/// Clears every decoded picture in one call.
pub struct BulkClear;

impl PictureRemoval for BulkClear {
    fn name(&self) -> &'static str {
        "bulk clear"
    }

    fn can_attempt(&self, tag: &Tag) -> bool {
        tag.pictures().next().is_some()
    }

    fn apply(&self, tag: &mut Tag) {
        tag.remove_all_pictures();
    }
}

/// Removes frames by their picture frame ids, whatever their content decoded to.
pub struct FrameIdSweep;

impl PictureRemoval for FrameIdSweep {
    fn name(&self) -> &'static str {
        "frame id sweep"
    }

    fn can_attempt(&self, tag: &Tag) -> bool {
        tag.frames().any(|f| PICTURE_IDS.contains(&f.id()))
    }

    fn apply(&self, tag: &mut Tag) {
        for id in PICTURE_IDS {
            let removed = tag.remove(id);
            if !removed.is_empty() {
                debug!("Removed {} {id} frame(s)", removed.len());
            }
        }
    }
}

/// Removes pictures one picture type at a time.
pub struct PerTypeRemoval;

impl PictureRemoval for PerTypeRemoval {
    fn name(&self) -> &'static str {
        "per type removal"
    }

    fn can_attempt(&self, tag: &Tag) -> bool {
        tag.pictures().next().is_some()
    }

    fn apply(&self, tag: &mut Tag) {
        let types: Vec<PictureType> = tag.pictures().map(|p| p.picture_type).collect();
        for picture_type in types {
            tag.remove_picture_by_type(picture_type);
        }
    }
}

/// The strategies in the order they are tried.
#[must_use]
pub fn default_strategies() -> Vec<Box<dyn PictureRemoval + Send + Sync>> {
    vec![
        Box::new(BulkClear),
        Box::new(FrameIdSweep),
        Box::new(PerTypeRemoval),
    ]
}

/// Strips every attached picture, trying `strategies` in order until none remain.
///
/// Returns the number of pictures left behind, which is zero unless every
/// strategy was exhausted.
pub fn remove_all(tag: &mut Tag, strategies: &[Box<dyn PictureRemoval + Send + Sync>]) -> usize {
    let before = residual_pictures(tag);
    if before == 0 {
        return 0;
    }

    for strategy in strategies {
        if !strategy.can_attempt(tag) {
            debug!("Skipping picture removal via {}", strategy.name());
            continue;
        }
        strategy.apply(tag);
        let left = residual_pictures(tag);
        if left == 0 {
            debug!("Removed {before} picture(s) via {}", strategy.name());
            return 0;
        }
        debug!("{} left {left} picture(s) behind", strategy.name());
    }

    let left = residual_pictures(tag);
    warn!("{left} picture frame(s) survived every removal strategy");
    left
}

/// Embeds `cover` as the front cover. Callers remove existing pictures first.
pub fn insert(tag: &mut Tag, cover: &CoverArt) {
    let mime_type = if cover.mime_type.trim().is_empty() {
        crate::data::DEFAULT_COVER_MIME.to_string()
    } else {
        cover.mime_type.clone()
    };
    tag.add_frame(Picture {
        mime_type,
        picture_type: PictureType::CoverFront,
        description: COVER_DESCRIPTION.to_string(),
        data: cover.data.clone(),
    });
}
