#![doc = include_str!("../README.md")]

pub mod artwork;
pub mod batch;
pub mod container;
pub mod cover;
pub mod data;
pub mod encoding;
pub mod filename;
pub mod genre;
pub mod persist;
pub mod rewrite;
pub mod staging;

pub use artwork::{normalize_cover, CoverOptions};
pub use batch::{
    album_for_all, auto_track_numbers, replace_cover_all, rewrite_batch, BatchReport, FileFailure,
    RewriteJob,
};
pub use data::{CoverArt, CoverChange, CurrentTags, TagRecord, TrackNumber};
pub use filename::{guess as guess_from_filename, FilenameGuess};
pub use rewrite::{read_current, read_current_bytes, TagRewriter};
pub use staging::StagingArea;

pub use id3::Version;

use std::path::PathBuf;
use thiserror::Error;

/// Error type.
///
/// Every error is scoped to a single file; batch operations collect them per file.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The file could not be opened or read.
    #[error("Could not read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// No MPEG audio stream was found after the tag region.
    #[error("Unsupported container: no MPEG audio stream found")]
    UnsupportedContainer,
    /// The rewritten file could not be stored. The original is left unmodified.
    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The tag could not be serialized with any text encoding.
    #[error("Could not encode tag: {0}")]
    Encode(id3::Error),
    /// Given cover image data is not in a format that can be decoded.
    #[error("Given cover image data is not of a recognized image format")]
    InvalidImageFormat,
    /// Wrapper around an [`image::ImageError`]. See there for more info.
    #[error("{0}")]
    Image(#[from] image::ImageError),
    /// The worker handling this file stopped before reporting a result.
    #[error("Rewrite did not complete")]
    Interrupted,
    /// An unspecified I/O error occurred.
    #[error("An I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
