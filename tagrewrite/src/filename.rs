//! Best-effort artist/title guess from a file name like `"03 - Queen - Bohemian Rhapsody.mp3"`.

use std::path::Path;

/// Artist and title derived from a file name. `artist` is empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenameGuess {
    pub artist: String,
    pub title: String,
}

/// Guesses artist and title from `filename`. Never fails.
///
/// The extension is dropped and the rest is split on `-`. A leading numeric
/// segment is taken as a track number and ignored. With two or more segments
/// left, the first is the artist and the rest form the title; with one it is
/// the title; with none the whole file name is the title.
#[must_use]
pub fn guess(filename: &str) -> FilenameGuess {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let mut parts: Vec<&str> = stem
        .split('-')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts
        .first()
        .is_some_and(|p| p.bytes().all(|b| b.is_ascii_digit()))
    {
        parts.remove(0);
    }

    match parts.as_slice() {
        [] => FilenameGuess {
            artist: String::new(),
            title: filename.to_string(),
        },
        [title] => FilenameGuess {
            artist: String::new(),
            title: (*title).to_string(),
        },
        [artist, rest @ ..] => FilenameGuess {
            artist: (*artist).to_string(),
            title: rest.join(" - "),
        },
    }
}
