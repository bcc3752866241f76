//! Detection of the out-of-range numeric genre references legacy taggers leave behind.

use id3::{Tag, TagLike};

/// Highest index in the extended (Winamp) ID3v1 genre list.
pub const MAX_GENRE_INDEX: u32 = 191;

/// Returns true when a TCON value references a genre index outside `0..=MAX_GENRE_INDEX`.
///
/// Recognizes bare numbers (`"300"`) and the ID3v2.3 parenthesized form, which
/// may be chained and followed by a refinement (`"(255)"`, `"(17)(300)Rock"`).
/// `"(RX)"`, `"(CR)"` and free text are not numeric references.
#[must_use]
pub fn is_out_of_range(value: &str) -> bool {
    let value = value.trim();
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return !matches!(value.parse::<u32>(), Ok(n) if n <= MAX_GENRE_INDEX);
    }

    let mut rest = value;
    while let Some(inner) = rest.strip_prefix('(') {
        let Some(close) = inner.find(')') else {
            break;
        };
        let reference = &inner[..close];
        if !reference.is_empty() && reference.bytes().all(|b| b.is_ascii_digit()) {
            match reference.parse::<u32>() {
                Ok(n) if n <= MAX_GENRE_INDEX => {}
                _ => return true,
            }
        }
        rest = &inner[close + 1..];
    }
    false
}

/// Removes the genre frame when it carries an out-of-range reference.
///
/// Returns the removed value.
pub fn clear_if_corrupt(tag: &mut Tag) -> Option<String> {
    let genre = tag.genre()?.to_string();
    // Multiple TCON values are NUL separated.
    if genre.split('\0').any(is_out_of_range) {
        tag.remove("TCON");
        Some(genre)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_references() {
        assert!(!is_out_of_range("17"));
        assert!(!is_out_of_range("191"));
        assert!(is_out_of_range("192"));
        assert!(is_out_of_range("255"));
        assert!(!is_out_of_range("(17)"));
        assert!(is_out_of_range("(255)"));
        assert!(is_out_of_range("(17)(300)Rock"));
        assert!(is_out_of_range("(99999999999999999999)"));
        assert!(is_out_of_range("99999999999"));
        assert!(!is_out_of_range(" 042 "));
    }

    #[test]
    fn text_genres_are_fine() {
        assert!(!is_out_of_range("Rock"));
        assert!(!is_out_of_range("(RX)"));
        assert!(!is_out_of_range("(CR)Remix"));
        assert!(!is_out_of_range(""));
        assert!(!is_out_of_range("(unclosed"));
    }

    #[test]
    fn clears_only_corrupt_frame() {
        let mut tag = Tag::new();
        tag.set_genre("(255)");
        assert_eq!(clear_if_corrupt(&mut tag).as_deref(), Some("(255)"));
        assert!(tag.genre().is_none());

        let mut tag = Tag::new();
        tag.set_genre("Rock");
        assert_eq!(clear_if_corrupt(&mut tag), None);
        assert_eq!(tag.genre(), Some("Rock"));
    }
}
