use std::path::{Path, PathBuf};

use log::{debug, warn};
use tagrewrite::staging::is_mp3;
use walkdir::WalkDir;

/// Expands `inputs` into the mp3 files they name. Directories are walked recursively.
///
/// The result is sorted and free of duplicates.
pub fn collect_mp3s(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(walk_dir(input));
        } else if is_mp3(input) {
            files.push(input.clone());
        } else {
            warn!("Skipping {}: not an mp3 file or directory", input.display());
        }
    }
    files.sort();
    files.dedup();
    files
}

fn walk_dir(dir: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_mp3(e.path()))
        .map(|e| {
            debug!("Found {}", e.path().display());
            e.into_path()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_directories_and_keeps_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("album");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("b.mp3"), b"x").unwrap();
        std::fs::write(nested.join("cover.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("a.MP3"), b"x").unwrap();

        let files = collect_mp3s(&[dir.path().to_path_buf(), dir.path().join("a.MP3")]);
        assert_eq!(
            files,
            vec![dir.path().join("a.MP3"), nested.join("b.mp3")]
        );
    }

    #[test]
    fn other_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join("cover.jpg");
        std::fs::write(&cover, b"x").unwrap();
        assert!(collect_mp3s(&[cover]).is_empty());
    }

    #[test]
    fn missing_mp3_paths_are_kept_for_reporting() {
        let files = collect_mp3s(&[PathBuf::from("/nonexistent/x.mp3")]);
        assert_eq!(files, vec![PathBuf::from("/nonexistent/x.mp3")]);
    }
}
