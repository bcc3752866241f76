//! Per-batch working directories.
//!
//! Every batch gets its own directory named by a random identifier, so two
//! batches never see each other's files even when they upload identically
//! named songs.

use std::path::{Path, PathBuf};

use log::{debug, info};
use sanitise_file_name::sanitise_with_options;

use crate::{Error, Result};

static SANITIZE_OPTIONS: sanitise_file_name::Options<Option<char>> = sanitise_file_name::Options {
    length_limit: 120,
    extension_cleverness: true,
    most_fs_safe: true,
    windows_safe: true,
    normalise_whitespace: true,
    trim_spaces_and_full_stops: true,
    six_measures_of_barley: "track",
    ..sanitise_file_name::Options::DEFAULT
};

/// An isolated directory holding the files of one batch.
#[derive(Debug)]
pub struct StagingArea {
    id: String,
    dir: PathBuf,
}

impl StagingArea {
    /// Creates a fresh, empty batch directory below `root`.
    ///
    /// # Errors
    /// Fails if the directory cannot be created.
    pub fn create(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        loop {
            let id = format!("{:016x}", rand::random::<u64>());
            let dir = root.join(&id);
            match std::fs::create_dir(&dir) {
                Ok(()) => {
                    info!("Created staging batch {id}");
                    return Ok(Self { id, dir });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(Error::IoError(e)),
            }
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stores `data` under a sanitized form of `original_name`.
    ///
    /// A name already taken in this batch gets a ` (n)` suffix; nothing is overwritten.
    ///
    /// # Errors
    /// Fails if the file cannot be written.
    pub fn stage(&self, original_name: &str, data: &[u8]) -> Result<PathBuf> {
        let base = Path::new(original_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(original_name);
        let clean = sanitise_with_options(base, &SANITIZE_OPTIONS);
        let (stem, ext) = match clean.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
            _ => (clean.clone(), String::new()),
        };

        let mut n = 0u32;
        loop {
            let name = if n == 0 {
                format!("{stem}{ext}")
            } else {
                format!("{stem} ({n}){ext}")
            };
            let path = self.dir.join(&name);
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    std::io::Write::write_all(&mut file, data)?;
                    debug!("Staged {original_name} as {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(Error::IoError(e)),
            }
        }
    }

    /// Copies the file at `source` into the batch.
    ///
    /// # Errors
    /// [`Error::Unreadable`] if `source` cannot be read, otherwise as [`Self::stage`].
    pub fn stage_file(&self, source: &Path) -> Result<PathBuf> {
        let data = std::fs::read(source).map_err(|e| Error::Unreadable {
            path: source.to_path_buf(),
            source: e,
        })?;
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.stage(&name, &data)
    }

    /// The staged MP3 files, sorted by name.
    ///
    /// # Errors
    /// Fails if the batch directory cannot be listed.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_mp3(p))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Deletes the batch directory and everything in it.
    ///
    /// # Errors
    /// Fails if the directory cannot be removed.
    pub fn remove(self) -> Result<()> {
        std::fs::remove_dir_all(&self.dir)?;
        debug!("Removed staging batch {}", self.id);
        Ok(())
    }
}

/// Whether `path` has an `.mp3` extension, ignoring case.
#[must_use]
pub fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3"))
}
