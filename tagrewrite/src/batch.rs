//! Bounded parallel rewriting of many files.
//!
//! Each file is rewritten on tokio's blocking pool with at most `workers`
//! files in flight. Files are independent: one failure is recorded and the
//! rest carry on. Dropping the returned future stops new files from being
//! started; files already started still finish their atomic replace.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::data::{CoverArt, CoverChange, TagRecord, TrackNumber};
use crate::rewrite::{read_current, TagRewriter};
use crate::{filename, Error, Result};

/// One file and the state its tag should end up in.
#[derive(Debug, Clone)]
pub struct RewriteJob {
    pub path: PathBuf,
    pub record: TagRecord,
}

#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: Error,
}

/// Per-file outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<FileFailure>,
}

impl BatchReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Rewrites every job's file with at most `workers` running at once.
pub async fn rewrite_batch(
    rewriter: Arc<TagRewriter>,
    jobs: Vec<RewriteJob>,
    workers: usize,
) -> BatchReport {
    let items = jobs.into_iter().map(|job| (job.path, job.record)).collect();
    run_bounded(items, workers, move |path, record: TagRecord| {
        rewriter.rewrite_path(path, &record)
    })
    .await
}

/// Embeds `cover` as the only picture of every file in `paths`.
///
/// Title and artist are filled from the file's current tag, or guessed from
/// its file name when the tag lacks them. Other frames are left as they are.
pub async fn replace_cover_all(
    rewriter: Arc<TagRewriter>,
    paths: Vec<PathBuf>,
    cover: CoverArt,
    workers: usize,
) -> BatchReport {
    let cover = Arc::new(cover);
    let items = paths.into_iter().map(|p| (p, ())).collect();
    run_bounded(items, workers, move |path, ()| {
        let record = seeded_record(path, CoverChange::Replace((*cover).clone()))?;
        rewriter.rewrite_path(path, &record)
    })
    .await
}

/// A record that keeps the file's own title and artist, falling back to a file name guess.
///
/// # Errors
/// Fails if the file cannot be read.
pub fn seeded_record(path: &Path, cover: CoverChange) -> Result<TagRecord> {
    let current = read_current(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let guess = filename::guess(&name);

    let title = current
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(guess.title);
    let artist = current
        .artist
        .filter(|a| !a.trim().is_empty())
        .or_else(|| Some(guess.artist).filter(|a| !a.is_empty()));

    Ok(TagRecord {
        title: Some(title),
        artist,
        cover,
        ..TagRecord::default()
    })
}

/// Jobs that set `album` on every file and leave everything else alone.
#[must_use]
pub fn album_for_all(paths: Vec<PathBuf>, album: &str) -> Vec<RewriteJob> {
    paths
        .into_iter()
        .map(|path| RewriteJob {
            path,
            record: TagRecord {
                album: Some(album.to_string()),
                ..TagRecord::default()
            },
        })
        .collect()
}

/// Jobs that number the files `1..=n` of `n` in the order given.
#[must_use]
pub fn auto_track_numbers(paths: Vec<PathBuf>) -> Vec<RewriteJob> {
    let total = u32::try_from(paths.len()).unwrap_or(u32::MAX);
    (1..=total)
        .zip(paths)
        .map(|(index, path)| RewriteJob {
            path,
            record: TagRecord {
                track: Some(TrackNumber::of(index, total)),
                ..TagRecord::default()
            },
        })
        .collect()
}

/// Jobs that target one file, in input order, with their input indices.
type Group<T> = (PathBuf, Vec<(usize, T)>);

/// Buckets items by the file they name so that one file is never written by two tasks at once.
fn group_by_file<T>(items: Vec<(PathBuf, T)>) -> Vec<Group<T>> {
    let mut groups: Vec<Group<T>> = Vec::new();
    let mut keys: HashMap<PathBuf, usize> = HashMap::new();
    for (index, (path, item)) in items.into_iter().enumerate() {
        let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        match keys.get(&key) {
            Some(&group) => groups[group].1.push((index, item)),
            None => {
                keys.insert(key, groups.len());
                groups.push((path, vec![(index, item)]));
            }
        }
    }
    groups
}

async fn run_bounded<T, F>(items: Vec<(PathBuf, T)>, workers: usize, work: F) -> BatchReport
where
    T: Send + 'static,
    F: Fn(&Path, T) -> Result<()> + Send + Sync + 'static,
{
    let total = items.len();
    let work = Arc::new(work);
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let paths: Vec<PathBuf> = items.iter().map(|(p, _)| p.clone()).collect();
    let mut outcomes: Vec<Option<Result<()>>> = (0..total).map(|_| None).collect();
    let mut set = JoinSet::new();

    for (path, jobs) in group_by_file(items) {
        // Waiting here is the cancellation point: nothing new starts once the caller stops polling.
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let work = work.clone();
        set.spawn_blocking(move || {
            let _permit = permit;
            if jobs.len() > 1 {
                debug!("Rewriting {} ({} jobs, in order)", path.display(), jobs.len());
            } else {
                debug!("Rewriting {}", path.display());
            }
            jobs.into_iter()
                .map(|(index, item)| (index, work(&path, item)))
                .collect::<Vec<_>>()
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(results) => {
                for (index, res) in results {
                    outcomes[index] = Some(res);
                }
            }
            Err(e) => error!("Rewrite task failed: {e}"),
        }
    }

    let mut report = BatchReport::default();
    for (path, outcome) in paths.into_iter().zip(outcomes) {
        match outcome {
            Some(Ok(())) => report.succeeded.push(path),
            Some(Err(error)) => {
                error!("Failed to rewrite {}: {error}", path.display());
                report.failed.push(FileFailure { path, error });
            }
            None => report.failed.push(FileFailure {
                path,
                error: Error::Interrupted,
            }),
        }
    }
    info!(
        "Batch finished: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::read_current;
    use crate::testutil;

    fn write_song(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test]
    async fn one_bad_file_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let audio = testutil::mpeg_frames(4);
        let good_a = write_song(dir.path(), "a.mp3", &audio);
        let bad = write_song(dir.path(), "b.mp3", b"corrupted, no audio in here");
        let good_c = write_song(dir.path(), "c.mp3", &audio);

        let jobs = [&good_a, &bad, &good_c]
            .iter()
            .enumerate()
            .map(|(i, p)| RewriteJob {
                path: (*p).clone(),
                record: TagRecord {
                    title: Some(format!("Song {i}")),
                    track: Some(TrackNumber::of(u32::try_from(i).unwrap() + 1, 3)),
                    ..TagRecord::default()
                },
            })
            .collect();

        let report = rewrite_batch(Arc::new(TagRewriter::new()), jobs, 2).await;
        assert_eq!(report.succeeded, vec![good_a.clone(), good_c.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, bad);
        assert!(matches!(report.failed[0].error, Error::UnsupportedContainer));

        assert_eq!(read_current(&good_a).unwrap().title.as_deref(), Some("Song 0"));
        assert_eq!(read_current(&good_c).unwrap().title.as_deref(), Some("Song 2"));
        assert_eq!(
            std::fs::read(&bad).unwrap(),
            b"corrupted, no audio in here"
        );
    }

    #[tokio::test]
    async fn missing_files_are_reported() {
        let report = rewrite_batch(
            Arc::new(TagRewriter::new()),
            vec![RewriteJob {
                path: PathBuf::from("/nonexistent/x.mp3"),
                record: TagRecord::default(),
            }],
            1,
        )
        .await;
        assert_eq!(report.total(), 1);
        assert!(matches!(report.failed[0].error, Error::Unreadable { .. }));
    }

    #[tokio::test]
    async fn bulk_cover_uses_tag_then_filename() {
        let dir = tempfile::tempdir().unwrap();
        let audio = testutil::mpeg_frames(4);
        let tagged = write_song(
            dir.path(),
            "01 - Wrong - Name.mp3",
            &testutil::tagged_file(&testutil::sample_tag(), &audio),
        );
        let untagged = write_song(dir.path(), "03 - Queen - Bohemian Rhapsody.mp3", &audio);

        let report = replace_cover_all(
            Arc::new(TagRewriter::new()),
            vec![tagged.clone(), untagged.clone()],
            CoverArt::jpeg(vec![0xFF, 0xD8, 0xFF]),
            4,
        )
        .await;
        assert!(report.is_success());

        let a = read_current(&tagged).unwrap();
        assert_eq!(a.title.as_deref(), Some("Old Title"));
        assert_eq!(a.artist.as_deref(), Some("Old Artist"));
        assert_eq!(a.album.as_deref(), Some("Old Album"));
        assert_eq!(a.picture_count, 1);

        let b = read_current(&untagged).unwrap();
        assert_eq!(b.title.as_deref(), Some("Bohemian Rhapsody"));
        assert_eq!(b.artist.as_deref(), Some("Queen"));
        assert_eq!(b.picture_count, 1);
    }

    #[tokio::test]
    async fn empty_batch() {
        let report = rewrite_batch(Arc::new(TagRewriter::new()), Vec::new(), 0).await;
        assert_eq!(report.total(), 0);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn jobs_on_the_same_file_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let song = write_song(dir.path(), "a.mp3", &testutil::mpeg_frames(4));
        let jobs = vec![
            RewriteJob {
                path: song.clone(),
                record: TagRecord {
                    title: Some("T".into()),
                    ..TagRecord::default()
                },
            },
            RewriteJob {
                path: song.clone(),
                record: TagRecord {
                    artist: Some("A".into()),
                    ..TagRecord::default()
                },
            },
        ];

        let report = rewrite_batch(Arc::new(TagRewriter::new()), jobs, 2).await;
        assert_eq!(report.succeeded, vec![song.clone(), song.clone()]);

        let current = read_current(&song).unwrap();
        assert_eq!(current.title.as_deref(), Some("T"));
        assert_eq!(current.artist.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn album_for_all_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let audio = testutil::mpeg_frames(4);
        let tagged = write_song(
            dir.path(),
            "a.mp3",
            &testutil::tagged_file(&testutil::sample_tag(), &audio),
        );
        let untagged = write_song(dir.path(), "b.mp3", &audio);

        let jobs = album_for_all(vec![tagged.clone(), untagged.clone()], "Greatest Hits");
        let report = rewrite_batch(Arc::new(TagRewriter::new()), jobs, 2).await;
        assert!(report.is_success());

        let a = read_current(&tagged).unwrap();
        assert_eq!(a.album.as_deref(), Some("Greatest Hits"));
        assert_eq!(a.title.as_deref(), Some("Old Title"));
        let b = read_current(&untagged).unwrap();
        assert_eq!(b.album.as_deref(), Some("Greatest Hits"));
        assert_eq!(b.title, None);
    }

    #[tokio::test]
    async fn auto_track_numbers_follow_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let audio = testutil::mpeg_frames(4);
        let paths: Vec<PathBuf> = ["x.mp3", "y.mp3", "z.mp3"]
            .iter()
            .map(|name| write_song(dir.path(), name, &audio))
            .collect();

        let jobs = auto_track_numbers(paths.clone());
        let report = rewrite_batch(Arc::new(TagRewriter::new()), jobs, 3).await;
        assert!(report.is_success());

        for (i, path) in paths.iter().enumerate() {
            let index = u32::try_from(i).unwrap() + 1;
            assert_eq!(
                read_current(path).unwrap().track,
                Some(TrackNumber::of(index, 3))
            );
        }
    }

    #[test]
    fn auto_track_numbers_of_nothing() {
        assert!(auto_track_numbers(Vec::new()).is_empty());
    }
}
