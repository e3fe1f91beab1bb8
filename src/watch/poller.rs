// src/watch/poller.rs

//! Polling event source.
//!
//! Lists the source directory on a fixed interval and reports files that are
//! new, or whose size or modification time changed since the last listing.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::watch::patterns::{scan_dir, FileMatcher};

/// What the poller remembers about a file between listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// One listing pass. Returns the paths that should be reported, and updates
/// `seen` (files that disappeared are forgotten).
pub fn poll_once(
    fs: &dyn FileSystem,
    dir: &Path,
    matcher: &FileMatcher,
    seen: &mut HashMap<PathBuf, Fingerprint>,
) -> io::Result<Vec<PathBuf>> {
    let present = scan_dir(fs, dir, matcher)?;
    let mut reported = Vec::new();
    let mut current = HashMap::with_capacity(present.len());

    for path in present {
        let stat = match fs.stat(&path) {
            Ok(stat) => stat,
            // Removed between listing and stat.
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err),
        };
        let fingerprint = Fingerprint {
            len: stat.len,
            modified: stat.modified,
        };
        if seen.get(&path) != Some(&fingerprint) {
            reported.push(path.clone());
        }
        current.insert(path, fingerprint);
    }

    *seen = current;
    Ok(reported)
}

pub fn spawn_poller(
    dir: PathBuf,
    matcher: FileMatcher,
    interval: Duration,
    fs: Arc<dyn FileSystem>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut seen = HashMap::new();
        let mut dir_present = None;

        info!(?dir, ?interval, "polling watcher started");

        loop {
            ticker.tick().await;

            let reported = match poll_once(fs.as_ref(), &dir, &matcher, &mut seen) {
                Ok(paths) => {
                    if dir_present != Some(true) {
                        debug!(?dir, "source directory is available");
                        dir_present = Some(true);
                    }
                    paths
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    if dir_present != Some(false) {
                        info!(?dir, "source directory does not exist yet; waiting");
                        dir_present = Some(false);
                    }
                    continue;
                }
                Err(err) => {
                    warn!(?dir, error = %err, "failed to list source directory");
                    continue;
                }
            };

            for path in reported {
                debug!(?path, "poller reported candidate");
                if runtime_tx
                    .send(RuntimeEvent::CandidateSeen { path })
                    .await
                    .is_err()
                {
                    debug!("runtime channel closed; stopping poller");
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn reports_new_and_changed_files_once() {
        let fs = MockFileSystem::new();
        let dir = Path::new("/dl");
        let matcher = FileMatcher::new("GPT_RESPONSE.md").unwrap();
        let mut seen = HashMap::new();

        fs.add_dir(dir);
        assert!(poll_once(&fs, dir, &matcher, &mut seen).unwrap().is_empty());

        fs.add_file("/dl/GPT_RESPONSE.md", "Target");
        fs.add_file("/dl/ignored.md", "x");
        let first = poll_once(&fs, dir, &matcher, &mut seen).unwrap();
        assert_eq!(first, vec![PathBuf::from("/dl/GPT_RESPONSE.md")]);

        // Unchanged: not reported again.
        assert!(poll_once(&fs, dir, &matcher, &mut seen).unwrap().is_empty());

        fs.append("/dl/GPT_RESPONSE.md", b" path: /tmp\n");
        let changed = poll_once(&fs, dir, &matcher, &mut seen).unwrap();
        assert_eq!(changed.len(), 1);
    }

    #[test]
    fn forgets_removed_files() {
        let fs = MockFileSystem::new();
        let dir = Path::new("/dl");
        let matcher = FileMatcher::new("*.md").unwrap();
        let mut seen = HashMap::new();

        fs.add_file("/dl/a.md", "x");
        poll_once(&fs, dir, &matcher, &mut seen).unwrap();
        fs.remove_file(Path::new("/dl/a.md")).unwrap();
        poll_once(&fs, dir, &matcher, &mut seen).unwrap();
        assert!(seen.is_empty());
    }

    #[test]
    fn missing_directory_is_not_found() {
        let fs = MockFileSystem::new();
        let matcher = FileMatcher::new("*.md").unwrap();
        let err = poll_once(&fs, Path::new("/nope"), &matcher, &mut HashMap::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
