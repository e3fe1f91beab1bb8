// src/relocate/engine.rs

//! Moving a stable response file (and its companions) into place.
//!
//! Moves never overwrite: the destination is created with link/create-new
//! semantics, and a name collision bumps the `_<n>` suffix instead.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::header::{parse_header, ResponseHeader};
use crate::relocate::naming::{candidate_name, MAX_COLLISION_SUFFIX};
use crate::relocate::retry::{is_transient, RetryPolicy};
use crate::watch::{direct_child_name, Stability, StabilityDetector};

/// A file that ended up in the target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// A declared companion that was not relocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCompanion {
    pub name: String,
    pub reason: String,
}

/// Result of handling one stable candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocationOutcome {
    /// Main file and every declared companion moved.
    Success { moved: Vec<MovedFile> },
    /// Main file moved; some companions were absent or could not be moved.
    PartialSuccess {
        moved: Vec<MovedFile>,
        missing: Vec<MissingCompanion>,
    },
    /// The main file could not be moved; it stays in the source directory.
    Failure {
        target: PathBuf,
        attempts: u32,
        error: String,
    },
    /// Nothing was attempted (header unparseable, file gone or not text).
    Skipped { reason: String },
}

impl RelocationOutcome {
    /// Short machine-friendly label, also exported to notification commands.
    pub fn label(&self) -> &'static str {
        match self {
            RelocationOutcome::Success { .. } => "success",
            RelocationOutcome::PartialSuccess { .. } => "partial",
            RelocationOutcome::Failure { .. } => "failure",
            RelocationOutcome::Skipped { .. } => "skipped",
        }
    }

    /// True when the main file reached its target directory.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RelocationOutcome::Success { .. } | RelocationOutcome::PartialSuccess { .. }
        )
    }

    pub fn moved(&self) -> &[MovedFile] {
        match self {
            RelocationOutcome::Success { moved }
            | RelocationOutcome::PartialSuccess { moved, .. } => moved,
            _ => &[],
        }
    }

    /// Target directory, when a header was parsed.
    pub fn target(&self) -> Option<&Path> {
        match self {
            RelocationOutcome::Failure { target, .. } => Some(target),
            _ => self.moved().first().and_then(|m| m.destination.parent()),
        }
    }
}

impl fmt::Display for RelocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelocationOutcome::Success { moved } => {
                write!(f, "success: moved {} file(s)", moved.len())
            }
            RelocationOutcome::PartialSuccess { moved, missing } => {
                let names: Vec<&str> = missing.iter().map(|m| m.name.as_str()).collect();
                write!(
                    f,
                    "partial success: moved {} file(s), missing companion(s): {}",
                    moved.len(),
                    names.join(", ")
                )
            }
            RelocationOutcome::Failure {
                attempts, error, ..
            } => write!(f, "failure after {attempts} attempt(s): {error}"),
            RelocationOutcome::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Why a single file could not be moved.
#[derive(Debug)]
pub struct MoveFailure {
    pub attempts: u32,
    pub error: io::Error,
}

#[derive(Debug, Clone)]
pub struct RelocationEngine {
    fs: Arc<dyn FileSystem>,
    stability: StabilityDetector,
    retry: RetryPolicy,
}

impl RelocationEngine {
    pub fn new(fs: Arc<dyn FileSystem>, stability: StabilityDetector, retry: RetryPolicy) -> Self {
        Self {
            fs,
            stability,
            retry,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Read, parse and relocate a candidate that was judged stable.
    ///
    /// The header is parsed from the current content every time.
    pub async fn process(&self, path: &Path) -> RelocationOutcome {
        let content = match self.fs.read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return RelocationOutcome::Skipped {
                    reason: "file vanished before it could be read".to_string(),
                };
            }
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                warn!(?path, "candidate is not valid UTF-8 text; leaving it in place");
                return RelocationOutcome::Skipped {
                    reason: format!("not a text file: {err}"),
                };
            }
            Err(err) => {
                warn!(?path, error = %err, "failed to read candidate");
                return RelocationOutcome::Skipped {
                    reason: format!("read failed: {err}"),
                };
            }
        };

        let header = match parse_header(&content) {
            Ok(header) => header,
            Err(err) => {
                warn!(?path, error = %err, "response header could not be parsed; leaving file in place");
                return RelocationOutcome::Skipped {
                    reason: format!("parse error: {err}"),
                };
            }
        };

        for rejected in &header.rejected {
            warn!(?path, companion = %rejected, "dropping companion declaration");
        }

        self.relocate(path, &header).await
    }

    /// Move `main` and its declared companions into `header.target_dir`.
    pub async fn relocate(&self, main: &Path, header: &ResponseHeader) -> RelocationOutcome {
        let target = &header.target_dir;

        if direct_child_name(target, main).is_some() {
            warn!(path = ?main, ?target, "target directory is the source directory; leaving file in place");
            return RelocationOutcome::Skipped {
                reason: "target directory is the source directory".to_string(),
            };
        }

        let destination = match self.relocate_file(main, target).await {
            Ok(dest) => dest,
            Err(failure) => {
                warn!(
                    path = ?main,
                    ?target,
                    attempts = failure.attempts,
                    error = %failure.error,
                    "giving up on relocation; file stays in the source directory"
                );
                return RelocationOutcome::Failure {
                    target: target.clone(),
                    attempts: failure.attempts,
                    error: failure.error.to_string(),
                };
            }
        };
        info!(from = ?main, to = ?destination, "relocated response file");

        let mut moved = vec![MovedFile {
            source: main.to_path_buf(),
            destination,
        }];
        let mut missing = Vec::new();

        let source_dir = main.parent().unwrap_or_else(|| Path::new("."));
        let main_name = main.file_name().map(|n| n.to_string_lossy().into_owned());
        let mut seen = HashSet::new();

        for name in &header.companions {
            if main_name.as_deref() == Some(name.as_str()) || !seen.insert(name.as_str()) {
                continue;
            }
            let source = source_dir.join(name);

            if let Err(reason) = self.await_companion(&source).await {
                warn!(companion = %name, %reason, "companion not relocated");
                missing.push(MissingCompanion {
                    name: name.clone(),
                    reason,
                });
                continue;
            }

            match self.relocate_file(&source, target).await {
                Ok(destination) => {
                    info!(from = ?source, to = ?destination, "relocated companion file");
                    moved.push(MovedFile {
                        source,
                        destination,
                    });
                }
                Err(failure) => {
                    let reason = format!(
                        "move failed after {} attempt(s): {}",
                        failure.attempts, failure.error
                    );
                    warn!(companion = %name, %reason, "companion not relocated");
                    missing.push(MissingCompanion {
                        name: name.clone(),
                        reason,
                    });
                }
            }
        }

        if missing.is_empty() {
            RelocationOutcome::Success { moved }
        } else {
            RelocationOutcome::PartialSuccess { moved, missing }
        }
    }

    /// Create `dir` (and parents) if needed. Calling it again is a no-op.
    pub fn ensure_target_dir(&self, dir: &Path) -> io::Result<()> {
        if self.fs.is_dir(dir) {
            return Ok(());
        }
        debug!(?dir, "creating target directory");
        self.fs.create_dir_all(dir)
    }

    /// Move one file into `target_dir`, retrying transient failures with
    /// backoff. Returns the final destination path.
    pub async fn relocate_file(&self, src: &Path, target_dir: &Path) -> Result<PathBuf, MoveFailure> {
        let Some(name) = src.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Err(MoveFailure {
                attempts: 0,
                error: io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
            });
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            let result = self
                .ensure_target_dir(target_dir)
                .and_then(|()| self.move_no_clobber(src, target_dir, &name));

            let error = match result {
                Ok(dest) => return Ok(dest),
                Err(err) => err,
            };

            // NotFound while the source is still there means the target
            // directory disappeared under us.
            let retryable = is_transient(&error)
                || (error.kind() == io::ErrorKind::NotFound && self.fs.exists(src));

            if !retryable || attempt >= self.retry.max_attempts {
                return Err(MoveFailure { attempts: attempt, error });
            }

            let delay = self.retry.delay_for(attempt);
            warn!(
                path = ?src,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "move failed; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Place `src` in `dir` under `name`, or the first free `_<n>` variant.
    pub fn move_no_clobber(&self, src: &Path, dir: &Path, name: &str) -> io::Result<PathBuf> {
        for n in 0..=MAX_COLLISION_SUFFIX {
            let dest = dir.join(candidate_name(name, n));
            match self.place(src, &dest) {
                Ok(()) => return Ok(dest),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(?dest, "destination taken; trying next suffix");
                }
                Err(err) => return Err(err),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free name for {name} in {}", dir.display()),
        ))
    }

    /// Link-then-unlink, falling back to create-new copy when links are not
    /// possible (e.g. across volumes).
    fn place(&self, src: &Path, dest: &Path) -> io::Result<()> {
        match self.fs.hard_link(src, dest) {
            Ok(()) => {}
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::NotFound
                ) =>
            {
                return Err(err);
            }
            Err(err) => {
                debug!(?src, ?dest, error = %err, "hard link unavailable; copying");
                self.fs.copy_new(src, dest)?;
            }
        }

        if let Err(err) = self.fs.remove_file(src) {
            if err.kind() == io::ErrorKind::NotFound || !self.fs.exists(src) {
                // Someone else removed the source; dest is now the only copy.
                warn!(?src, ?dest, "source vanished after it was placed; keeping destination");
                return Ok(());
            }
            // Undo so the source stays the single copy.
            if let Err(undo) = self.fs.remove_file(dest) {
                warn!(?dest, error = %undo, "failed to remove duplicate after aborted move");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Wait (bounded by the retry policy) for a companion to become stable.
    async fn await_companion(&self, path: &Path) -> Result<(), String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let stability = self.stability.check(path).await;
            match stability {
                Stability::Stable { .. } => return Ok(()),
                Stability::Vanished => {
                    return Err("not present in the source directory".to_string());
                }
                other if attempt >= self.retry.max_attempts => {
                    return Err(format!("never became stable ({other})"));
                }
                other => {
                    debug!(?path, attempt, state = %other, "companion not stable yet");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::time::Duration;

    fn engine(fs: &MockFileSystem) -> RelocationEngine {
        let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
        RelocationEngine::new(
            fs.clone(),
            StabilityDetector::new(fs, Duration::from_millis(50)),
            RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_millis(40),
            },
        )
    }

    #[test]
    fn ensure_target_dir_is_idempotent() {
        let fs = MockFileSystem::new();
        let engine = engine(&fs);
        engine.ensure_target_dir(Path::new("/out/a/b")).unwrap();
        engine.ensure_target_dir(Path::new("/out/a/b")).unwrap();
        assert_eq!(fs.list("/out/a"), vec!["b"]);
    }

    #[test]
    fn collision_gets_suffix_instead_of_overwrite() {
        let fs = MockFileSystem::new();
        fs.add_file("/out/r.md", "old");
        fs.add_file("/out/r_1.md", "older");
        fs.add_file("/dl/r.md", "new");

        let dest = engine(&fs)
            .move_no_clobber(Path::new("/dl/r.md"), Path::new("/out"), "r.md")
            .unwrap();

        assert_eq!(dest, PathBuf::from("/out/r_2.md"));
        assert_eq!(fs.contents("/out/r.md").unwrap(), b"old");
        assert_eq!(fs.contents("/out/r_2.md").unwrap(), b"new");
        assert!(fs.contents("/dl/r.md").is_none());
    }

    #[test]
    fn copy_fallback_when_links_unsupported() {
        let fs = MockFileSystem::new();
        fs.disable_hard_links();
        fs.add_dir("/out");
        fs.add_file("/dl/r.md", "body");

        let dest = engine(&fs)
            .move_no_clobber(Path::new("/dl/r.md"), Path::new("/out"), "r.md")
            .unwrap();
        assert_eq!(fs.contents(dest).unwrap(), b"body");
        assert!(fs.list("/dl").is_empty());
    }

    #[test]
    fn locked_source_is_left_alone() {
        let fs = MockFileSystem::new();
        fs.add_dir("/out");
        fs.add_file("/dl/r.md", "body");
        fs.lock("/dl/r.md");

        let err = engine(&fs)
            .move_no_clobber(Path::new("/dl/r.md"), Path::new("/out"), "r.md")
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(fs.list("/out").is_empty());
        assert_eq!(fs.contents("/dl/r.md").unwrap(), b"body");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let fs = MockFileSystem::new();
        fs.add_file("/dl/r.md", "body");
        // One failed attempt = failed link + failed copy fallback.
        fs.fail_moves("/dl/r.md", io::ErrorKind::PermissionDenied, 2);

        let dest = engine(&fs)
            .relocate_file(Path::new("/dl/r.md"), Path::new("/out"))
            .await
            .unwrap();
        assert_eq!(dest, PathBuf::from("/out/r.md"));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_bounded() {
        let fs = MockFileSystem::new();
        fs.add_file("/dl/r.md", "body");
        fs.fail_moves("/dl/r.md", io::ErrorKind::PermissionDenied, 100);

        let failure = engine(&fs)
            .relocate_file(Path::new("/dl/r.md"), Path::new("/out"))
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert_eq!(failure.error.kind(), io::ErrorKind::PermissionDenied);
        assert!(fs.contents("/dl/r.md").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let fs = MockFileSystem::new();
        fs.add_file("/dl/r.md", "body");
        // A file where the target directory should be.
        fs.add_file("/out", "not a dir");

        let failure = engine(&fs)
            .relocate_file(Path::new("/dl/r.md"), Path::new("/out/sub"))
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 1);
    }

    #[test]
    fn source_removed_by_someone_else_keeps_the_placed_copy() {
        let fs = MockFileSystem::new();
        fs.add_dir("/out");
        fs.add_file("/dl/r.md", "body");
        fs.vanish_after_link("/dl/r.md");

        let dest = engine(&fs)
            .move_no_clobber(Path::new("/dl/r.md"), Path::new("/out"), "r.md")
            .unwrap();
        assert_eq!(dest, PathBuf::from("/out/r.md"));
        assert_eq!(fs.contents("/out/r.md").unwrap(), b"body");
        assert!(fs.contents("/dl/r.md").is_none());
    }

    #[cfg(unix)]
    #[tokio::test(start_paused = true)]
    async fn target_equal_to_source_dir_is_skipped() {
        let fs = MockFileSystem::new();
        fs.add_file("/dl/r.md", "Target path: /dl\nFiles: a.txt\n\nhi");
        fs.add_file("/dl/a.txt", "a");

        let outcome = engine(&fs).process(Path::new("/dl/r.md")).await;
        assert!(
            matches!(&outcome, RelocationOutcome::Skipped { reason } if reason.contains("source directory")),
            "{outcome:?}"
        );
        assert_eq!(fs.list("/dl"), vec!["a.txt", "r.md"]);
    }

    #[tokio::test(start_paused = true)]
    async fn process_skips_unparseable_header() {
        let fs = MockFileSystem::new();
        fs.add_file("/dl/r.md", "no header here\n");

        let outcome = engine(&fs).process(Path::new("/dl/r.md")).await;
        assert_eq!(outcome.label(), "skipped");
        assert!(fs.contents("/dl/r.md").is_some());
    }

    #[cfg(unix)]
    #[tokio::test(start_paused = true)]
    async fn process_moves_main_and_companions() {
        let fs = MockFileSystem::new();
        fs.add_file("/dl/r.md", "Target path: /out\nFiles: a.txt, b.txt, a.txt, r.md\n\nhi");
        fs.add_file("/dl/a.txt", "a");

        let outcome = engine(&fs).process(Path::new("/dl/r.md")).await;
        match &outcome {
            RelocationOutcome::PartialSuccess { moved, missing } => {
                assert_eq!(moved.len(), 2);
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].name, "b.txt");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(outcome.target(), Some(Path::new("/out")));
        assert_eq!(fs.list("/out"), vec!["a.txt", "r.md"]);
        assert!(fs.list("/dl").is_empty());
    }
}
