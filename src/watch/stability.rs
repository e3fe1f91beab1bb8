// src/watch/stability.rs

//! Write-completion detection.
//!
//! A candidate is only handed to the relocation engine once two size reads
//! separated by the quiet period agree, the size is non-zero, and the file
//! can be opened for reading without sharing it with a writer.

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::fs::FileSystem;

/// Result of a single stability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    /// Safe to read and move.
    Stable { len: u64 },
    /// Size differed between the two reads.
    Growing { from: u64, to: u64 },
    /// Exists but has no content yet.
    Empty,
    /// Another process still holds a write handle.
    Locked,
    /// Transient I/O error while checking; try again later.
    Unreadable,
    /// Gone (or replaced by a directory); drop the candidate.
    Vanished,
}

impl Stability {
    pub fn is_stable(self) -> bool {
        matches!(self, Stability::Stable { .. })
    }

    pub fn is_vanished(self) -> bool {
        matches!(self, Stability::Vanished)
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stability::Stable { len } => write!(f, "stable ({len} bytes)"),
            Stability::Growing { from, to } => write!(f, "growing ({from} -> {to} bytes)"),
            Stability::Empty => f.write_str("empty"),
            Stability::Locked => f.write_str("locked by a writer"),
            Stability::Unreadable => f.write_str("unreadable"),
            Stability::Vanished => f.write_str("vanished"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StabilityDetector {
    fs: Arc<dyn FileSystem>,
    quiet_period: Duration,
}

impl StabilityDetector {
    pub fn new(fs: Arc<dyn FileSystem>, quiet_period: Duration) -> Self {
        Self { fs, quiet_period }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Convenience: `true` only for [`Stability::Stable`].
    pub async fn is_stable(&self, path: &Path) -> bool {
        self.check(path).await.is_stable()
    }

    /// Read the size, wait the quiet period, read it again, then probe for
    /// an exclusive-of-write read handle.
    pub async fn check(&self, path: &Path) -> Stability {
        let first = match self.current_len(path) {
            Ok(len) => len,
            Err(outcome) => return outcome,
        };

        tokio::time::sleep(self.quiet_period).await;

        let second = match self.current_len(path) {
            Ok(len) => len,
            Err(outcome) => return outcome,
        };

        if first != second {
            debug!(?path, from = first, to = second, "candidate still growing");
            return Stability::Growing {
                from: first,
                to: second,
            };
        }
        if second == 0 {
            return Stability::Empty;
        }

        match self.fs.probe_shared_read(path) {
            Ok(()) => Stability::Stable { len: second },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Stability::Vanished,
            Err(err) => {
                debug!(?path, error = %err, "candidate still held by a writer");
                Stability::Locked
            }
        }
    }

    fn current_len(&self, path: &Path) -> Result<u64, Stability> {
        match self.fs.stat(path) {
            Ok(stat) if stat.is_file => Ok(stat.len),
            Ok(_) => Err(Stability::Vanished),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(Stability::Vanished),
            Err(err) => {
                debug!(?path, error = %err, "stat failed during stability check");
                Err(Stability::Unreadable)
            }
        }
    }
}
