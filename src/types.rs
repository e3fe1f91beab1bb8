use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;

/// How the event source learns about new files in the source directory.
///
/// - `Notify`: native filesystem change notification (`notify` crate),
///   non-recursive, plus a one-off scan of files already present.
/// - `Poll`: list the directory on a fixed interval and report files that are
///   new or whose size/mtime changed since the previous listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WatchStrategy {
    Notify,
    Poll,
}

impl Default for WatchStrategy {
    fn default() -> Self {
        WatchStrategy::Notify
    }
}

/// Whether the watcher stops after its first successful relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Exit with status 0 after the first successful relocation.
    OneShot,
    /// Keep watching until the global timeout or a shutdown request.
    Continuous,
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::OneShot
    }
}

impl RunMode {
    pub fn is_one_shot(self) -> bool {
        matches!(self, RunMode::OneShot)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::OneShot => f.write_str("one-shot"),
            RunMode::Continuous => f.write_str("continuous"),
        }
    }
}
