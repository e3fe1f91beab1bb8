// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::relocate::RetryPolicy;
use crate::types::{RunMode, WatchStrategy};
use crate::watch::FileMatcher;

/// Default name of the response file dropped into the downloads folder.
pub const DEFAULT_PATTERN: &str = "GPT_RESPONSE.md";

/// Top-level configuration as read from a TOML file, before CLI/env
/// overrides and validation.
///
/// ```toml
/// [watch]
/// source = "/home/me/Downloads"
/// pattern = "GPT_RESPONSE.md"
/// strategy = "notify"
/// quiet_period = "600ms"
/// timeout = "1h"
/// mode = "one-shot"
///
/// [relocate]
/// max_attempts = 6
/// initial_backoff = "500ms"
/// max_backoff = "8s"
///
/// [notify]
/// command = "notify-send routewatch \"$ROUTEWATCH_OUTCOME\""
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub relocate: RelocateSection,

    #[serde(default)]
    pub notify: NotifySection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Directory to watch. `None` falls back to the platform downloads folder.
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Exact file name or glob (matched against the bare file name).
    #[serde(default = "default_pattern")]
    pub pattern: String,

    #[serde(default)]
    pub strategy: WatchStrategy,

    /// Listing interval for the `poll` strategy; also the retry interval
    /// while the source directory does not exist yet.
    #[serde(
        default = "default_poll_interval",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub poll_interval: Duration,

    /// Gap between the two size reads of a stability check.
    #[serde(
        default = "default_quiet_period",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub quiet_period: Duration,

    /// Global run timeout.
    #[serde(
        default = "default_timeout",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub timeout: Duration,

    /// Liveness log interval.
    #[serde(
        default = "default_heartbeat",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub heartbeat: Duration,

    #[serde(default)]
    pub mode: RunMode,
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_quiet_period() -> Duration {
    Duration::from_millis(600)
}

fn default_timeout() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_heartbeat() -> Duration {
    Duration::from_secs(5 * 60)
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            source: None,
            pattern: default_pattern(),
            strategy: WatchStrategy::default(),
            poll_interval: default_poll_interval(),
            quiet_period: default_quiet_period(),
            timeout: default_timeout(),
            heartbeat: default_heartbeat(),
            mode: RunMode::default(),
        }
    }
}

/// `[relocate]` section: retry behaviour for moves.
#[derive(Debug, Clone, Deserialize)]
pub struct RelocateSection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(
        default = "default_initial_backoff",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub initial_backoff: Duration,

    #[serde(
        default = "default_max_backoff",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub max_backoff: Duration,
}

fn default_max_attempts() -> u32 {
    RetryPolicy::default().max_attempts
}

fn default_initial_backoff() -> Duration {
    RetryPolicy::default().initial_backoff
}

fn default_max_backoff() -> Duration {
    RetryPolicy::default().max_backoff
}

impl Default for RelocateSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

/// `[notify]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotifySection {
    /// Shell command run (best-effort) after each relocation attempt.
    #[serde(default)]
    pub command: Option<String>,
}

/// Configuration for a single watcher run. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct WatchRequest {
    /// Absolute path of the watched directory (may not exist yet).
    pub source_dir: PathBuf,
    pub matcher: FileMatcher,
    pub strategy: WatchStrategy,
    pub poll_interval: Duration,
    pub quiet_period: Duration,
    pub timeout: Duration,
    pub heartbeat: Duration,
    pub mode: RunMode,
}

/// Validated configuration.
///
/// You cannot construct this directly; use
/// `ConfigFile::try_from(RawConfigFile)` or
/// [`crate::config::load_effective`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchRequest,
    pub retry: RetryPolicy,
    pub notify_command: Option<String>,
}

impl ConfigFile {
    /// Internal constructor for validated data.
    pub(crate) fn new_unchecked(
        watch: WatchRequest,
        retry: RetryPolicy,
        notify_command: Option<String>,
    ) -> Self {
        Self {
            watch,
            retry,
            notify_command,
        }
    }
}
