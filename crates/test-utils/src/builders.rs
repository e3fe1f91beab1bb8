#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use routewatch::config::{ConfigFile, RawConfigFile};
use routewatch::types::{RunMode, WatchStrategy};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults with test-friendly timings: a short
/// quiet period, fast polling, quick retries and a 10s timeout.
pub struct RawConfigBuilder {
    config: RawConfigFile,
}

impl RawConfigBuilder {
    pub fn new(source: impl AsRef<Path>) -> Self {
        let mut config = RawConfigFile::default();
        config.watch.source = Some(source.as_ref().to_path_buf());
        config.watch.poll_interval = Duration::from_millis(50);
        config.watch.quiet_period = Duration::from_millis(100);
        config.watch.timeout = Duration::from_secs(10);
        config.relocate.initial_backoff = Duration::from_millis(20);
        config.relocate.max_backoff = Duration::from_millis(100);
        Self { config }
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.config.watch.pattern = pattern.to_string();
        self
    }

    pub fn strategy(mut self, strategy: WatchStrategy) -> Self {
        self.config.watch.strategy = strategy;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.watch.poll_interval = interval;
        self
    }

    pub fn quiet_period(mut self, quiet: Duration) -> Self {
        self.config.watch.quiet_period = quiet;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.watch.timeout = timeout;
        self
    }

    pub fn heartbeat(mut self, heartbeat: Duration) -> Self {
        self.config.watch.heartbeat = heartbeat;
        self
    }

    pub fn continuous(mut self) -> Self {
        self.config.watch.mode = RunMode::Continuous;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.relocate.max_attempts = attempts;
        self
    }

    pub fn notify_command(mut self, cmd: &str) -> Self {
        self.config.notify.command = Some(cmd.to_string());
        self
    }

    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.config.watch.source = Some(source.into());
        self
    }

    /// The raw (unvalidated) config, e.g. to assert on validation errors.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
