// src/config/validate.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile, WatchRequest};
use crate::errors::{Result, RoutewatchError};
use crate::relocate::RetryPolicy;
use crate::watch::FileMatcher;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RoutewatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let source_dir = resolve_source_dir(raw.watch.source.as_deref())?;
        let matcher = validate_pattern(&raw.watch.pattern)?;

        ensure_positive("watch.poll_interval", raw.watch.poll_interval)?;
        ensure_positive("watch.quiet_period", raw.watch.quiet_period)?;
        ensure_positive("watch.timeout", raw.watch.timeout)?;
        ensure_positive("watch.heartbeat", raw.watch.heartbeat)?;

        let retry = validate_retry(&raw)?;
        let notify_command = raw
            .notify
            .command
            .filter(|cmd| !cmd.trim().is_empty());

        let watch = WatchRequest {
            source_dir,
            matcher,
            strategy: raw.watch.strategy,
            poll_interval: raw.watch.poll_interval,
            quiet_period: raw.watch.quiet_period,
            timeout: raw.watch.timeout,
            heartbeat: raw.watch.heartbeat,
            mode: raw.watch.mode,
        };

        Ok(ConfigFile::new_unchecked(watch, retry, notify_command))
    }
}

/// Turn the configured source into an absolute directory path.
///
/// A directory that does not exist yet is accepted (the event source retries
/// until it appears); an existing non-directory is not.
fn resolve_source_dir(configured: Option<&Path>) -> Result<PathBuf> {
    let path = match configured {
        Some(p) => p.to_path_buf(),
        None => dirs::download_dir().ok_or_else(|| {
            RoutewatchError::ConfigError(
                "no source directory configured and the platform downloads folder could not be resolved"
                    .to_string(),
            )
        })?,
    };

    if path.as_os_str().is_empty() {
        return Err(RoutewatchError::ConfigError(
            "[watch].source must not be empty".to_string(),
        ));
    }

    if path.to_string_lossy().contains('\0') {
        return Err(RoutewatchError::ConfigError(format!(
            "[watch].source contains a NUL byte: {:?}",
            path
        )));
    }

    let absolute = std::path::absolute(&path).map_err(|e| {
        RoutewatchError::ConfigError(format!(
            "cannot make source directory {:?} absolute: {}",
            path, e
        ))
    })?;

    if absolute.exists() && !absolute.is_dir() {
        return Err(RoutewatchError::ConfigError(format!(
            "source {:?} exists but is not a directory",
            absolute
        )));
    }

    Ok(absolute)
}

fn validate_pattern(pattern: &str) -> Result<FileMatcher> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(RoutewatchError::ConfigError(
            "[watch].pattern must not be empty".to_string(),
        ));
    }
    if pattern.contains('/') || pattern.contains('\\') {
        return Err(RoutewatchError::ConfigError(format!(
            "[watch].pattern must be a bare file name or glob, got '{}'",
            pattern
        )));
    }
    FileMatcher::new(pattern).map_err(|e| {
        RoutewatchError::ConfigError(format!("[watch].pattern is not a valid glob: {e:#}"))
    })
}

fn ensure_positive(key: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(RoutewatchError::ConfigError(format!(
            "[{key}] must be greater than zero"
        )));
    }
    Ok(())
}

fn validate_retry(raw: &RawConfigFile) -> Result<RetryPolicy> {
    let section = &raw.relocate;

    if section.max_attempts == 0 {
        return Err(RoutewatchError::ConfigError(
            "[relocate].max_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    ensure_positive("relocate.initial_backoff", section.initial_backoff)?;
    if section.initial_backoff > section.max_backoff {
        return Err(RoutewatchError::ConfigError(format!(
            "[relocate].initial_backoff ({:?}) must not exceed max_backoff ({:?})",
            section.initial_backoff, section.max_backoff
        )));
    }

    Ok(RetryPolicy {
        max_attempts: section.max_attempts,
        initial_backoff: section.initial_backoff,
        max_backoff: section.max_backoff,
    })
}
