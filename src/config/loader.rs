// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, RoutewatchError};
use crate::types::RunMode;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] or [`load_effective`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        RoutewatchError::ConfigError(format!("reading config file at {:?}: {}", path, e))
    })?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it, without CLI overrides.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// Build the effective configuration for a run.
///
/// Precedence, highest first:
/// - CLI flags (clap also fills them from `ROUTEWATCH_*` env vars),
/// - the TOML file from `--config` (which must exist), or
///   [`default_config_path`] if that file happens to exist,
/// - built-in defaults.
pub fn load_effective(args: &CliArgs) -> Result<ConfigFile> {
    let mut raw = match &args.config {
        Some(path) => {
            debug!(?path, "loading config file");
            load_from_path(path)?
        }
        None => {
            let fallback = default_config_path();
            if fallback.is_file() {
                debug!(path = ?fallback, "loading default config file");
                load_from_path(&fallback)?
            } else {
                RawConfigFile::default()
            }
        }
    };

    apply_overrides(&mut raw, args);
    ConfigFile::try_from(raw)
}

/// Layer CLI/env values on top of whatever the config file provided.
pub fn apply_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if let Some(source) = &args.source {
        raw.watch.source = Some(source.clone());
    }
    if let Some(pattern) = &args.pattern {
        raw.watch.pattern = pattern.clone();
    }
    if let Some(strategy) = args.strategy {
        raw.watch.strategy = strategy;
    }
    if let Some(interval) = args.poll_interval {
        raw.watch.poll_interval = interval;
    }
    if let Some(quiet) = args.quiet_period {
        raw.watch.quiet_period = quiet;
    }
    if let Some(timeout) = args.timeout {
        raw.watch.timeout = timeout;
    }
    if let Some(heartbeat) = args.heartbeat {
        raw.watch.heartbeat = heartbeat;
    }
    if args.continuous {
        raw.watch.mode = RunMode::Continuous;
    } else if args.one_shot {
        raw.watch.mode = RunMode::OneShot;
    }
    if let Some(cmd) = &args.notify_cmd {
        raw.notify.command = Some(cmd.clone());
    }
}

/// Config file picked up from the working directory when `--config` is absent.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Routewatch.toml")
}
