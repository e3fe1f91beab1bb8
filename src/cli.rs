// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Most flags can also be supplied through `ROUTEWATCH_*` environment
//! variables; explicit flags win over the environment, which wins over the
//! config file.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::parse_duration;
use crate::types::WatchStrategy;

/// Command-line arguments for `routewatch`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "routewatch",
    version,
    about = "Watch a downloads folder for a response file and route it to the directory named in its header.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a TOML config file.
    ///
    /// Default: `Routewatch.toml` in the current directory, if it exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory to watch (defaults to the platform downloads folder).
    #[arg(long, value_name = "DIR", env = "ROUTEWATCH_SOURCE")]
    pub source: Option<PathBuf>,

    /// File name or glob of the response file.
    #[arg(long, value_name = "GLOB", env = "ROUTEWATCH_PATTERN")]
    pub pattern: Option<String>,

    /// Event source: native notifications or directory polling.
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub strategy: Option<WatchStrategy>,

    /// Polling interval, e.g. `1s`.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Quiet period between the two size checks, e.g. `600ms`.
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = parse_duration,
        env = "ROUTEWATCH_QUIET_PERIOD"
    )]
    pub quiet_period: Option<Duration>,

    /// Give up after this long, e.g. `1h`.
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = parse_duration,
        env = "ROUTEWATCH_TIMEOUT"
    )]
    pub timeout: Option<Duration>,

    /// Interval between liveness log lines, e.g. `5m`.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub heartbeat: Option<Duration>,

    /// Keep watching after a successful relocation.
    #[arg(long, conflicts_with = "one_shot")]
    pub continuous: bool,

    /// Stop after the first successful relocation (the default).
    #[arg(long)]
    pub one_shot: bool,

    /// Shell command to run after each relocation attempt.
    #[arg(long, value_name = "CMD")]
    pub notify_cmd: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ROUTEWATCH_LOG` (a level or filter directives) or `info`
    /// is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Append log lines to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Validate the configuration, print it, and exit without watching.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations_and_mode_flags() {
        let args = CliArgs::try_parse_from([
            "routewatch",
            "--source",
            "/tmp/downloads",
            "--timeout",
            "2s",
            "--quiet-period",
            "100ms",
            "--strategy",
            "poll",
            "--continuous",
        ])
        .unwrap();

        assert_eq!(args.source, Some(PathBuf::from("/tmp/downloads")));
        assert_eq!(args.timeout, Some(Duration::from_secs(2)));
        assert_eq!(args.quiet_period, Some(Duration::from_millis(100)));
        assert_eq!(args.strategy, Some(WatchStrategy::Poll));
        assert!(args.continuous);
    }

    #[test]
    fn continuous_and_one_shot_conflict() {
        let res = CliArgs::try_parse_from(["routewatch", "--continuous", "--one-shot"]);
        assert!(res.is_err());
    }

    #[test]
    fn bad_duration_is_rejected() {
        let res = CliArgs::try_parse_from(["routewatch", "--timeout", "soon"]);
        assert!(res.is_err());
    }
}
