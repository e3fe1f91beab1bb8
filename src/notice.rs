// src/notice.rs

//! Best-effort outcome notification.
//!
//! Every relocation outcome is logged. When a notification command is
//! configured it is also run through the platform shell with the outcome in
//! its environment:
//!
//! - `ROUTEWATCH_OUTCOME`: `success`, `partial`, `failure` or `skipped`
//! - `ROUTEWATCH_FILE`: the response file that was handled
//! - `ROUTEWATCH_TARGET`: the target directory (unset when unknown)
//!
//! Nothing here can fail the run.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::relocate::RelocationOutcome;

/// Upper bound on how long a notification command may run.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub file: PathBuf,
    pub target: Option<PathBuf>,
    pub outcome: RelocationOutcome,
}

impl Notice {
    pub fn new(file: &Path, outcome: RelocationOutcome) -> Self {
        Self {
            file: file.to_path_buf(),
            target: outcome.target().map(Path::to_path_buf),
            outcome,
        }
    }
}

/// Sink for relocation outcomes.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    fn notify<'a>(&'a self, notice: &'a Notice) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Writes the outcome to the log only.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    fn log(notice: &Notice) {
        let file = &notice.file;
        let target = &notice.target;
        match &notice.outcome {
            RelocationOutcome::Success { .. } | RelocationOutcome::PartialSuccess { .. } => {
                info!(?file, ?target, outcome = %notice.outcome, "relocation finished");
            }
            RelocationOutcome::Failure { .. } | RelocationOutcome::Skipped { .. } => {
                warn!(?file, ?target, outcome = %notice.outcome, "relocation did not complete");
            }
        }
    }
}

impl Notifier for LogNotifier {
    fn notify<'a>(&'a self, notice: &'a Notice) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move { Self::log(notice) })
    }
}

/// Logs the outcome, then runs a shell command describing it.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    command: String,
    timeout: Duration,
}

impl CommandNotifier {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: NOTIFY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the command once for `notice` and wait for it (bounded by the
    /// timeout; the child is killed when the timeout fires).
    pub async fn run(&self, notice: &Notice) -> Result<ExitStatus> {
        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.command);
            c
        };

        cmd.env("ROUTEWATCH_OUTCOME", notice.outcome.label())
            .env("ROUTEWATCH_FILE", &notice.file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        match &notice.target {
            Some(target) => cmd.env("ROUTEWATCH_TARGET", target),
            None => cmd.env_remove("ROUTEWATCH_TARGET"),
        };

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .with_context(|| format!("notification command timed out after {:?}", self.timeout))?
            .with_context(|| format!("spawning notification command '{}'", self.command))?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!("notify stderr: {}", line);
        }

        Ok(output.status)
    }
}

impl Notifier for CommandNotifier {
    fn notify<'a>(&'a self, notice: &'a Notice) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            LogNotifier::log(notice);
            match self.run(notice).await {
                Ok(status) if status.success() => {
                    debug!(command = %self.command, "notification command finished");
                }
                Ok(status) => {
                    warn!(command = %self.command, exit_code = ?status.code(), "notification command failed");
                }
                Err(err) => {
                    warn!(command = %self.command, error = %format!("{err:#}"), "notification command could not run");
                }
            }
        })
    }
}

/// Pick the notifier for an optional configured command.
pub fn from_command(command: Option<String>) -> Arc<dyn Notifier> {
    match command {
        Some(cmd) => Arc::new(CommandNotifier::new(cmd)),
        None => Arc::new(LogNotifier),
    }
}
