// src/engine/mod.rs

//! Lifecycle controller for routewatch.
//!
//! This module ties together:
//! - candidate tracking (which files are being stabilised, which wait for
//!   relocation)
//! - the main runtime event loop that reacts to:
//!   - event-source detections
//!   - stability and relocation results
//!   - heartbeat / timeout ticks
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;
use std::path::PathBuf;

use crate::relocate::RelocationOutcome;
use crate::types::RunMode;
use crate::watch::Stability;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// One-shot runs end after the first successful relocation.
    pub mode: RunMode,
}

/// Why a run ended. Maps onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// One-shot relocation done, or a continuous run that relocated at
    /// least once before its timeout.
    Relocated,
    /// Shutdown requested (Ctrl-C) or event sources gone.
    Shutdown,
    /// Global timeout reached with nothing relocated.
    TimedOut,
    /// `--dry-run`: configuration printed, nothing watched.
    DryRun,
}

impl RunExit {
    pub fn exit_code(self) -> i32 {
        match self {
            RunExit::Relocated | RunExit::Shutdown | RunExit::DryRun => 0,
            RunExit::TimedOut => 1,
        }
    }
}

impl fmt::Display for RunExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunExit::Relocated => f.write_str("relocated"),
            RunExit::Shutdown => f.write_str("shutdown"),
            RunExit::TimedOut => f.write_str("timed out"),
            RunExit::DryRun => f.write_str("dry run"),
        }
    }
}

/// Events flowing into the runtime from event sources, backends and timers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A file matching the pattern was created or changed.
    CandidateSeen { path: PathBuf },
    /// A stability check finished.
    StabilityChecked {
        path: PathBuf,
        generation: u64,
        stability: Stability,
    },
    /// The relocation engine finished with a candidate.
    RelocationFinished {
        path: PathBuf,
        outcome: RelocationOutcome,
    },
    /// Periodic liveness tick.
    HeartbeatTick,
    /// The global run timeout elapsed.
    TimeoutElapsed,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod backend;
pub mod core;
pub mod event_handlers;
pub mod runtime;
pub mod state;

pub use backend::{CandidateBackend, RealCandidateBackend};
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{spawn_lifecycle_timers, LifecycleTimers, Runtime};
pub use state::{CandidateFile, Phase, RunState};
