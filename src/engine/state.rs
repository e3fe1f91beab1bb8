// src/engine/state.rs

//! Run state owned exclusively by the core runtime.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::engine::RunExit;

/// Coarse lifecycle phase.
///
/// `Idle -> Watching -> (Stabilizing -> Relocating)* -> Done`, with
/// `TimedOut` and `Stopped` as the other terminal phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Watching,
    Stabilizing,
    Relocating,
    Done,
    TimedOut,
    Stopped,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::TimedOut | Phase::Stopped)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Watching => "watching",
            Phase::Stabilizing => "stabilizing",
            Phase::Relocating => "relocating",
            Phase::Done => "done",
            Phase::TimedOut => "timed-out",
            Phase::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// A file seen in the source directory that has not been relocated yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub first_seen: Instant,
    /// Size reported by the most recent stability check.
    pub last_len: Option<u64>,
    /// Bumped on every (re)start of stabilization; results carrying an
    /// older generation are stale.
    pub generation: u64,
    /// Stability checks run so far.
    pub checks: u32,
    /// Passed its latest stability check.
    pub stable: bool,
}

#[derive(Debug)]
pub struct RunState {
    pub(crate) started: bool,
    pub(crate) candidates: HashMap<PathBuf, CandidateFile>,
    /// Stable candidates waiting for the relocation slot, FIFO.
    pub(crate) queue: VecDeque<PathBuf>,
    pub(crate) relocating: Option<PathBuf>,
    pub(crate) next_generation: u64,
    pub(crate) relocations: u32,
    pub(crate) outcomes: u32,
    pub(crate) heartbeats: u32,
    /// The global timeout fired while a relocation was running.
    pub(crate) timeout_pending: bool,
    pub(crate) exit: Option<RunExit>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            started: false,
            candidates: HashMap::new(),
            queue: VecDeque::new(),
            relocating: None,
            next_generation: 1,
            relocations: 0,
            outcomes: 0,
            heartbeats: 0,
            timeout_pending: false,
            exit: None,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.exit {
            Some(RunExit::Relocated) => return Phase::Done,
            Some(RunExit::TimedOut) => return Phase::TimedOut,
            Some(RunExit::Shutdown) | Some(RunExit::DryRun) => return Phase::Stopped,
            None => {}
        }
        if !self.started {
            Phase::Idle
        } else if self.relocating.is_some() {
            Phase::Relocating
        } else if self.candidates.values().any(|c| !c.stable) {
            Phase::Stabilizing
        } else {
            Phase::Watching
        }
    }

    pub fn candidate(&self, path: &Path) -> Option<&CandidateFile> {
        self.candidates.get(path)
    }

    pub fn pending(&self) -> usize {
        self.candidates.len()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn relocating(&self) -> Option<&Path> {
        self.relocating.as_deref()
    }

    /// Successful (or partially successful) relocations so far.
    pub fn relocations(&self) -> u32 {
        self.relocations
    }

    /// Relocation attempts that produced any outcome.
    pub fn outcomes(&self) -> u32 {
        self.outcomes
    }

    pub fn heartbeats(&self) -> u32 {
        self.heartbeats
    }

    /// True once the timeout has fired and only the running relocation is
    /// still awaited.
    pub fn timeout_pending(&self) -> bool {
        self.timeout_pending
    }

    pub fn exit(&self) -> Option<RunExit> {
        self.exit
    }

    pub(crate) fn bump_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }
}
