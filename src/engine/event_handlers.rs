// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::path::PathBuf;
use std::time::Instant;

use crate::engine::state::{CandidateFile, Phase, RunState};
use crate::engine::{RunExit, RuntimeOptions};
use crate::relocate::RelocationOutcome;
use crate::watch::Stability;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Run the stability detector on `path`; report back with `generation`.
    CheckStability { path: PathBuf, generation: u64 },
    /// Parse the header of `path` and relocate it.
    Relocate { path: PathBuf },
    /// Report a relocation outcome (log + optional notification).
    Announce {
        path: PathBuf,
        outcome: RelocationOutcome,
    },
    /// Emit a liveness log line.
    Heartbeat {
        phase: Phase,
        pending: usize,
        relocations: u32,
    },
    /// The run is over.
    RequestExit(RunExit),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn idle() -> Self {
        Self::running(Vec::new())
    }

    fn finish(state: &mut RunState, mut commands: Vec<CoreCommand>, exit: RunExit) -> Self {
        state.exit = Some(exit);
        commands.push(CoreCommand::RequestExit(exit));
        Self {
            commands,
            keep_running: false,
        }
    }
}

/// Handle a detection from the event source.
///
/// - Unknown path: start tracking it and schedule a stability check.
/// - Path already stabilising, or stable and queued: restart stabilization
///   under a new generation (any in-flight result becomes stale).
/// - Path currently being relocated: ignore; the engine re-reads it anyway.
/// - Timeout already fired: ignore; the run only waits for the running
///   relocation.
pub fn handle_candidate_seen(state: &mut RunState, path: PathBuf) -> CoreStep {
    if state.timeout_pending || state.relocating.as_deref() == Some(path.as_path()) {
        return CoreStep::idle();
    }

    state.queue.retain(|queued| queued != &path);
    let generation = state.bump_generation();

    let candidate = state
        .candidates
        .entry(path.clone())
        .or_insert_with(|| CandidateFile {
            path: path.clone(),
            first_seen: Instant::now(),
            last_len: None,
            generation,
            checks: 0,
            stable: false,
        });
    candidate.generation = generation;
    candidate.stable = false;

    CoreStep::running(vec![CoreCommand::CheckStability { path, generation }])
}

/// Handle a finished stability check.
pub fn handle_stability_checked(
    state: &mut RunState,
    path: PathBuf,
    generation: u64,
    stability: Stability,
) -> CoreStep {
    if state.timeout_pending || state.relocating.as_deref() == Some(path.as_path()) {
        return CoreStep::idle();
    }
    let Some(candidate) = state.candidates.get_mut(&path) else {
        return CoreStep::idle();
    };
    if candidate.generation != generation {
        // Superseded by a newer detection.
        return CoreStep::idle();
    }
    candidate.checks += 1;

    match stability {
        Stability::Stable { len } => {
            candidate.last_len = Some(len);
            candidate.stable = true;
            if !state.queue.contains(&path) {
                state.queue.push_back(path);
            }
            CoreStep::running(start_next_relocation(state))
        }
        Stability::Vanished => {
            state.candidates.remove(&path);
            CoreStep::idle()
        }
        other => {
            if let Stability::Growing { to, .. } = other {
                candidate.last_len = Some(to);
            }
            let generation = state.bump_generation();
            if let Some(candidate) = state.candidates.get_mut(&path) {
                candidate.generation = generation;
            }
            CoreStep::running(vec![CoreCommand::CheckStability { path, generation }])
        }
    }
}

/// Handle a finished relocation.
pub fn handle_relocation_finished(
    state: &mut RunState,
    options: &RuntimeOptions,
    path: PathBuf,
    outcome: RelocationOutcome,
) -> CoreStep {
    if state.relocating.as_deref() == Some(path.as_path()) {
        state.relocating = None;
    }
    // Failed or skipped files stay on disk; a later change re-detects them.
    state.candidates.remove(&path);
    state.outcomes += 1;

    let success = outcome.is_success();
    let mut commands = vec![CoreCommand::Announce { path, outcome }];

    if success {
        state.relocations += 1;
        if options.mode.is_one_shot() {
            return CoreStep::finish(state, commands, RunExit::Relocated);
        }
    }

    if state.timeout_pending {
        let exit = timeout_exit(state);
        return CoreStep::finish(state, commands, exit);
    }

    commands.extend(start_next_relocation(state));
    CoreStep::running(commands)
}

pub fn handle_heartbeat(state: &mut RunState) -> CoreStep {
    state.heartbeats += 1;
    CoreStep::running(vec![CoreCommand::Heartbeat {
        phase: state.phase(),
        pending: state.pending(),
        relocations: state.relocations,
    }])
}

/// Global timeout: a run that relocated something still counts as a
/// success (continuous mode); otherwise it is a timeout.
///
/// A relocation in flight may already have moved the main file, so the exit
/// waits for its outcome. The retry policy bounds that wait.
pub fn handle_timeout(state: &mut RunState) -> CoreStep {
    if state.relocating.is_some() {
        state.timeout_pending = true;
        state.queue.clear();
        return CoreStep::idle();
    }
    let exit = timeout_exit(state);
    CoreStep::finish(state, Vec::new(), exit)
}

fn timeout_exit(state: &RunState) -> RunExit {
    if state.relocations > 0 {
        RunExit::Relocated
    } else {
        RunExit::TimedOut
    }
}

pub fn handle_shutdown(state: &mut RunState) -> CoreStep {
    CoreStep::finish(state, Vec::new(), RunExit::Shutdown)
}

/// If nothing is being relocated, hand the oldest stable candidate to the
/// relocation engine.
fn start_next_relocation(state: &mut RunState) -> Vec<CoreCommand> {
    if state.relocating.is_some() || state.timeout_pending {
        return Vec::new();
    }

    while let Some(path) = state.queue.pop_front() {
        let ready = state
            .candidates
            .get(&path)
            .is_some_and(|candidate| candidate.stable);
        if ready {
            state.relocating = Some(path.clone());
            return vec![CoreCommand::Relocate { path }];
        }
    }

    Vec::new()
}
