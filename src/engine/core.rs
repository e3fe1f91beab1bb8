// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated [`RunState`]
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - running stability checks and relocations through a backend
//! - timers, notifications and shutdown
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use crate::engine::event_handlers::{
    handle_candidate_seen, handle_heartbeat, handle_relocation_finished, handle_shutdown,
    handle_stability_checked, handle_timeout, CoreStep,
};
use crate::engine::state::{Phase, RunState};
use crate::engine::{RunExit, RuntimeEvent, RuntimeOptions};

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    state: RunState,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(options: RuntimeOptions) -> Self {
        Self {
            state: RunState::new(),
            options,
        }
    }

    /// `Idle -> Watching`. Called once the event source is up.
    pub fn start(&mut self) {
        self.state.started = true;
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Terminal result, once the run is over.
    pub fn exit(&self) -> Option<RunExit> {
        self.state.exit()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        if self.state.exit.is_some() {
            return CoreStep {
                commands: Vec::new(),
                keep_running: false,
            };
        }

        match event {
            RuntimeEvent::CandidateSeen { path } => handle_candidate_seen(&mut self.state, path),
            RuntimeEvent::StabilityChecked {
                path,
                generation,
                stability,
            } => handle_stability_checked(&mut self.state, path, generation, stability),
            RuntimeEvent::RelocationFinished { path, outcome } => {
                handle_relocation_finished(&mut self.state, &self.options, path, outcome)
            }
            RuntimeEvent::HeartbeatTick => handle_heartbeat(&mut self.state),
            RuntimeEvent::TimeoutElapsed => handle_timeout(&mut self.state),
            RuntimeEvent::ShutdownRequested => handle_shutdown(&mut self.state),
        }
    }
}
