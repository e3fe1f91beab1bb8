// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::Result;
use crate::notice::{Notice, Notifier};

use super::backend::CandidateBackend;
use super::core::CoreRuntime;
use super::{CoreCommand, RunExit, RuntimeEvent};

/// Drives the lifecycle state machine in response to `RuntimeEvent`s, and
/// delegates stability checks and relocations to a `CandidateBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<B: CandidateBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: B,
    notifier: Arc<dyn Notifier>,
    started_at: Instant,
}

impl<B: CandidateBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

impl<B: CandidateBackend> Runtime<B> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        backend: B,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            core,
            event_rx,
            backend,
            notifier,
            started_at: Instant::now(),
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (check, relocate, announce,
    ///   exit).
    pub async fn run(mut self) -> Result<RunExit> {
        self.core.start();
        let mut phase = self.core.phase();
        info!(%phase, "routewatch runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            let next = self.core.phase();
            if next != phase {
                debug!(from = %phase, to = %next, "phase changed");
                phase = next;
            }

            if !step.keep_running {
                break;
            }
        }

        let exit = self.core.exit().unwrap_or(RunExit::Shutdown);
        info!(%exit, relocations = self.core.state().relocations(), "runtime exiting");
        Ok(exit)
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::CheckStability { path, generation } => {
                debug!(?path, generation, "checking stability");
                self.backend.check_stability(path, generation).await?;
            }
            CoreCommand::Relocate { path } => {
                info!(?path, "candidate is stable; relocating");
                self.backend.relocate(path).await?;
            }
            CoreCommand::Announce { path, outcome } => {
                let notice = Notice::new(&path, outcome);
                self.notifier.notify(&notice).await;
            }
            CoreCommand::Heartbeat {
                phase,
                pending,
                relocations,
            } => {
                info!(
                    %phase,
                    pending,
                    relocations,
                    uptime_secs = self.started_at.elapsed().as_secs(),
                    "still watching"
                );
            }
            CoreCommand::RequestExit(exit) => {
                info!(%exit, "core requested exit");
            }
        }
        Ok(())
    }
}

/// Heartbeat and global-timeout tasks. Dropping the handle stops both.
#[derive(Debug)]
pub struct LifecycleTimers {
    heartbeat: JoinHandle<()>,
    timeout: JoinHandle<()>,
}

impl Drop for LifecycleTimers {
    fn drop(&mut self) {
        self.heartbeat.abort();
        self.timeout.abort();
    }
}

/// Spawn the heartbeat ticker (first tick after one full interval) and the
/// one-off global timeout.
pub fn spawn_lifecycle_timers(
    heartbeat: Duration,
    timeout: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> LifecycleTimers {
    let heartbeat_tx = runtime_tx.clone();
    let heartbeat = tokio::spawn(async move {
        let start = tokio::time::Instant::now() + heartbeat;
        let mut ticker = tokio::time::interval_at(start, heartbeat);
        loop {
            ticker.tick().await;
            if heartbeat_tx.send(RuntimeEvent::HeartbeatTick).await.is_err() {
                return;
            }
        }
    });

    let timeout = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let _ = runtime_tx.send(RuntimeEvent::TimeoutElapsed).await;
    });

    LifecycleTimers { heartbeat, timeout }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timers_fire_heartbeat_before_timeout() {
        let (tx, mut rx) = mpsc::channel(8);
        let _timers =
            spawn_lifecycle_timers(Duration::from_secs(60), Duration::from_secs(150), tx);

        assert!(matches!(rx.recv().await, Some(RuntimeEvent::HeartbeatTick)));
        assert!(matches!(rx.recv().await, Some(RuntimeEvent::HeartbeatTick)));
        assert!(matches!(rx.recv().await, Some(RuntimeEvent::TimeoutElapsed)));
    }
}
