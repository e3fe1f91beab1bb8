// src/engine/backend.rs

//! Pluggable candidate backend abstraction.
//!
//! The runtime talks to a `CandidateBackend` instead of calling the
//! stability detector and relocation engine directly. This makes it easy to
//! swap in a scripted backend in tests while keeping the production
//! implementation here.
//!
//! - `RealCandidateBackend` runs each request in its own Tokio task and
//!   reports the result back as a [`RuntimeEvent`].
//! - Tests can provide their own backend that, for example, records which
//!   paths were checked and immediately emits canned results.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::relocate::RelocationEngine;
use crate::watch::StabilityDetector;

/// Trait abstracting how candidates are checked and moved.
///
/// Implementations must eventually answer every request with the matching
/// `StabilityChecked` / `RelocationFinished` event.
pub trait CandidateBackend: Send {
    fn check_stability(
        &mut self,
        path: PathBuf,
        generation: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    fn relocate(&mut self, path: PathBuf) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real backend used in production.
///
/// In-flight work is owned by a `JoinSet`, so dropping the backend (when the
/// runtime exits) cancels pending checks and backoff sleeps.
#[derive(Debug)]
pub struct RealCandidateBackend {
    detector: StabilityDetector,
    engine: RelocationEngine,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    tasks: JoinSet<()>,
}

impl RealCandidateBackend {
    pub fn new(
        detector: StabilityDetector,
        engine: RelocationEngine,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            detector,
            engine,
            runtime_tx,
            tasks: JoinSet::new(),
        }
    }

    fn reap_finished(&mut self) {
        while self.tasks.try_join_next().is_some() {}
    }
}

impl CandidateBackend for RealCandidateBackend {
    fn check_stability(
        &mut self,
        path: PathBuf,
        generation: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.reap_finished();
        let detector = self.detector.clone();
        let tx = self.runtime_tx.clone();

        self.tasks.spawn(async move {
            let stability = detector.check(&path).await;
            debug!(?path, generation, %stability, "stability check finished");
            // Receiver is gone only once the runtime has stopped.
            let _ = tx
                .send(RuntimeEvent::StabilityChecked {
                    path,
                    generation,
                    stability,
                })
                .await;
        });

        Box::pin(async { Ok(()) })
    }

    fn relocate(&mut self, path: PathBuf) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.reap_finished();
        let engine = self.engine.clone();
        let tx = self.runtime_tx.clone();

        self.tasks.spawn(async move {
            let outcome = engine.process(&path).await;
            let _ = tx
                .send(RuntimeEvent::RelocationFinished { path, outcome })
                .await;
        });

        Box::pin(async { Ok(()) })
    }
}
