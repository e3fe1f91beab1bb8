use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use routewatch::engine::{CandidateBackend, RuntimeEvent};
use routewatch::errors::Result;
use routewatch::notice::{Notice, Notifier};
use routewatch::relocate::{MovedFile, RelocationOutcome};
use routewatch::watch::Stability;

/// What the runtime asked a [`ScriptedBackend`] to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Check(PathBuf),
    Relocate(PathBuf),
}

type StabilityScript = Box<dyn FnMut(&Path) -> Stability + Send>;
type OutcomeScript = Box<dyn FnMut(&Path) -> RelocationOutcome + Send>;

/// A fake backend that:
/// - records which paths were checked / relocated
/// - immediately answers with scripted results (stable, and a successful
///   move into `/out` unless told otherwise).
pub struct ScriptedBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    calls: Arc<Mutex<Vec<BackendCall>>>,
    stability: StabilityScript,
    outcome: OutcomeScript,
}

impl ScriptedBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, calls: Arc<Mutex<Vec<BackendCall>>>) -> Self {
        Self {
            runtime_tx,
            calls,
            stability: Box::new(|_| Stability::Stable { len: 1 }),
            outcome: Box::new(moved_to_out),
        }
    }

    pub fn with_stability(mut self, f: impl FnMut(&Path) -> Stability + Send + 'static) -> Self {
        self.stability = Box::new(f);
        self
    }

    pub fn with_outcome(
        mut self,
        f: impl FnMut(&Path) -> RelocationOutcome + Send + 'static,
    ) -> Self {
        self.outcome = Box::new(f);
        self
    }
}

/// Default scripted outcome: `path` moved into `/out`.
pub fn moved_to_out(path: &Path) -> RelocationOutcome {
    let name = path.file_name().map(PathBuf::from).unwrap_or_default();
    RelocationOutcome::Success {
        moved: vec![MovedFile {
            source: path.to_path_buf(),
            destination: Path::new("/out").join(name),
        }],
    }
}

impl CandidateBackend for ScriptedBackend {
    fn check_stability(
        &mut self,
        path: PathBuf,
        generation: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.calls
            .lock()
            .unwrap()
            .push(BackendCall::Check(path.clone()));
        let stability = (self.stability)(&path);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            tx.send(RuntimeEvent::StabilityChecked {
                path,
                generation,
                stability,
            })
            .await
            .map_err(anyhow::Error::from)?;
            Ok(())
        })
    }

    fn relocate(&mut self, path: PathBuf) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.calls
            .lock()
            .unwrap()
            .push(BackendCall::Relocate(path.clone()));
        let outcome = (self.outcome)(&path);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            tx.send(RuntimeEvent::RelocationFinished { path, outcome })
                .await
                .map_err(anyhow::Error::from)?;
            Ok(())
        })
    }
}

/// Notifier that keeps every notice for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.outcome.label())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify<'a>(&'a self, notice: &'a Notice) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        self.notices.lock().unwrap().push(notice.clone());
        Box::pin(async {})
    }
}
