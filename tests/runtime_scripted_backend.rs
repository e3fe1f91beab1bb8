// tests/runtime_scripted_backend.rs

mod common;
use crate::common::{init_tracing, BackendCall, RecordingNotifier, ScriptedBackend};

use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use routewatch::engine::{CoreRuntime, RunExit, Runtime, RuntimeEvent, RuntimeOptions};
use routewatch::relocate::RelocationOutcome;
use routewatch::types::RunMode;
use routewatch::watch::Stability;

type TestResult = Result<(), Box<dyn Error>>;

fn seen(path: &str) -> RuntimeEvent {
    RuntimeEvent::CandidateSeen {
        path: PathBuf::from(path),
    }
}

#[tokio::test]
async fn one_shot_relocates_first_candidate_and_exits() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let calls = Arc::new(Mutex::new(Vec::new()));
    let backend = ScriptedBackend::new(rt_tx.clone(), calls.clone());
    let notifier = RecordingNotifier::new();

    rt_tx.send(seen("/dl/GPT_RESPONSE.md")).await?;

    let core = CoreRuntime::new(RuntimeOptions {
        mode: RunMode::OneShot,
    });
    let runtime = Runtime::new(core, rt_rx, backend, Arc::new(notifier.clone()));

    // Enforce an upper bound on how long this test may run.
    let exit = timeout(Duration::from_secs(3), runtime.run())
        .await
        .expect("runtime did not finish within 3 seconds")?;

    assert_eq!(exit, RunExit::Relocated);
    assert_eq!(
        calls.lock().unwrap().clone(),
        vec![
            BackendCall::Check(PathBuf::from("/dl/GPT_RESPONSE.md")),
            BackendCall::Relocate(PathBuf::from("/dl/GPT_RESPONSE.md")),
        ]
    );
    assert_eq!(notifier.labels(), vec!["success"]);
    assert_eq!(
        notifier.notices()[0].target,
        Some(PathBuf::from("/out"))
    );
    Ok(())
}

#[tokio::test]
async fn skipped_candidate_keeps_watching_until_a_good_one() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let calls = Arc::new(Mutex::new(Vec::new()));
    let backend = ScriptedBackend::new(rt_tx.clone(), calls.clone()).with_outcome(|path| {
        if path.ends_with("bad.md") {
            RelocationOutcome::Skipped {
                reason: "parse error".into(),
            }
        } else {
            routewatch_test_utils::fakes::moved_to_out(path)
        }
    });
    let notifier = RecordingNotifier::new();

    rt_tx.send(seen("/dl/bad.md")).await?;
    rt_tx.send(seen("/dl/good.md")).await?;

    let core = CoreRuntime::new(RuntimeOptions {
        mode: RunMode::OneShot,
    });
    let runtime = Runtime::new(core, rt_rx, backend, Arc::new(notifier.clone()));
    let exit = timeout(Duration::from_secs(3), runtime.run())
        .await
        .expect("runtime did not finish within 3 seconds")?;

    assert_eq!(exit, RunExit::Relocated);
    assert_eq!(notifier.labels(), vec!["skipped", "success"]);
    Ok(())
}

#[tokio::test]
async fn vanished_candidate_is_never_relocated() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let calls = Arc::new(Mutex::new(Vec::new()));
    let backend = ScriptedBackend::new(rt_tx.clone(), calls.clone())
        .with_stability(|_| Stability::Vanished);
    let notifier = RecordingNotifier::new();

    rt_tx.send(seen("/dl/GPT_RESPONSE.md")).await?;
    rt_tx.send(RuntimeEvent::TimeoutElapsed).await?;

    let core = CoreRuntime::new(RuntimeOptions {
        mode: RunMode::OneShot,
    });
    let runtime = Runtime::new(core, rt_rx, backend, Arc::new(notifier.clone()));
    let exit = timeout(Duration::from_secs(3), runtime.run())
        .await
        .expect("runtime did not finish within 3 seconds")?;

    assert_eq!(exit, RunExit::TimedOut);
    assert!(
        !calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, BackendCall::Relocate(_)))
    );
    assert!(notifier.notices().is_empty());
    Ok(())
}

#[tokio::test]
async fn continuous_mode_relocates_everything_until_shutdown() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let calls = Arc::new(Mutex::new(Vec::new()));
    let backend = ScriptedBackend::new(rt_tx.clone(), calls.clone());
    let notifier = RecordingNotifier::new();

    let core = CoreRuntime::new(RuntimeOptions {
        mode: RunMode::Continuous,
    });
    let runtime = Runtime::new(core, rt_rx, backend, Arc::new(notifier.clone()));
    let handle = tokio::spawn(runtime.run());

    rt_tx.send(seen("/dl/one.md")).await?;
    rt_tx.send(seen("/dl/two.md")).await?;

    // Wait until both were announced, then stop.
    timeout(Duration::from_secs(3), async {
        while notifier.notices().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let exit = timeout(Duration::from_secs(3), handle).await???;
    assert_eq!(exit, RunExit::Shutdown);
    assert_eq!(notifier.labels(), vec!["success", "success"]);
    Ok(())
}
