// tests/relocation_mock_fs.rs
//
// Relocation engine against the in-memory filesystem with fault injection.

mod common;
use crate::common::{with_timeout, RawConfigBuilder, RUN_LIMIT};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use routewatch::engine::RunExit;
use routewatch::fs::mock::MockFileSystem;
use routewatch::fs::FileSystem;
use routewatch::header::parse_header;
use routewatch::relocate::{RelocationEngine, RelocationOutcome, RetryPolicy};
use routewatch::run_with;
use routewatch::types::WatchStrategy;
use routewatch::watch::{Stability, StabilityDetector};

fn engine(fs: &MockFileSystem, max_attempts: u32) -> RelocationEngine {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    RelocationEngine::new(
        fs.clone(),
        StabilityDetector::new(fs, Duration::from_millis(100)),
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        },
    )
}

#[cfg(unix)]
#[tokio::test(start_paused = true)]
async fn locked_main_file_is_retried_then_moved() {
    let fs = MockFileSystem::new();
    fs.add_file("/dl/GPT_RESPONSE.md", "Target path: /out\n\nbody");
    // Two failed attempts (link + copy fallback each).
    fs.fail_moves("/dl/GPT_RESPONSE.md", io::ErrorKind::PermissionDenied, 4);

    let started = tokio::time::Instant::now();
    let outcome = engine(&fs, 6).process(Path::new("/dl/GPT_RESPONSE.md")).await;

    assert!(matches!(outcome, RelocationOutcome::Success { .. }));
    assert_eq!(fs.list("/out"), vec!["GPT_RESPONSE.md"]);
    // Backoff 500ms then 1s.
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(1500) && waited < Duration::from_secs(2));
}

#[cfg(unix)]
#[tokio::test(start_paused = true)]
async fn exhausted_retries_report_failure_and_keep_file() {
    let fs = MockFileSystem::new();
    fs.add_file("/dl/GPT_RESPONSE.md", "Target path: /out\n");
    fs.lock("/dl/GPT_RESPONSE.md");

    let outcome = engine(&fs, 4).process(Path::new("/dl/GPT_RESPONSE.md")).await;

    match outcome {
        RelocationOutcome::Failure {
            target, attempts, ..
        } => {
            assert_eq!(target, PathBuf::from("/out"));
            assert_eq!(attempts, 4);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(fs.contents("/dl/GPT_RESPONSE.md").is_some());
    assert!(fs.list("/out").is_empty());
}

#[cfg(unix)]
#[tokio::test(start_paused = true)]
async fn same_basename_from_two_sources_never_overwrites() {
    let fs = MockFileSystem::new();
    fs.add_file("/dl/one/GPT_RESPONSE.md", "Target path: /out\n\nfirst");
    fs.add_file("/dl/two/GPT_RESPONSE.md", "Target path: /out\n\nsecond");

    let engine = engine(&fs, 3);
    let first = engine.process(Path::new("/dl/one/GPT_RESPONSE.md")).await;
    let second = engine.process(Path::new("/dl/two/GPT_RESPONSE.md")).await;

    assert!(first.is_success() && second.is_success());
    assert_eq!(fs.list("/out"), vec!["GPT_RESPONSE.md", "GPT_RESPONSE_1.md"]);
    assert!(String::from_utf8(fs.contents("/out/GPT_RESPONSE.md").unwrap())
        .unwrap()
        .ends_with("first"));
    assert!(String::from_utf8(fs.contents("/out/GPT_RESPONSE_1.md").unwrap())
        .unwrap()
        .ends_with("second"));
}

#[cfg(unix)]
#[tokio::test(start_paused = true)]
async fn ensuring_the_target_twice_keeps_content() {
    let fs = MockFileSystem::new();
    fs.add_file("/out/existing.txt", "keep me");
    let engine = engine(&fs, 3);

    engine.ensure_target_dir(Path::new("/out")).unwrap();
    engine.ensure_target_dir(Path::new("/out")).unwrap();

    assert_eq!(fs.list("/out"), vec!["existing.txt"]);
    assert_eq!(fs.contents("/out/existing.txt").unwrap(), b"keep me");
}

#[cfg(unix)]
#[tokio::test(start_paused = true)]
async fn companions_cross_volume_and_traversal_guard() {
    let fs = MockFileSystem::new();
    fs.disable_hard_links();
    fs.add_file(
        "/dl/GPT_RESPONSE.md",
        "Target path: /vault/notes\nFiles: ../secret, diagram.png\n",
    );
    fs.add_file("/dl/diagram.png", vec![0u8, 1, 2, 3]);
    fs.add_file("/secret", "do not move");

    let header = parse_header(&String::from_utf8(fs.contents("/dl/GPT_RESPONSE.md").unwrap()).unwrap())
        .unwrap();
    assert_eq!(header.companions, vec!["diagram.png"]);

    let outcome = engine(&fs, 3)
        .relocate(Path::new("/dl/GPT_RESPONSE.md"), &header)
        .await;

    assert!(matches!(outcome, RelocationOutcome::Success { ref moved } if moved.len() == 2));
    assert_eq!(fs.list("/vault/notes"), vec!["GPT_RESPONSE.md", "diagram.png"]);
    assert_eq!(fs.contents("/secret").unwrap(), b"do not move");
    assert!(fs.list("/dl").is_empty());
}

#[tokio::test(start_paused = true)]
async fn stability_gate_tracks_a_growing_download() {
    let fs = MockFileSystem::new();
    fs.add_file("/dl/GPT_RESPONSE.md", "Target");
    let detector = StabilityDetector::new(Arc::new(fs.clone()), Duration::from_millis(600));

    let writer = {
        let fs = fs.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            fs.append("/dl/GPT_RESPONSE.md", b" path: /out\n");
        })
    };
    let during = detector.check(Path::new("/dl/GPT_RESPONSE.md")).await;
    writer.await.unwrap();
    assert!(matches!(during, Stability::Growing { .. }));

    let after = detector.check(Path::new("/dl/GPT_RESPONSE.md")).await;
    assert_eq!(after, Stability::Stable { len: 18 });
}

#[cfg(unix)]
#[tokio::test(start_paused = true)]
async fn timeout_while_waiting_on_a_companion_reports_the_relocation() {
    let fs = MockFileSystem::new();
    fs.add_file("/dl/GPT_RESPONSE.md", "Target path: /out\nFiles: c.txt\n\nbody");
    fs.add_file("/dl/c.txt", "still being written");
    fs.lock("/dl/c.txt");

    // The companion wait (8 checks of 100ms plus backoff) outlasts the timeout.
    let cfg = RawConfigBuilder::new("/dl")
        .strategy(WatchStrategy::Poll)
        .max_attempts(8)
        .timeout(Duration::from_millis(500))
        .build();
    let exit = with_timeout(
        RUN_LIMIT,
        run_with(cfg, Arc::new(fs.clone()), std::future::pending()),
    )
    .await
    .unwrap();

    assert_eq!(exit, RunExit::Relocated);
    assert_eq!(exit.exit_code(), 0);
    assert_eq!(fs.list("/out"), vec!["GPT_RESPONSE.md"]);
    assert_eq!(fs.list("/dl"), vec!["c.txt"]);
}
