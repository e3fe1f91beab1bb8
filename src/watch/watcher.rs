// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::watch::patterns::{scan_dir, FileMatcher};

/// Spawn a native (non-recursive) watcher on `dir`.
///
/// The returned task keeps the `RecommendedWatcher` alive. It:
/// - retries establishing the watch every `retry_interval` until `dir`
///   exists,
/// - then reports files that were already present (startup scan),
/// - then forwards create/modify events for matching direct children as
///   [`RuntimeEvent::CandidateSeen`].
///
/// If `dir` disappears the watch is dropped and the cycle starts over, so a
/// recreated directory is watched (and rescanned) again.
pub fn spawn_notify_source(
    dir: PathBuf,
    matcher: FileMatcher,
    retry_interval: Duration,
    fs: Arc<dyn FileSystem>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<JoinHandle<()>> {
    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // Receiver is gone only once the runtime has stopped.
            let _ = event_tx.send(res);
        },
        Config::default(),
    )?;

    let task = tokio::spawn(async move {
        loop {
            establish_watch(&mut watcher, &dir, retry_interval).await;
            info!("file watcher started on {:?}", dir);

            if !report_existing(fs.as_ref(), &dir, &matcher, &runtime_tx).await {
                return;
            }

            let end = forward_events(
                &mut event_rx,
                &dir,
                &matcher,
                retry_interval,
                fs.as_ref(),
                &runtime_tx,
            )
            .await;
            match end {
                EventLoopEnd::SourceLost => {
                    warn!(?dir, "source directory disappeared; waiting for it to come back");
                    let _ = watcher.unwatch(&dir);
                }
                EventLoopEnd::Closed => break,
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(task)
}

enum EventLoopEnd {
    SourceLost,
    Closed,
}

async fn establish_watch(watcher: &mut RecommendedWatcher, dir: &Path, retry_interval: Duration) {
    let mut waiting_logged = false;
    loop {
        match watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => return,
            Err(err) => {
                if !waiting_logged {
                    info!(?dir, error = %err, "source directory not available yet; retrying");
                    waiting_logged = true;
                } else {
                    debug!(?dir, error = %err, "watch still not established");
                }
                tokio::time::sleep(retry_interval).await;
            }
        }
    }
}

/// Send every matching file already in `dir`. False once the runtime is gone.
async fn report_existing(
    fs: &dyn FileSystem,
    dir: &Path,
    matcher: &FileMatcher,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    match scan_dir(fs, dir, matcher) {
        Ok(existing) => {
            for path in existing {
                debug!(?path, "found existing candidate");
                if runtime_tx
                    .send(RuntimeEvent::CandidateSeen { path })
                    .await
                    .is_err()
                {
                    return false;
                }
            }
        }
        Err(err) => warn!(?dir, error = %err, "scan of source directory failed"),
    }
    true
}

async fn forward_events(
    event_rx: &mut mpsc::UnboundedReceiver<notify::Result<Event>>,
    dir: &Path,
    matcher: &FileMatcher,
    retry_interval: Duration,
    fs: &dyn FileSystem,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> EventLoopEnd {
    // Not every backend reports the loss of the watched directory itself.
    let mut liveness = tokio::time::interval(retry_interval);
    liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let event = tokio::select! {
            received = event_rx.recv() => match received {
                Some(Ok(event)) => event,
                Some(Err(err)) => {
                    warn!(?dir, error = %err, "file watch error");
                    if !fs.is_dir(dir) {
                        return EventLoopEnd::SourceLost;
                    }
                    continue;
                }
                None => return EventLoopEnd::Closed,
            },
            _ = liveness.tick() => {
                if !fs.is_dir(dir) {
                    return EventLoopEnd::SourceLost;
                }
                continue;
            }
        };

        if source_dir_lost(&event, dir, fs) {
            return EventLoopEnd::SourceLost;
        }
        if !is_content_event(&event.kind) {
            continue;
        }
        debug!(?event, "received notify event");

        for path in event.paths {
            if !matcher.matches_path(dir, &path) {
                continue;
            }
            if runtime_tx
                .send(RuntimeEvent::CandidateSeen { path })
                .await
                .is_err()
            {
                debug!("runtime channel closed; stopping watcher");
                return EventLoopEnd::Closed;
            }
        }
    }
}

/// A removal, or any event naming `dir` itself, after which `dir` is gone.
fn source_dir_lost(event: &Event, dir: &Path, fs: &dyn FileSystem) -> bool {
    let suspicious =
        matches!(event.kind, EventKind::Remove(_)) || event.paths.iter().any(|p| p == dir);
    suspicious && !fs.is_dir(dir)
}

/// Creations, writes and renames-into; removals and access events are noise.
fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    )
}
