// src/watch/mod.rs

//! Candidate discovery.
//!
//! This module is responsible for:
//! - Matching bare file names against the configured pattern.
//! - Turning directory changes into [`RuntimeEvent::CandidateSeen`], either
//!   through native notifications (`notify`) or by polling.
//! - Deciding when a candidate has finished being written.
//!
//! It does **not** read file content or move anything.

pub mod patterns;
pub mod poller;
pub mod stability;
pub mod watcher;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::WatchRequest;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::WatchStrategy;

pub use patterns::{direct_child_name, scan_dir, FileMatcher};
pub use poller::{poll_once, spawn_poller, Fingerprint};
pub use stability::{Stability, StabilityDetector};
pub use watcher::spawn_notify_source;

/// Handle for the running event source.
///
/// Dropping this handle stops watching.
#[derive(Debug)]
pub struct EventSourceHandle {
    task: JoinHandle<()>,
}

impl Drop for EventSourceHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start the event source selected by `request.strategy`.
pub fn spawn_event_source(
    request: &WatchRequest,
    fs: Arc<dyn FileSystem>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<EventSourceHandle> {
    let dir = request.source_dir.clone();
    let matcher = request.matcher.clone();

    let task = match request.strategy {
        WatchStrategy::Notify => {
            spawn_notify_source(dir, matcher, request.poll_interval, fs, runtime_tx)?
        }
        WatchStrategy::Poll => spawn_poller(dir, matcher, request.poll_interval, fs, runtime_tx),
    };

    Ok(EventSourceHandle { task })
}
