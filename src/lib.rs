// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod header;
pub mod logging;
pub mod notice;
pub mod relocate;
pub mod types;
pub mod watch;

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_effective, ConfigFile};
use crate::engine::{
    spawn_lifecycle_timers, CoreRuntime, RealCandidateBackend, RunExit, Runtime, RuntimeEvent,
    RuntimeOptions,
};
use crate::fs::{FileSystem, RealFileSystem};
use crate::relocate::RelocationEngine;
use crate::watch::{spawn_event_source, StabilityDetector};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + env + flags)
/// - the real filesystem
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<RunExit> {
    let cfg = load_effective(&args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(RunExit::DryRun);
    }

    // Ctrl-C → graceful shutdown.
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Ctrl+C received; shutting down");
    };

    run_with(cfg, Arc::new(RealFileSystem), shutdown).await
}

/// Run one watcher lifecycle against `fs` until it reaches a terminal
/// state. `shutdown` resolving requests a clean stop.
///
/// This wires together:
/// - event source (notify or poll)
/// - stability detector / relocation engine backend
/// - heartbeat and global timeout
/// - outcome notification
pub async fn run_with<S>(cfg: ConfigFile, fs: Arc<dyn FileSystem>, shutdown: S) -> Result<RunExit>
where
    S: Future<Output = ()> + Send + 'static,
{
    let request = &cfg.watch;
    info!(
        source = ?request.source_dir,
        pattern = request.matcher.pattern(),
        strategy = ?request.strategy,
        mode = %request.mode,
        timeout = ?request.timeout,
        "starting watcher"
    );

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let detector = StabilityDetector::new(Arc::clone(&fs), request.quiet_period);
    let engine = RelocationEngine::new(Arc::clone(&fs), detector.clone(), cfg.retry);
    let backend = RealCandidateBackend::new(detector, engine, rt_tx.clone());
    let notifier = notice::from_command(cfg.notify_command.clone());

    // Handles stop their tasks when dropped at the end of this function.
    let _source = spawn_event_source(request, fs, rt_tx.clone())?;
    let _timers = spawn_lifecycle_timers(request.heartbeat, request.timeout, rt_tx.clone());

    let shutdown_task = tokio::spawn(async move {
        shutdown.await;
        let _ = rt_tx.send(RuntimeEvent::ShutdownRequested).await;
    });

    let core = CoreRuntime::new(RuntimeOptions { mode: request.mode });
    let runtime = Runtime::new(core, rt_rx, backend, notifier);
    let exit = runtime.run().await;

    shutdown_task.abort();
    debug!(?exit, "watcher lifecycle finished");
    Ok(exit?)
}

/// Simple dry-run output: the effective configuration.
fn print_dry_run(cfg: &ConfigFile) {
    let w = &cfg.watch;
    println!("routewatch dry-run");
    println!("  watch.source = {}", w.source_dir.display());
    if !w.source_dir.is_dir() {
        println!("      (does not exist yet; will wait for it)");
    }
    println!("  watch.pattern = {}", w.matcher.pattern());
    println!("  watch.strategy = {:?}", w.strategy);
    println!("  watch.poll_interval = {:?}", w.poll_interval);
    println!("  watch.quiet_period = {:?}", w.quiet_period);
    println!("  watch.timeout = {:?}", w.timeout);
    println!("  watch.heartbeat = {:?}", w.heartbeat);
    println!("  watch.mode = {}", w.mode);
    println!();
    println!("  relocate.max_attempts = {}", cfg.retry.max_attempts);
    println!("  relocate.initial_backoff = {:?}", cfg.retry.initial_backoff);
    println!("  relocate.max_backoff = {:?}", cfg.retry.max_backoff);
    if let Some(cmd) = &cfg.notify_command {
        println!("  notify.command = {cmd}");
    }

    debug!("dry-run complete (nothing watched)");
}
