pub mod builders;
pub mod fakes;

use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a timeout, failing the test instead of hanging.
pub async fn with_timeout<F, T>(limit: Duration, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(limit, f)
        .await
        .unwrap_or_else(|_| panic!("Test timed out after {limit:?}"))
}

/// Write a response file whose first line declares `target`.
pub fn write_response(dir: &Path, name: &str, target: &Path, companions: &[&str]) -> PathBuf {
    let mut content = format!("Target path: {}\n", target.display());
    if !companions.is_empty() {
        content.push_str(&format!("Files: {}\n", companions.join(", ")));
    }
    content.push_str("\nhello\n");

    let path = dir.join(name);
    std::fs::write(&path, content).expect("writing response file");
    path
}
