#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use routewatch_test_utils::builders::RawConfigBuilder;
pub use routewatch_test_utils::fakes::{BackendCall, RecordingNotifier, ScriptedBackend};
pub use routewatch_test_utils::{init_tracing, with_timeout, write_response};

/// Upper bound for a whole watcher run inside a test.
pub const RUN_LIMIT: Duration = Duration::from_secs(20);

/// `<tmp>/downloads` and `<tmp>/out`, the first one created.
pub fn downloads_and_out(root: &Path) -> (PathBuf, PathBuf) {
    let downloads = root.join("downloads");
    std::fs::create_dir_all(&downloads).expect("creating downloads dir");
    (downloads, root.join("out"))
}

/// Sorted file names in `dir` (empty if it does not exist).
pub fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Shell command that records `$ROUTEWATCH_OUTCOME` lines into `log`.
#[cfg(unix)]
pub fn outcome_recorder(log: &Path) -> String {
    format!("echo \"$ROUTEWATCH_OUTCOME\" >> '{}'", log.display())
}
