// src/fs/mod.rs

//! Filesystem seam used by the event source, stability detector and
//! relocation engine.
//!
//! Everything returns plain `io::Result` so callers can classify failures by
//! [`io::ErrorKind`] (transient vs permanent) before deciding to retry.

use std::fmt::Debug;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub mod mock;

/// Subset of file metadata the watcher cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
    pub is_file: bool,
    pub modified: Option<SystemTime>,
}

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Open `path` for reading while refusing to share it with writers.
    ///
    /// Fails while another process still holds a write handle (on platforms
    /// that enforce share modes); the handle is closed immediately.
    fn probe_shared_read(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Create `dst` as a hard link to `src`. Fails with `AlreadyExists` if
    /// `dst` exists.
    fn hard_link(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Copy `src` into a newly created `dst`. Fails with `AlreadyExists` if
    /// `dst` exists; never truncates an existing file.
    fn copy_new(&self, src: &Path, dst: &Path) -> io::Result<u64>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = fs::metadata(path)?;
        Ok(FileStat {
            len: meta.len(),
            is_file: meta.is_file(),
            modified: meta.modified().ok(),
        })
    }

    #[cfg(windows)]
    fn probe_shared_read(&self, path: &Path) -> io::Result<()> {
        use std::os::windows::fs::OpenOptionsExt;

        // FILE_SHARE_READ only: the open fails with a sharing violation while
        // a browser or scanner still has the file open for writing.
        const FILE_SHARE_READ: u32 = 0x0000_0001;
        OpenOptions::new()
            .read(true)
            .share_mode(FILE_SHARE_READ)
            .open(path)
            .map(|_| ())
    }

    #[cfg(not(windows))]
    fn probe_shared_read(&self, path: &Path) -> io::Result<()> {
        // Unix has no mandatory share modes; a successful read open is the
        // best available signal.
        File::open(path).map(|_| ())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    fn hard_link(&self, src: &Path, dst: &Path) -> io::Result<()> {
        fs::hard_link(src, dst)
    }

    fn copy_new(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        let mut reader = File::open(src)?;
        let mut writer = OpenOptions::new().write(true).create_new(true).open(dst)?;

        let copied = io::copy(&mut reader, &mut writer).and_then(|n| {
            writer.sync_all()?;
            Ok(n)
        });

        if copied.is_err() {
            // Never leave a truncated copy behind.
            drop(writer);
            let _ = fs::remove_file(dst);
        }
        copied
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}
