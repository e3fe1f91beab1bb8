// src/fs/mock.rs

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use super::{FileStat, FileSystem};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, version: u64 },
    Dir(Vec<String>), // List of child names
}

#[derive(Debug)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Errors to return from the next link/copy of a given source path.
    move_failures: HashMap<PathBuf, VecDeque<io::ErrorKind>>,
    /// Paths that behave as if another process holds a write handle.
    locked: HashSet<PathBuf>,
    /// Sources deleted by another process right after being linked.
    vanish_after_link: HashSet<PathBuf>,
    hard_links_supported: bool,
    /// Bumped on every write; doubles as the fake mtime.
    clock: u64,
}

/// In-memory filesystem with fault injection, for tests.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Ensure root exists
        entries.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            state: Arc::new(Mutex::new(MockState {
                entries,
                move_failures: HashMap::new(),
                locked: HashSet::new(),
                vanish_after_link: HashSet::new(),
                hard_links_supported: true,
                clock: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock filesystem lock poisoned")
    }

    /// Create or replace a file, creating parent directories implicitly.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut state = self.state();
        insert_file(&mut state, path.as_ref(), content.into());
    }

    /// Append bytes to an existing file (or create it), as a slow download would.
    pub fn append(&self, path: impl AsRef<Path>, bytes: &[u8]) {
        let path = path.as_ref();
        let mut state = self.state();
        let mut content = match state.entries.get(path) {
            Some(MockEntry::File { content, .. }) => content.clone(),
            _ => Vec::new(),
        };
        content.extend_from_slice(bytes);
        insert_file(&mut state, path, content);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.state();
        ensure_dir_entry(&mut state.entries, path.as_ref());
    }

    /// Contents of a file, if it exists.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.state().entries.get(path.as_ref()) {
            Some(MockEntry::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }

    /// Sorted child names of a directory (empty if it does not exist).
    pub fn list(&self, dir: impl AsRef<Path>) -> Vec<String> {
        match self.state().entries.get(dir.as_ref()) {
            Some(MockEntry::Dir(children)) => {
                let mut names = children.clone();
                names.sort();
                names
            }
            _ => Vec::new(),
        }
    }

    /// Make the next `count` link/copy attempts from `src` fail with `kind`.
    pub fn fail_moves(&self, src: impl AsRef<Path>, kind: io::ErrorKind, count: usize) {
        let mut state = self.state();
        state
            .move_failures
            .entry(src.as_ref().to_path_buf())
            .or_default()
            .extend(std::iter::repeat_n(kind, count));
    }

    /// Simulate another process holding `path` open for writing.
    pub fn lock(&self, path: impl AsRef<Path>) {
        self.state().locked.insert(path.as_ref().to_path_buf());
    }

    pub fn unlock(&self, path: impl AsRef<Path>) {
        self.state().locked.remove(path.as_ref());
    }

    /// Delete `src` as soon as the next hard link from it succeeds, as if
    /// another process removed it between the link and the unlink.
    pub fn vanish_after_link(&self, src: impl AsRef<Path>) {
        self.state()
            .vanish_after_link
            .insert(src.as_ref().to_path_buf());
    }

    /// Behave like a filesystem (or volume pair) without hard links.
    pub fn disable_hard_links(&self) {
        self.state().hard_links_supported = false;
    }
}

fn parent_key(path: &Path) -> Option<&Path> {
    path.parent().map(|parent| {
        if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        }
    })
}

fn insert_file(state: &mut MockState, path: &Path, content: Vec<u8>) {
    state.clock += 1;
    let version = state.clock;
    state
        .entries
        .insert(path.to_path_buf(), MockEntry::File { content, version });

    // Ensure parent directories exist implicitly for simplicity in this mock
    if let Some(parent) = parent_key(path) {
        ensure_dir_entry(&mut state.entries, parent);
        link_child(&mut state.entries, parent, path);
    }
}

fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    if let Some(parent) = parent_key(path) {
        if parent != path {
            // Avoid infinite loop at root
            ensure_dir_entry(entries, parent);
            link_child(entries, parent, path);
        }
    }
}

fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

fn unlink_child(entries: &mut HashMap<PathBuf, MockEntry>, child: &Path) {
    let Some(parent) = parent_key(child) else {
        return;
    };
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            children.retain(|c| c != name);
        }
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{:?} not found", path))
}

/// Shared preconditions of `hard_link` and `copy_new`.
fn prepare_move(state: &mut MockState, src: &Path, dst: &Path) -> io::Result<Vec<u8>> {
    if let Some(kind) = state
        .move_failures
        .get_mut(src)
        .and_then(|queue| queue.pop_front())
    {
        return Err(io::Error::new(kind, format!("injected failure for {:?}", src)));
    }

    let content = match state.entries.get(src) {
        Some(MockEntry::File { content, .. }) => content.clone(),
        _ => return Err(not_found(src)),
    };

    match parent_key(dst).and_then(|p| state.entries.get(p)) {
        Some(MockEntry::Dir(_)) => {}
        _ => return Err(not_found(dst)),
    }

    if state.entries.contains_key(dst) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{:?} already exists", dst),
        ));
    }

    Ok(content)
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self.state().entries.get(path) {
            Some(MockEntry::File { content, .. }) => String::from_utf8(content.clone())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Some(MockEntry::Dir(_)) => Err(io::Error::other(format!(
                "Is a directory: {:?}",
                path
            ))),
            None => Err(not_found(path)),
        }
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        match self.state().entries.get(path) {
            Some(MockEntry::File { content, version }) => Ok(FileStat {
                len: content.len() as u64,
                is_file: true,
                modified: Some(SystemTime::UNIX_EPOCH + Duration::from_nanos(*version)),
            }),
            Some(MockEntry::Dir(_)) => Ok(FileStat {
                len: 0,
                is_file: false,
                modified: None,
            }),
            None => Err(not_found(path)),
        }
    }

    fn probe_shared_read(&self, path: &Path) -> io::Result<()> {
        let state = self.state();
        if state.locked.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{:?} is open for writing", path),
            ));
        }
        match state.entries.get(path) {
            Some(MockEntry::File { .. }) => Ok(()),
            _ => Err(not_found(path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.state().entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.state().entries.get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.state().entries.get(path), Some(MockEntry::Dir(_)))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state();
        let blocked = path
            .ancestors()
            .any(|a| matches!(state.entries.get(a), Some(MockEntry::File { .. })));
        if blocked {
            return Err(io::Error::other(format!(
                "a file is in the way of {:?}",
                path
            )));
        }
        ensure_dir_entry(&mut state.entries, path);
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        match self.state().entries.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(not_found(path)),
        }
    }

    fn hard_link(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let mut state = self.state();
        let content = prepare_move(&mut state, src, dst)?;
        if !state.hard_links_supported {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "hard links are not supported",
            ));
        }
        insert_file(&mut state, dst, content);
        if state.vanish_after_link.remove(src) {
            state.entries.remove(src);
            unlink_child(&mut state.entries, src);
        }
        Ok(())
    }

    fn copy_new(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        let mut state = self.state();
        let content = prepare_move(&mut state, src, dst)?;
        let len = content.len() as u64;
        insert_file(&mut state, dst, content);
        Ok(len)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state();
        if state.locked.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{:?} is in use", path),
            ));
        }
        match state.entries.get(path) {
            Some(MockEntry::File { .. }) => {
                state.entries.remove(path);
                unlink_child(&mut state.entries, path);
                Ok(())
            }
            Some(MockEntry::Dir(_)) => Err(io::Error::other(format!(
                "Is a directory: {:?}",
                path
            ))),
            None => Err(not_found(path)),
        }
    }
}
