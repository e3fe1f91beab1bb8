// src/watch/patterns.rs

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use crate::fs::FileSystem;

/// Compiled response-file pattern: an exact file name or a glob such as
/// `GPT_RESPONSE*.md`, matched against bare file names only.
#[derive(Clone)]
pub struct FileMatcher {
    pattern: String,
    glob: GlobMatcher,
}

impl fmt::Debug for FileMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMatcher")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

impl FileMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pattern}"))?
            .compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            glob,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if a bare file name (e.g. `"GPT_RESPONSE.md"`) matches.
    pub fn matches_name(&self, name: &str) -> bool {
        self.glob.is_match(name)
    }

    /// Returns true if `path` is a direct child of `dir` whose name matches.
    ///
    /// Subdirectories are never considered: watching is non-recursive.
    pub fn matches_path(&self, dir: &Path, path: &Path) -> bool {
        direct_child_name(dir, path).is_some_and(|name| self.matches_name(&name))
    }
}

/// File name of `path` if it sits directly inside `dir`.
///
/// - First we compare the parent with `dir` directly.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both directories and try again.
///
/// Returns `None` if the path cannot be related to `dir` or is nested deeper.
pub fn direct_child_name(dir: &Path, path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    let parent = path.parent()?;

    if parent == dir {
        return Some(name);
    }

    // More robust path: canonicalize both, then try again. This helps on
    // platforms (notably macOS) where different absolute prefixes may be used
    // for the same underlying directory (e.g. symlinks, /private/var/...).
    if let (Ok(dir_canon), Ok(parent_canon)) = (dir.canonicalize(), parent.canonicalize()) {
        if dir_canon == parent_canon {
            return Some(name);
        }
    }

    None
}

/// List the files directly inside `dir` that match, sorted by path.
pub fn scan_dir(fs: &dyn FileSystem, dir: &Path, matcher: &FileMatcher) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs
        .read_dir(dir)?
        .into_iter()
        .filter(|path| fs.is_file(path))
        .filter(|path| {
            path.file_name()
                .is_some_and(|n| matcher.matches_name(&n.to_string_lossy()))
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn exact_name_and_glob() {
        let exact = FileMatcher::new("GPT_RESPONSE.md").unwrap();
        assert!(exact.matches_name("GPT_RESPONSE.md"));
        assert!(!exact.matches_name("GPT_RESPONSE.md.part"));
        assert!(!exact.matches_name("gpt_response.md"));

        let glob = FileMatcher::new("GPT_RESPONSE*.md").unwrap();
        assert!(glob.matches_name("GPT_RESPONSE (1).md"));
        assert!(!glob.matches_name("GPT_RESPONSE.txt"));
    }

    #[test]
    fn invalid_glob_is_an_error() {
        assert!(FileMatcher::new("GPT_[RESPONSE.md").is_err());
    }

    #[test]
    fn only_direct_children_match() {
        let m = FileMatcher::new("*.md").unwrap();
        let dir = Path::new("/downloads");
        assert!(m.matches_path(dir, Path::new("/downloads/a.md")));
        assert!(!m.matches_path(dir, Path::new("/downloads/nested/a.md")));
        assert!(!m.matches_path(dir, Path::new("/elsewhere/a.md")));
    }

    #[test]
    fn scan_lists_matching_files_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/downloads/GPT_RESPONSE.md", "x");
        fs.add_file("/downloads/other.md", "x");
        fs.add_file("/downloads/GPT_RESPONSE.md.d/GPT_RESPONSE.md", "x");

        let m = FileMatcher::new("GPT_RESPONSE.md").unwrap();
        let found = scan_dir(&fs, Path::new("/downloads"), &m).unwrap();
        assert_eq!(found, vec![PathBuf::from("/downloads/GPT_RESPONSE.md")]);
    }
}
