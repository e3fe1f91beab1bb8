// src/relocate/naming.rs

use std::path::Path;

/// Upper bound on `_<n>` suffixes tried before giving up on a destination.
pub const MAX_COLLISION_SUFFIX: u32 = 9_999;

/// Destination file name for the `n`-th placement attempt.
///
/// `0` keeps the original name; otherwise the counter goes before the
/// extension: `GPT_RESPONSE.md` -> `GPT_RESPONSE_2.md`, `notes` -> `notes_2`.
pub fn candidate_name(original: &str, n: u32) -> String {
    if n == 0 {
        return original.to_string();
    }

    let path = Path::new(original);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| original.into());

    match path.extension() {
        Some(ext) => format!("{stem}_{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{n}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_keeps_original() {
        assert_eq!(candidate_name("GPT_RESPONSE.md", 0), "GPT_RESPONSE.md");
    }

    #[test]
    fn counter_goes_before_last_extension() {
        assert_eq!(candidate_name("GPT_RESPONSE.md", 1), "GPT_RESPONSE_1.md");
        assert_eq!(candidate_name("archive.tar.gz", 3), "archive.tar_3.gz");
        assert_eq!(candidate_name("notes", 2), "notes_2");
        assert_eq!(candidate_name(".env", 1), ".env_1");
    }
}
