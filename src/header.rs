// src/header.rs

//! Response header parsing.
//!
//! Canonical format (anything else is a [`HeaderError`]):
//!
//! ```text
//! Target path: <absolute directory path>
//! Files: <comma-separated bare filenames>      (optional, next line)
//!
//! <free-form body, ignored>
//! ```
//!
//! The `Target path:` declaration must be the first non-blank line; the
//! label is case-sensitive. `Files:` is only recognised on the line directly
//! after it. A leading UTF-8 BOM and CRLF line endings are tolerated.
//!
//! Parsing is pure and is redone on every attempt, since content may change
//! while a download settles.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

pub const TARGET_LABEL: &str = "Target path:";
pub const FILES_LABEL: &str = "Files:";

/// Relocation instructions parsed from a response file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Absolute destination directory.
    pub target_dir: PathBuf,
    /// Bare companion file names, in declaration order.
    pub companions: Vec<String>,
    /// Declared companions that were dropped by the traversal guard.
    pub rejected: Vec<RejectedCompanion>,
}

/// A companion entry that was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCompanion {
    pub name: String,
    pub reason: &'static str,
}

impl fmt::Display for RejectedCompanion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.name, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("first non-blank line is not a `Target path:` declaration")]
    MissingTarget,

    #[error("`Target path:` declaration is empty")]
    EmptyTarget,

    #[error("target path contains illegal character {0:?}")]
    IllegalCharacter(char),

    #[error("target path '{0}' is not absolute")]
    RelativeTarget(String),
}

impl ResponseHeader {
    /// Render the header lines in canonical form (no body).
    pub fn render(&self) -> String {
        let mut out = format!("{} {}\n", TARGET_LABEL, self.target_dir.display());
        if !self.companions.is_empty() {
            out.push_str(FILES_LABEL);
            out.push(' ');
            out.push_str(&self.companions.join(", "));
            out.push('\n');
        }
        out
    }
}

/// Extract a [`ResponseHeader`] from file content.
pub fn parse_header(content: &str) -> Result<ResponseHeader, HeaderError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.lines().skip_while(|line| line.trim().is_empty());

    let declared = lines
        .next()
        .and_then(|line| line.trim().strip_prefix(TARGET_LABEL))
        .ok_or(HeaderError::MissingTarget)?
        .trim();

    let target_dir = validate_target(declared)?;

    let (companions, rejected) = match lines
        .next()
        .and_then(|line| line.trim().strip_prefix(FILES_LABEL))
    {
        Some(list) => split_companions(list),
        None => (Vec::new(), Vec::new()),
    };

    Ok(ResponseHeader {
        target_dir,
        companions,
        rejected,
    })
}

fn validate_target(declared: &str) -> Result<PathBuf, HeaderError> {
    if declared.is_empty() {
        return Err(HeaderError::EmptyTarget);
    }
    if let Some(c) = declared.chars().find(|c| is_illegal_char(*c)) {
        return Err(HeaderError::IllegalCharacter(c));
    }
    let path = PathBuf::from(declared);
    if !path.is_absolute() {
        return Err(HeaderError::RelativeTarget(declared.to_string()));
    }
    Ok(path)
}

fn split_companions(list: &str) -> (Vec<String>, Vec<RejectedCompanion>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for raw in list.split(',') {
        let name = raw.trim();
        if name.is_empty() {
            continue;
        }
        match check_companion(name) {
            Ok(()) => accepted.push(name.to_string()),
            Err(reason) => rejected.push(RejectedCompanion {
                name: name.to_string(),
                reason,
            }),
        }
    }

    (accepted, rejected)
}

/// Companions must be a single plain path component.
fn check_companion(name: &str) -> Result<(), &'static str> {
    if name.contains('/') || name.contains('\\') {
        return Err("contains a path separator");
    }
    if name.chars().any(is_illegal_char) || (cfg!(windows) && name.contains(':')) {
        return Err("contains an illegal character");
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err("not a bare file name"),
    }
}

/// Characters no supported filesystem accepts in a path.
fn is_illegal_char(c: char) -> bool {
    c.is_control() || (cfg!(windows) && matches!(c, '<' | '>' | '"' | '|' | '?' | '*'))
}
