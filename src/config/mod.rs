// src/config/mod.rs

//! Configuration loading and validation for routewatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and layer CLI/env overrides (`loader.rs`).
//! - Validate it into an immutable [`WatchRequest`] (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{apply_overrides, load_and_validate, load_effective, load_from_path};
pub use model::{
    ConfigFile, NotifySection, RawConfigFile, RelocateSection, WatchRequest, WatchSection,
    DEFAULT_PATTERN,
};
