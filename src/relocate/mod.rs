// src/relocate/mod.rs

//! Relocation engine: directory creation, no-clobber moves with retry, and
//! companion collection.

pub mod engine;
pub mod naming;
pub mod retry;

pub use engine::{MissingCompanion, MoveFailure, MovedFile, RelocationEngine, RelocationOutcome};
pub use naming::candidate_name;
pub use retry::{is_transient, RetryPolicy};
