//! High-level orchestration layer over the lower-level crates.
//! Intentionally thin: exposes stable functions used by the CLI and tests
//! without making callers import parser/generator crates directly.

pub mod diff;
pub mod export;
pub mod health;
pub mod update;

pub use cisync_core::Result;
pub use diff::diff_objects;
pub use export::{export_dir, export_object, export_to_string};
pub use health::health_scan;
pub use update::{
    build_submission, read_ci_file, sync_batch, sync_object, Submission, SyncInput, UpdateOptions,
};
