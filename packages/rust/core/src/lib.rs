//! Build orchestration for extpack.
//!
//! This crate ties together discovery, the output layout, the per-category
//! transform stages and the asset copy into a single build (see
//! [`BuildOrchestrator`]).

pub mod assets;
pub mod pipeline;
pub mod stages;

pub use pipeline::{BuildHandle, BuildOrchestrator, BuildState, ProgressReporter, SilentProgress};
