//! Shared types, error model, and configuration for extpack.
//!
//! This crate is the foundation depended on by all other extpack crates.
//! It provides:
//! - [`ExtpackError`], the unified error type
//! - Build configuration ([`BuildConfig`], [`load_config`])
//! - Report types shared by the stages ([`FileOutcome`], [`StageReport`], [`CopyReport`])

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AssetEntry, BuildConfig, CompilationLevel, CompilerConfig, DEFAULT_CONFIG_FILE, ExtensionMatch,
    MAX_CONCURRENCY, load_config, parse_config,
};
pub use error::{ExtpackError, Result};
pub use types::{BuildReport, CopyOutcome, CopyReport, FileCategory, FileOutcome, StageReport};
