//! Error types for extpack.
//!
//! Library crates use [`ExtpackError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all extpack operations.
#[derive(Debug, thiserror::Error)]
pub enum ExtpackError {
    /// Configuration file missing, malformed, or failing validation.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Transport-level failure talking to the compiler service.
    #[error("network error: {0}")]
    Network(String),

    /// The compiler service answered, but not with compiled code.
    #[error("remote compile error: {message}")]
    RemoteCompile { message: String },

    /// A minifier rejected its input.
    #[error("minify error: {message}")]
    Minify { message: String },

    /// Copying an asset into the output tree failed.
    #[error("copy error {from:?} -> {to:?}: {message}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ExtpackError>;

impl ExtpackError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a remote compile error from any displayable message.
    pub fn remote_compile(msg: impl Into<String>) -> Self {
        Self::RemoteCompile {
            message: msg.into(),
        }
    }

    /// Create a minify error from any displayable message.
    pub fn minify(msg: impl Into<String>) -> Self {
        Self::Minify {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a copy error for a `from -> to` job.
    pub fn copy(from: impl Into<PathBuf>, to: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Copy {
            from: from.into(),
            to: to.into(),
            message: msg.into(),
        }
    }
}
