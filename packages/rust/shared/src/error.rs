//! Error types for the fact-checking workspace.
//!
//! Library crates use [`FactCheckError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all fact-checking operations.
#[derive(Debug, thiserror::Error)]
pub enum FactCheckError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during fetch, search, or embedding calls.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Claim or request validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Every extraction strategy failed, or a strategy aborted the chain.
    #[error("extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    /// Similarity scoring error (embedding backend, dimension mismatch).
    #[error("scoring error: {0}")]
    Scoring(String),

    /// Source discovery error.
    #[error("search error: {0}")]
    Search(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FactCheckError>;

impl FactCheckError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an extraction error for `url`.
    pub fn extraction(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
