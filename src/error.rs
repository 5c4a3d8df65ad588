//! Error Types
//!
//! Error taxonomy shared across the launcher:
//! - [`LaunchError::Validation`]: malformed or missing user input, surfaced
//!   immediately with an actionable message
//! - [`LaunchError::Io`]: local filesystem failures, reported with the
//!   offending path
//! - [`LaunchError::Remote`]: storage/batch provider failures, propagated
//!   uncaught to the process exit path
//! - [`LaunchError::Unsupported`]: operations the selected backend does not
//!   implement; these fail loudly instead of silently no-opping

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while preparing or submitting a pipeline run.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Malformed or missing required input. Never retried.
    #[error("{0}")]
    Validation(String),

    /// Local filesystem access failure, with the path that caused it.
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure reported by the storage or batch provider API.
    #[error("remote service error: {0}")]
    Remote(String),

    /// Operation deliberately unsupported by the current backend.
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
}

impl LaunchError {
    /// Wraps an I/O error together with the path being accessed.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<reqwest::Error> for LaunchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LaunchError>;
