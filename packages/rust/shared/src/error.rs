//! Error types for ExoAtlas.
//!
//! Library crates use [`ExoAtlasError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ExoAtlas operations.
#[derive(Debug, thiserror::Error)]
pub enum ExoAtlasError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the article service.
    #[error("network error: {0}")]
    Network(String),

    /// Response payload could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Catalog (CSV) could not be read or lacks required columns.
    #[error("catalog error: {message}")]
    Catalog { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ExoAtlasError>;

impl ExoAtlasError {
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

    /// Create a catalog error from any displayable message.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ExoAtlasError::config("concurrency must be at least 1");
        assert_eq!(err.to_string(), "config error: concurrency must be at least 1");

        let err = ExoAtlasError::catalog("missing column pl_name");
        assert!(err.to_string().contains("pl_name"));

        let err = ExoAtlasError::Storage("disk full".into());
        assert_eq!(err.to_string(), "storage error: disk full");
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ExoAtlasError::io("/tmp/missing.csv", source);
        let msg = err.to_string();
        assert!(msg.contains("missing.csv"));
        assert!(msg.contains("gone"));
    }
}
