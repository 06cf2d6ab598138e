//! Error types for tunelayer
//!
//! This module defines all error types used throughout the application,
//! covering layer parsing, staging analysis and release mutation.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tunelayer operations
#[derive(Error, Debug)]
pub enum TuneError {
    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Definition ID absent from the relevant layer
    #[error("'{id}' not found in {layer}")]
    NotFound { id: String, layer: String },

    /// Malformed backing file (fail-loud path, e.g. single-file diff)
    #[error("Failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// Releasing the object would break the current tuning
    #[error("Releasing '{id}' would break the running system: {reason}")]
    Breaking { id: String, reason: String },

    /// Another process holds the run lock
    #[error("tunelayer is currently in use by process {pid}")]
    LockHeld { pid: i32 },

    /// Operation declined at the confirmation prompt
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Multiple errors occurred
    #[error("Multiple errors occurred ({count} errors)")]
    MultipleErrors {
        count: usize,
        errors: Vec<TuneError>,
    },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TuneError>,
    },
}

impl TuneError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a not-found error
    pub fn not_found(id: impl Into<String>, layer: impl Into<String>) -> Self {
        Self::NotFound {
            id: id.into(),
            layer: layer.into(),
        }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a breaking-release error
    pub fn breaking(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Breaking {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this error (or any wrapped error) blocks a release
    pub fn is_breaking(&self) -> bool {
        match self {
            Self::Breaking { .. } => true,
            Self::WithContext { source, .. } => source.is_breaking(),
            Self::MultipleErrors { errors, .. } => errors.iter().any(|e| e.is_breaking()),
            _ => false,
        }
    }

    /// Exit code for the CLI contract: 2 for blocked releases, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.is_breaking() {
            2
        } else {
            1
        }
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::Parse { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for tunelayer operations
pub type Result<T> = std::result::Result<T, TuneError>;

impl From<std::io::Error> for TuneError {
    fn from(err: std::io::Error) -> Self {
        TuneError::Io {
            path: std::path::PathBuf::new(),
            source: err,
        }
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| TuneError::io(path, e))
    }
}

/// Collects multiple results into a single result
pub fn collect_errors<T>(results: Vec<Result<T>>) -> Result<Vec<T>> {
    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(value) => successes.push(value),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(successes)
    } else if errors.len() == 1 {
        Err(errors.into_iter().next().unwrap())
    } else {
        Err(TuneError::MultipleErrors {
            count: errors.len(),
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = TuneError::io("/test/path", io_err);
        assert!(err.path().is_some());
        assert_eq!(err.path().unwrap(), &PathBuf::from("/test/path"));
    }

    #[test]
    fn test_breaking_detection_through_wrappers() {
        let err = TuneError::breaking("SOL1", "member note missing").with_context("release");
        assert!(err.is_breaking());
        assert_eq!(err.exit_code(), 2);

        let plain = TuneError::Cancelled;
        assert!(!plain.is_breaking());
        assert_eq!(plain.exit_code(), 1);
    }

    #[test]
    fn test_collect_errors() {
        let results: Vec<Result<i32>> = vec![Ok(1), Ok(2), Ok(3)];
        let collected = collect_errors(results);
        assert!(collected.is_ok());
        assert_eq!(collected.unwrap(), vec![1, 2, 3]);

        let results: Vec<Result<i32>> = vec![
            Ok(1),
            Err(TuneError::Cancelled),
            Err(TuneError::not_found("N1", "staging")),
        ];
        let collected = collect_errors(results);
        assert!(collected.is_err());
        match collected.unwrap_err() {
            TuneError::MultipleErrors { count, .. } => assert_eq!(count, 2),
            other => panic!("expected MultipleErrors, got {other:?}"),
        }
    }
}
