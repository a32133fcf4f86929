//! Error types for the album pipeline.
//!
//! Errors are organized by stage so a log line always carries the file path
//! and the stage that gave up on it.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for album operations.
#[derive(Error, Debug)]
pub enum AlbumError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// The scan root cannot be listed. Fatal: no stage is started.
    #[error("Root directory could not be read: {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-task pipeline errors, organized by stage.
///
/// A worker turns every one of these into a logged `Failed` completion.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source file could not be opened
    #[error("Could not read photo file at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source file could not be read to the end
    #[error("Read error for {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JPEG decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Decoded image exceeds the configured dimension limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Thumbnail encoding failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// A cache artifact could not be persisted
    #[error("Could not write {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// The blocking task running a stage function panicked or was cancelled
    #[error("Worker failure in {stage} stage for {path}: {message}")]
    Worker {
        path: PathBuf,
        stage: String,
        message: String,
    },

    /// Completion signals do not add up to the dispatched task count
    #[error("{stage} stage dispatched {dispatched} tasks but recorded {completed} completions")]
    Accounting {
        stage: String,
        dispatched: usize,
        completed: usize,
    },
}

/// Convenience type alias for album results.
pub type Result<T> = std::result::Result<T, AlbumError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_stage() {
        let err = PipelineError::Timeout {
            path: PathBuf::from("/photos/a.jpg"),
            stage: "thumbnail".to_string(),
            timeout_ms: 500,
        };
        let msg = err.to_string();
        assert!(msg.contains("thumbnail"));
        assert!(msg.contains("/photos/a.jpg"));
    }

    #[test]
    fn test_pipeline_error_converts_to_album_error() {
        let err: AlbumError = PipelineError::Accounting {
            stage: "hash".to_string(),
            dispatched: 3,
            completed: 2,
        }
        .into();
        assert!(matches!(err, AlbumError::Pipeline(_)));
        assert!(err.to_string().contains("dispatched 3"));
    }
}
