//! Error types for the Keepsake curation pipeline.
//!
//! Fatal errors (`CollectionError`) stop the run before any file is touched.
//! Per-record errors (`PipelineError`) never escape a stage; they are turned
//! into a disposition for that one record and reported.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Keepsake operations.
#[derive(Error, Debug)]
pub enum KeepsakeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fatal collection errors (bad root, nothing to curate)
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

/// Fatal errors raised while collecting the source tree.
#[derive(Error, Debug)]
pub enum CollectionError {
    /// Root is missing or is not a directory
    #[error("Invalid root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// Root holds no eligible photo or video files
    #[error("No photo or video files found under {path}")]
    EmptyCollection { path: PathBuf },
}

/// Per-record failures, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Format conversion failed
    #[error("Conversion failed for {path}: {message}")]
    Transcode { path: PathBuf, message: String },

    /// Perceptual hashing failed
    #[error("Hashing failed for {path}: {message}")]
    Hash { path: PathBuf, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// Filesystem operation failed
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

impl PipelineError {
    /// Build an `Io` variant, attaching the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type alias for Keepsake results.
pub type Result<T> = std::result::Result<T, KeepsakeError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
