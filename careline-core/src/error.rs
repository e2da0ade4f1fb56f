//! Error types for careline-core

use thiserror::Error;

/// Main error type for the careline-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Message source is present but not a usable message array
    #[error("failed to load messages from {source_name}: {message}")]
    Load {
        source_name: String,
        message: String,
    },

    /// Timestamp that does not follow the transcript format
    #[error("invalid timestamp {value:?}: {message}")]
    Timestamp { value: String, message: String },

    /// Enrichment of a single timeline event failed
    #[error("enrichment failed for message {id}: {message}")]
    Enrichment { id: i64, message: String },

    /// Enrichment was asked for a position past the loaded messages
    #[error("no message at position {index} ({len} loaded)")]
    MessagePosition { index: usize, len: usize },

    /// Upstream annotator call failed
    #[error("annotator error: {0}")]
    Annotator(String),

    /// Raw transcript could not be split into messages
    #[error("transcript parse error: {0}")]
    Transcript(String),
}

/// Result type alias for careline-core
pub type Result<T> = std::result::Result<T, Error>;
