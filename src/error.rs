//! Error types for the Pinky Trust voice gateway

use thiserror::Error;

use crate::voice::{CaptureError, FailedChunk};

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Unsupported or malformed language code
    #[error("unsupported language: {0}")]
    Language(String),

    /// Caller supplied unusable input (empty text, empty audio)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Recording capture or validation error
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// A synthesis backend request failed (one attempt for one chunk)
    #[error("TTS error: {0}")]
    Tts(String),

    /// Every chunk of a synthesis batch failed
    #[error("speech synthesis produced no audio ({} chunk(s) failed)", failures.len())]
    SynthesisBatch {
        /// Per-chunk failure records, ordered by index
        failures: Vec<FailedChunk>,
    },

    /// Reassembly invoked without any synthesized chunks
    #[error("reassembly requires at least one synthesized chunk")]
    ReassemblyPrecondition,

    /// A translation backend request failed
    #[error("translation error: {0}")]
    Translation(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
