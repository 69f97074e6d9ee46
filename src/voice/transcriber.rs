//! Transcription submission and transcript normalization

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::language::Language;
use super::recorder::Recording;

/// Why a transcription request produced no usable body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionFailure {
    /// Backend answered with a non-2xx status
    Status { status: u16, body: String },
    /// Request never completed (connect, TLS, body read)
    Transport(String),
}

impl fmt::Display for TranscriptionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, body } => {
                write!(f, "transcription backend error {status}: {body}")
            }
            Self::Transport(detail) => write!(f, "transcription request failed: {detail}"),
        }
    }
}

/// A speech-to-text backend returning a plain-text body
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe raw audio bytes, returning the backend's response body as-is
    ///
    /// # Errors
    ///
    /// Returns a [`TranscriptionFailure`] for non-2xx responses and transport errors
    async fn transcribe(
        &self,
        audio: &[u8],
        language: Language,
    ) -> Result<String, TranscriptionFailure>;
}

/// Outcome of submitting one recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    /// Non-empty recognized speech
    Text(String),
    /// Backend answered successfully but recognized nothing
    NoSpeechDetected,
    /// Backend or transport fault
    Failure(String),
}

/// Turns a raw backend body into a candidate transcript, `None` when empty
pub type Normalizer = fn(&str) -> Option<String>;

/// Strip one pair of wrapping double quotes, then surrounding whitespace.
///
/// The transcription backend sometimes returns its text JSON-quoted inside a
/// plain-text body. Quotes are only removed when both ends carry one.
#[must_use]
pub fn normalize_transcript(raw: &str) -> Option<String> {
    let unquoted = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);

    let trimmed = unquoted.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Submits recordings to a [`TranscriptionBackend`]
#[derive(Clone)]
pub struct Transcriber {
    backend: Arc<dyn TranscriptionBackend>,
    normalizer: Normalizer,
}

impl Transcriber {
    /// Create a transcriber using [`normalize_transcript`]
    #[must_use]
    pub fn new(backend: Arc<dyn TranscriptionBackend>) -> Self {
        Self {
            backend,
            normalizer: normalize_transcript,
        }
    }

    /// Replace the response normalization step
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Submit a validated recording
    pub async fn submit(&self, recording: &Recording, language: Language) -> TranscriptionOutcome {
        tracing::debug!(
            audio_bytes = recording.audio.len(),
            mime = %recording.mime_type,
            duration_ms = recording.duration.as_millis(),
            "submitting recording"
        );
        self.submit_audio(&recording.audio, language).await
    }

    /// Submit raw audio bytes (uploads whose duration is unknown)
    pub async fn submit_audio(&self, audio: &[u8], language: Language) -> TranscriptionOutcome {
        match self.backend.transcribe(audio, language).await {
            Ok(body) => match (self.normalizer)(&body) {
                Some(text) => {
                    tracing::info!(
                        %language,
                        chars = text.chars().count(),
                        "transcription complete"
                    );
                    TranscriptionOutcome::Text(text)
                }
                None => {
                    tracing::info!(%language, "no speech detected");
                    TranscriptionOutcome::NoSpeechDetected
                }
            },
            Err(failure) => {
                tracing::error!(%language, error = %failure, "transcription failed");
                TranscriptionOutcome::Failure(failure.to_string())
            }
        }
    }
}
