//! Voice API endpoints for speech synthesis and transcription

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State, rejection::BytesRejection},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::Error;
use crate::voice::{FailedChunk, Language, Progress, SpeechPipeline, TranscriptionOutcome};

/// Response header carrying the number of chunks missing from combined audio
pub const FAILED_CHUNKS_HEADER: HeaderName = HeaderName::from_static("x-failed-chunks");

/// Largest recording accepted by `/transcribe`
pub const MAX_RECORDING_BYTES: usize = 25 * 1024 * 1024;

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/capabilities", get(capabilities))
        .route("/synthesize", post(synthesize))
        .route("/synthesize/audio", post(synthesize_audio))
        .route(
            "/transcribe",
            post(transcribe).layer(DefaultBodyLimit::max(MAX_RECORDING_BYTES)),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
}

/// Voice capabilities response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCapabilities {
    pub stt_available: bool,
    pub tts_available: bool,
    pub translation_available: bool,
    pub default_language: &'static str,
    pub max_chunk_chars: Option<usize>,
    pub max_recording_bytes: usize,
    pub languages: Vec<LanguageInfo>,
}

/// Get voice capabilities
async fn capabilities(State(state): State<Arc<ApiState>>) -> Json<VoiceCapabilities> {
    let pipeline = state.pipeline.as_ref();
    Json(VoiceCapabilities {
        stt_available: pipeline.is_some(),
        tts_available: pipeline.is_some(),
        translation_available: pipeline.is_some_and(SpeechPipeline::can_translate),
        default_language: state.default_language.code(),
        max_chunk_chars: pipeline.map(SpeechPipeline::max_chunk_chars),
        max_recording_bytes: MAX_RECORDING_BYTES,
        languages: Language::ALL
            .iter()
            .map(|l| LanguageInfo {
                code: l.code(),
                name: l.name(),
            })
            .collect(),
    })
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// Synthesis response: base64 audio per successful chunk, in order
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeResponse {
    pub audio_chunks: Vec<String>,
    pub failed_chunks: Vec<FailedChunk>,
}

/// Synthesize text to speech, one audio payload per chunk
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Json<SynthesizeResponse>, VoiceError> {
    let pipeline = configured(&state)?;
    let language = resolve_language(&state, request.language.as_deref())?;

    let synthesis = pipeline
        .synthesize_speech(&request.text, language, &Progress::none())
        .await?;

    Ok(Json(SynthesizeResponse {
        audio_chunks: synthesis
            .audio_chunks
            .iter()
            .map(|c| BASE64.encode(&c.audio))
            .collect(),
        failed_chunks: synthesis.failed_chunks,
    }))
}

/// Synthesize text to speech as one MP3 payload
async fn synthesize_audio(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Response, VoiceError> {
    let pipeline = configured(&state)?;
    let language = resolve_language(&state, request.language.as_deref())?;

    let (audio, failed) = pipeline
        .synthesize_combined(&request.text, language, &Progress::none())
        .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
            (FAILED_CHUNKS_HEADER, HeaderValue::from(failed.len())),
        ],
        audio,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct TranscribeQuery {
    pub language: Option<String>,
}

/// Transcription response
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranscribeResponse {
    Text { text: String },
    NoSpeech,
}

/// Transcribe an uploaded recording
///
/// The body is the raw audio; its encoding is whatever the client recorded.
async fn transcribe(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<TranscribeQuery>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<TranscribeResponse>, VoiceError> {
    let pipeline = configured(&state)?;
    let language = resolve_language(&state, query.language.as_deref())?;
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            VoiceError::PayloadTooLarge(MAX_RECORDING_BYTES)
        } else {
            VoiceError::BadRequest(rejection.body_text())
        }
    })?;

    if body.is_empty() {
        return Err(VoiceError::BadRequest("Empty audio data".to_string()));
    }
    state.capture.validate_size(body.len()).map_err(Error::from)?;

    match pipeline
        .transcribe_audio(&body, language, &Progress::none())
        .await
    {
        TranscriptionOutcome::Text(text) => Ok(Json(TranscribeResponse::Text { text })),
        TranscriptionOutcome::NoSpeechDetected => Ok(Json(TranscribeResponse::NoSpeech)),
        TranscriptionOutcome::Failure(detail) => Err(VoiceError::TranscriptionFailed(detail)),
    }
}

pub(super) fn configured(state: &ApiState) -> Result<&SpeechPipeline, VoiceError> {
    state
        .pipeline
        .as_ref()
        .ok_or(VoiceError::NotConfigured("speech backend not configured (GHANANLP_API_KEY unset)"))
}

pub(super) fn resolve_language(
    state: &ApiState,
    code: Option<&str>,
) -> Result<Language, VoiceError> {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => Ok(code.parse()?),
        None => Ok(state.default_language),
    }
}

/// Voice API errors
#[derive(Debug)]
pub enum VoiceError {
    NotConfigured(&'static str),
    BadRequest(String),
    /// Recording failed size or duration checks
    RecordingRejected(String),
    /// Upload exceeded the byte limit
    PayloadTooLarge(usize),
    TranscriptionFailed(String),
    SynthesisFailed(String),
    TranslationFailed(String),
    Internal(String),
}

impl From<Error> for VoiceError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidInput(_) | Error::Language(_) => Self::BadRequest(e.to_string()),
            Error::Capture(_) => Self::RecordingRejected(e.to_string()),
            Error::Config(_) => Self::NotConfigured("backend not configured"),
            Error::SynthesisBatch { .. } | Error::Tts(_) => Self::SynthesisFailed(e.to_string()),
            Error::Translation(_) => Self::TranslationFailed(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::NotConfigured(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "not_configured",
                msg.to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::RecordingRejected(msg) => (StatusCode::BAD_REQUEST, "recording_rejected", msg),
            Self::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                format!("recording exceeds {limit} bytes"),
            ),
            Self::TranscriptionFailed(msg) => {
                (StatusCode::BAD_GATEWAY, "transcription_failed", msg)
            }
            Self::SynthesisFailed(msg) => (StatusCode::BAD_GATEWAY, "synthesis_failed", msg),
            Self::TranslationFailed(msg) => (StatusCode::BAD_GATEWAY, "translation_failed", msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
