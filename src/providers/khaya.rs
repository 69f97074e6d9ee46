//! GhanaNLP Khaya speech and translation client
//!
//! One client serves all three backends. Each request carries the API key in
//! the `Ocp-Apim-Subscription-Key` header.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::voice::{
    Language, SynthesisBackend, TranscriptionBackend, TranscriptionFailure, TranslationBackend,
    language_pair,
};
use crate::{Error, Result};

/// Default synthesis endpoint
pub const DEFAULT_TTS_URL: &str = "https://translation-api.ghananlp.org/tts/v1/tts";
/// Default transcription endpoint
pub const DEFAULT_ASR_URL: &str = "https://translation-api.ghananlp.org/asr/v1/transcribe";
/// Default translation endpoint
pub const DEFAULT_TRANSLATE_URL: &str = "https://translation-api.ghananlp.org/v1/translate";
/// Default content type for transcription uploads
pub const DEFAULT_ASR_CONTENT_TYPE: &str = "audio/mpeg";

const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Endpoint locations for a [`KhayaClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KhayaEndpoints {
    pub tts_url: String,
    pub asr_url: String,
    pub translate_url: String,
    /// Content type sent with every transcription upload
    pub asr_content_type: String,
}

impl Default for KhayaEndpoints {
    fn default() -> Self {
        Self {
            tts_url: DEFAULT_TTS_URL.to_string(),
            asr_url: DEFAULT_ASR_URL.to_string(),
            translate_url: DEFAULT_TRANSLATE_URL.to_string(),
            asr_content_type: DEFAULT_ASR_CONTENT_TYPE.to_string(),
        }
    }
}

/// HTTP client for the Khaya synthesis, transcription and translation APIs
#[derive(Clone)]
pub struct KhayaClient {
    client: reqwest::Client,
    api_key: SecretString,
    endpoints: KhayaEndpoints,
}

impl KhayaClient {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: SecretString, endpoints: KhayaEndpoints) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::Config("GhanaNLP API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            endpoints,
        })
    }

    /// Configured endpoints
    #[must_use]
    pub const fn endpoints(&self) -> &KhayaEndpoints {
        &self.endpoints
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header(KEY_HEADER, self.api_key.expose_secret())
    }
}

#[async_trait]
impl SynthesisBackend for KhayaClient {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>> {
        #[derive(Serialize)]
        struct TtsRequest<'a> {
            text: &'a str,
            language: &'a str,
        }

        tracing::debug!(chars = text.chars().count(), %language, "requesting synthesis");

        let response = self
            .post(&self.endpoints.tts_url)
            .json(&TtsRequest {
                text,
                language: language.code(),
            })
            .send()
            .await
            .map_err(|e| Error::Tts(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("Khaya TTS error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Tts(format!("failed to read audio: {e}")))?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl TranscriptionBackend for KhayaClient {
    async fn transcribe(
        &self,
        audio: &[u8],
        language: Language,
    ) -> std::result::Result<String, TranscriptionFailure> {
        tracing::debug!(audio_bytes = audio.len(), %language, "requesting transcription");

        let response = self
            .post(&self.endpoints.asr_url)
            .query(&[("language", language.code())])
            .header(reqwest::header::CONTENT_TYPE, &self.endpoints.asr_content_type)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| TranscriptionFailure::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranscriptionFailure::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(TranscriptionFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl TranslationBackend for KhayaClient {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        #[derive(Serialize)]
        struct TranslateRequest<'a> {
            #[serde(rename = "in")]
            input: &'a str,
            lang: String,
        }

        let lang = language_pair(source, target);
        tracing::debug!(chars = text.chars().count(), %lang, "requesting translation");

        let response = self
            .post(&self.endpoints.translate_url)
            .json(&TranslateRequest { input: text, lang })
            .send()
            .await
            .map_err(|e| Error::Translation(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Translation(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Error::Translation(format!(
                "Khaya translation error {status}: {body}"
            )));
        }

        Ok(parse_translation(&body))
    }
}

/// The translation API answers with either a JSON string or plain text
fn parse_translation(body: &str) -> String {
    serde_json::from_str::<String>(body)
        .unwrap_or_else(|_| body.to_string())
        .trim()
        .to_string()
}
