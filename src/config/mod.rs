//! Configuration management for the Pinky Trust voice gateway
//!
//! Values come from built-in defaults, overlaid by the optional TOML file
//! (see [`file`]), overlaid by environment variables.

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::providers::{KhayaClient, KhayaEndpoints};
use crate::voice::{
    BackoffPolicy, CaptureThresholds, ChunkSynthesizer, DEFAULT_MAX_CHARS, Language,
    SpeechPipeline, Transcriber,
};
use crate::{Error, Result};

use self::file::PinkyConfigFile;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8787;

/// Voice gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// GhanaNLP API key; speech endpoints are disabled without it
    pub api_key: Option<SecretString>,

    /// Khaya endpoint locations
    pub endpoints: KhayaEndpoints,

    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Speech synthesis chunking and retries
    pub synthesis: SynthesisConfig,

    /// Recording validation thresholds
    pub capture: CaptureThresholds,

    /// Language assumed when a request names none
    pub default_language: Language,
}

/// HTTP API server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,

    /// Global requests-per-minute limit, `None` when disabled
    pub rate_limit_rpm: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisConfig {
    /// Maximum characters per synthesis request
    pub max_chars: usize,

    pub backoff: BackoffPolicy,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file and process environment
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but malformed
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// Environment values win over file values.
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but malformed
    pub fn from_sources<F>(fc: PinkyConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_key = env("GHANANLP_API_KEY")
            .or(fc.khaya.api_key)
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        let defaults = KhayaEndpoints::default();
        let endpoints = KhayaEndpoints {
            tts_url: env("PINKY_TTS_URL")
                .or(fc.khaya.tts_url)
                .unwrap_or(defaults.tts_url),
            asr_url: env("PINKY_ASR_URL")
                .or(fc.khaya.asr_url)
                .unwrap_or(defaults.asr_url),
            translate_url: env("PINKY_TRANSLATE_URL")
                .or(fc.khaya.translate_url)
                .unwrap_or(defaults.translate_url),
            asr_content_type: env("PINKY_ASR_CONTENT_TYPE")
                .or(fc.khaya.asr_content_type)
                .unwrap_or(defaults.asr_content_type),
        };

        let port = match parsed(&env, "PINKY_PORT")? {
            Some(port) => port,
            None => parsed(&env, "PORT")?.or(fc.server.port).unwrap_or(DEFAULT_PORT),
        };
        let rate_limit_rpm = parsed(&env, "PINKY_RATE_LIMIT_RPM")?
            .or(fc.server.rate_limit_rpm)
            .filter(|rpm| *rpm > 0);
        let server = ServerConfig {
            port,
            static_dir: env("PINKY_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
            rate_limit_rpm,
        };

        let backoff_defaults = BackoffPolicy::default();
        let synthesis = SynthesisConfig {
            max_chars: parsed(&env, "PINKY_TTS_MAX_CHARS")?
                .or(fc.synthesis.max_chars)
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_CHARS),
            backoff: BackoffPolicy {
                max_attempts: parsed(&env, "PINKY_TTS_MAX_ATTEMPTS")?
                    .or(fc.synthesis.max_attempts)
                    .unwrap_or(backoff_defaults.max_attempts)
                    .max(1),
                pacing_delay: parsed(&env, "PINKY_TTS_PACING_MS")?
                    .or(fc.synthesis.pacing_ms)
                    .map_or(backoff_defaults.pacing_delay, Duration::from_millis),
                retry_delay: parsed(&env, "PINKY_TTS_RETRY_MS")?
                    .or(fc.synthesis.retry_ms)
                    .map_or(backoff_defaults.retry_delay, Duration::from_millis),
            },
        };

        let capture_defaults = CaptureThresholds::default();
        let capture = CaptureThresholds {
            min_duration: parsed(&env, "PINKY_MIN_RECORDING_MS")?
                .or(fc.capture.min_recording_ms)
                .map_or(capture_defaults.min_duration, Duration::from_millis),
            min_bytes: parsed(&env, "PINKY_MIN_RECORDING_BYTES")?
                .or(fc.capture.min_recording_bytes)
                .unwrap_or(capture_defaults.min_bytes),
        };

        let default_language = match env("PINKY_DEFAULT_LANGUAGE").or(fc.default_language) {
            Some(code) => code.parse()?,
            None => Language::Twi,
        };

        Ok(Self {
            api_key,
            endpoints,
            server,
            synthesis,
            capture,
            default_language,
        })
    }

    /// Whether the speech backends can be reached
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the Khaya-backed speech pipeline, `None` without an API key
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created
    pub fn speech_pipeline(&self) -> Result<Option<SpeechPipeline>> {
        let Some(api_key) = self.api_key.clone() else {
            tracing::warn!("GHANANLP_API_KEY not set, speech endpoints disabled");
            return Ok(None);
        };

        let client = Arc::new(KhayaClient::new(api_key, self.endpoints.clone())?);
        let pipeline = SpeechPipeline::new(
            ChunkSynthesizer::new(client.clone(), self.synthesis.backoff.clone()),
            Transcriber::new(client.clone()),
            self.synthesis.max_chars,
        )
        .with_translator(client);

        Ok(Some(pipeline))
    }
}

fn parsed<T, F>(env: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    env(key).map(|raw| parse_value(key, &raw)).transpose()
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}")))
}
