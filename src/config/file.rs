//! TOML configuration file loading
//!
//! Supports `~/.config/pinky-trust/config.toml` as a persistent config source.
//! Every field is optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinkyConfigFile {
    /// Language used when a request names none (e.g. "tw")
    pub default_language: Option<String>,

    #[serde(default)]
    pub server: ServerFileConfig,

    /// GhanaNLP Khaya credentials and endpoints
    #[serde(default)]
    pub khaya: KhayaFileConfig,

    #[serde(default)]
    pub synthesis: SynthesisFileConfig,

    #[serde(default)]
    pub capture: CaptureFileConfig,
}

/// HTTP server configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerFileConfig {
    pub port: Option<u16>,

    /// Directory of web UI assets to serve
    pub static_dir: Option<String>,

    /// Requests per minute across all clients (0 disables)
    pub rate_limit_rpm: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KhayaFileConfig {
    pub api_key: Option<String>,
    pub tts_url: Option<String>,
    pub asr_url: Option<String>,
    pub translate_url: Option<String>,
    pub asr_content_type: Option<String>,
}

/// Chunking, retry and pacing for speech synthesis
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisFileConfig {
    pub max_chars: Option<usize>,
    pub max_attempts: Option<u32>,
    pub pacing_ms: Option<u64>,
    pub retry_ms: Option<u64>,
}

/// Recording validation thresholds
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureFileConfig {
    pub min_recording_ms: Option<u64>,
    pub min_recording_bytes: Option<usize>,
}

/// Load the TOML config file from the standard path
///
/// Returns `PinkyConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> PinkyConfigFile {
    config_file_path().map_or_else(PinkyConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_file_from(path: &Path) -> PinkyConfigFile {
    if !path.exists() {
        return PinkyConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                PinkyConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            PinkyConfigFile::default()
        }
    }
}

/// Return the config file path: `<config dir>/pinky-trust/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("pinky-trust").join("config.toml"))
}
