//! HTTP clients for the remote speech and translation services

mod khaya;

pub use khaya::{
    DEFAULT_ASR_CONTENT_TYPE, DEFAULT_ASR_URL, DEFAULT_TRANSLATE_URL, DEFAULT_TTS_URL,
    KhayaClient, KhayaEndpoints,
};
