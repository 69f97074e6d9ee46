//! Pinky Trust - voice gateway for a women's-health chat assistant
//!
//! This library turns chat replies into speech and user speech into text in
//! Ghanaian and other African languages, by way of the GhanaNLP Khaya APIs:
//! - Text chunking under the synthesis character limit
//! - Paced, retried per-chunk synthesis and audio reassembly
//! - Recording capture, validation and transcription
//! - Translation between supported languages
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              Web UI  │  pinky CLI                    │
//! └────────────────────┬─────────────────────────────────┘
//!                      │ HTTP (api)
//! ┌────────────────────▼─────────────────────────────────┐
//! │                 SpeechPipeline                        │
//! │  Chunker │ Synthesizer │ Reassembler │ Transcriber    │
//! └────────────────────┬─────────────────────────────────┘
//!                      │ providers::KhayaClient
//! ┌────────────────────▼─────────────────────────────────┐
//! │           Khaya  TTS  │  ASR  │  Translate            │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod providers;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use voice::{Language, SpeechPipeline};
