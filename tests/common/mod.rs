//! Shared test utilities: scripted speech backends

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pinky_trust::voice::{
    BackoffPolicy, ChunkSynthesizer, Language, SpeechPipeline, SynthesisBackend,
    TranscriptionBackend, TranscriptionFailure, Transcriber, TranslationBackend,
};
use pinky_trust::{Error, Result};

/// Synthesis backend that fails any text containing one of `poison`
///
/// Successful audio is `<text>` as bytes so ordering is visible.
#[derive(Default)]
pub struct ScriptedSynthesis {
    pub poison: Vec<&'static str>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedSynthesis {
    pub fn failing_on(poison: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            poison: poison.to_vec(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SynthesisBackend for ScriptedSynthesis {
    async fn synthesize(&self, text: &str, _language: Language) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.poison.iter().any(|p| text.contains(p)) {
            return Err(Error::Tts("Khaya TTS error 500: internal".to_string()));
        }
        Ok(format!("<{text}>").into_bytes())
    }
}

/// Transcription backend returning a fixed reply
pub struct ScriptedTranscription(pub std::result::Result<String, TranscriptionFailure>);

#[async_trait]
impl TranscriptionBackend for ScriptedTranscription {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _language: Language,
    ) -> std::result::Result<String, TranscriptionFailure> {
        self.0.clone()
    }
}

/// Translation backend tagging text with the language pair
pub struct TaggingTranslator;

#[async_trait]
impl TranslationBackend for TaggingTranslator {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        Ok(format!("[{source}->{target}] {text}"))
    }
}

/// Pipeline over scripted backends with no pacing or retry delays
pub fn pipeline(
    synthesis: Arc<ScriptedSynthesis>,
    transcription: std::result::Result<String, TranscriptionFailure>,
    max_chars: usize,
) -> SpeechPipeline {
    SpeechPipeline::new(
        ChunkSynthesizer::new(synthesis, BackoffPolicy::immediate(3)),
        Transcriber::new(Arc::new(ScriptedTranscription(transcription))),
        max_chars,
    )
    .with_translator(Arc::new(TaggingTranslator))
}
