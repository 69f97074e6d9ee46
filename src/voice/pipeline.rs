//! Speech pipeline: the service boundary used by the HTTP API and CLI
//!
//! ```text
//! text ─▶ chunk_text ─▶ ChunkSynthesizer ─▶ (reassemble) ─▶ audio
//! audio ─▶ Transcriber ─▶ TranscriptionOutcome
//! text ─▶ TranslationBackend ─▶ text
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use super::chunking::chunk_text;
use super::language::Language;
use super::reassembly::reassemble;
use super::recorder::Recording;
use super::synthesizer::{ChunkSynthesizer, FailedChunk, SynthesizedChunk};
use super::transcriber::{Transcriber, TranscriptionOutcome};
use super::translation::TranslationBackend;
use crate::{Error, Result};

/// Progress marker emitted as a request moves through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum PipelineStage {
    Transcribing,
    Translating,
    Synthesizing { chunk: usize, total: usize },
    Reassembling,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transcribing => f.write_str("transcribing"),
            Self::Translating => f.write_str("translating"),
            Self::Synthesizing { chunk, total } => {
                write!(f, "synthesizing chunk {chunk} of {total}")
            }
            Self::Reassembling => f.write_str("reassembling audio"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Optional sink for [`PipelineStage`] events
///
/// Emitting never blocks and never fails; a dropped receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    tx: Option<mpsc::UnboundedSender<PipelineStage>>,
}

impl Progress {
    /// A sink that discards every event
    #[must_use]
    pub const fn none() -> Self {
        Self { tx: None }
    }

    /// A sink paired with the receiver that observes it
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineStage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Report a stage
    pub fn emit(&self, stage: PipelineStage) {
        tracing::trace!(%stage, "pipeline progress");
        if let Some(tx) = &self.tx {
            let _ = tx.send(stage);
        }
    }
}

/// Audio produced for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechSynthesis {
    /// Successful chunks, ordered by index
    pub audio_chunks: Vec<SynthesizedChunk>,
    /// Chunks that exhausted their retries, ordered by index
    pub failed_chunks: Vec<FailedChunk>,
}

impl SpeechSynthesis {
    /// True when some chunks are missing from the audio
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failed_chunks.is_empty()
    }

    /// All audio as a single playable payload
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReassemblyPrecondition`] if there is no audio
    pub fn combined_audio(&self) -> Result<Vec<u8>> {
        reassemble(self.audio_chunks.clone())
    }
}

/// Wires chunking, synthesis, transcription and translation together
#[derive(Clone)]
pub struct SpeechPipeline {
    synthesizer: ChunkSynthesizer,
    transcriber: Transcriber,
    translator: Option<Arc<dyn TranslationBackend>>,
    max_chunk_chars: usize,
}

impl SpeechPipeline {
    /// Create a pipeline without translation support
    #[must_use]
    pub const fn new(
        synthesizer: ChunkSynthesizer,
        transcriber: Transcriber,
        max_chunk_chars: usize,
    ) -> Self {
        Self {
            synthesizer,
            transcriber,
            translator: None,
            max_chunk_chars,
        }
    }

    /// Enable translation through `translator`
    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn TranslationBackend>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Maximum characters per synthesis request
    #[must_use]
    pub const fn max_chunk_chars(&self) -> usize {
        self.max_chunk_chars
    }

    /// Whether [`Self::translate`] can reach a backend
    #[must_use]
    pub fn can_translate(&self) -> bool {
        self.translator.is_some()
    }

    /// Chunk and synthesize `text`, tolerating individual chunk failures
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for blank text and
    /// [`Error::SynthesisBatch`] when no chunk produced audio
    pub async fn synthesize_speech(
        &self,
        text: &str,
        language: Language,
        progress: &Progress,
    ) -> Result<SpeechSynthesis> {
        let synthesis = self.synthesize_chunks(text, language, progress).await?;
        progress.emit(PipelineStage::Done);
        Ok(synthesis)
    }

    async fn synthesize_chunks(
        &self,
        text: &str,
        language: Language,
        progress: &Progress,
    ) -> Result<SpeechSynthesis> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("text to synthesize is empty".to_string()));
        }

        let chunks = chunk_text(text, self.max_chunk_chars);
        tracing::info!(
            %language,
            chars = text.chars().count(),
            chunks = chunks.len(),
            "synthesizing speech"
        );

        let report = self
            .synthesizer
            .synthesize_all(&chunks, language, progress)
            .await;

        if report.is_total_failure() {
            tracing::error!(failed = report.failures.len(), "speech synthesis produced no audio");
            return Err(Error::SynthesisBatch {
                failures: report.failures,
            });
        }

        if report.is_partial() {
            tracing::warn!(
                succeeded = report.successes.len(),
                failed = report.failures.len(),
                "speech synthesis partially succeeded"
            );
        }

        Ok(SpeechSynthesis {
            audio_chunks: report.successes,
            failed_chunks: report.failures,
        })
    }

    /// Like [`Self::synthesize_speech`], reassembled into one payload
    ///
    /// Returns the audio together with the chunks missing from it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::synthesize_speech`]
    pub async fn synthesize_combined(
        &self,
        text: &str,
        language: Language,
        progress: &Progress,
    ) -> Result<(Vec<u8>, Vec<FailedChunk>)> {
        let synthesis = self.synthesize_chunks(text, language, progress).await?;
        progress.emit(PipelineStage::Reassembling);
        let audio = reassemble(synthesis.audio_chunks)?;
        progress.emit(PipelineStage::Done);
        Ok((audio, synthesis.failed_chunks))
    }

    /// Transcribe a validated recording
    pub async fn transcribe_recording(
        &self,
        recording: &Recording,
        language: Language,
        progress: &Progress,
    ) -> TranscriptionOutcome {
        progress.emit(PipelineStage::Transcribing);
        let outcome = self.transcriber.submit(recording, language).await;
        progress.emit(PipelineStage::Done);
        outcome
    }

    /// Transcribe raw uploaded audio
    pub async fn transcribe_audio(
        &self,
        audio: &[u8],
        language: Language,
        progress: &Progress,
    ) -> TranscriptionOutcome {
        progress.emit(PipelineStage::Transcribing);
        let outcome = self.transcriber.submit_audio(audio, language).await;
        progress.emit(PipelineStage::Done);
        outcome
    }

    /// Translate `text`; identical languages return the text unchanged
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for blank text, [`Error::Config`] when
    /// no translator is configured, or the backend's error
    pub async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
        progress: &Progress,
    ) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("text to translate is empty".to_string()));
        }

        if source == target {
            tracing::debug!(%source, "translation skipped, same language");
            return Ok(text.to_string());
        }

        let translator = self
            .translator
            .as_ref()
            .ok_or_else(|| Error::Config("translation backend not configured".to_string()))?;

        progress.emit(PipelineStage::Translating);
        let translated = translator.translate(text, source, target).await?;
        tracing::info!(
            %source,
            %target,
            chars = translated.chars().count(),
            "translation complete"
        );
        progress.emit(PipelineStage::Done);

        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::voice::retry::BackoffPolicy;
    use crate::voice::synthesizer::SynthesisBackend;
    use crate::voice::transcriber::{TranscriptionBackend, TranscriptionFailure};

    /// Fails every request whose text contains `poison`
    struct PoisonBackend {
        poison: &'static str,
    }

    #[async_trait]
    impl SynthesisBackend for PoisonBackend {
        async fn synthesize(&self, text: &str, _language: Language) -> Result<Vec<u8>> {
            if text.contains(self.poison) {
                return Err(Error::Tts("500 Internal Server Error".to_string()));
            }
            Ok(format!("[{text}]").into_bytes())
        }
    }

    struct QuietBackend;

    #[async_trait]
    impl TranscriptionBackend for QuietBackend {
        async fn transcribe(
            &self,
            _audio: &[u8],
            _language: Language,
        ) -> std::result::Result<String, TranscriptionFailure> {
            Ok("\"Maakye\"".to_string())
        }
    }

    #[derive(Default)]
    struct RecordingTranslator {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TranslationBackend for RecordingTranslator {
        async fn translate(
            &self,
            text: &str,
            source: Language,
            target: Language,
        ) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{source}->{target}"));
            Ok(text.to_uppercase())
        }
    }

    fn pipeline(poison: &'static str) -> SpeechPipeline {
        SpeechPipeline::new(
            ChunkSynthesizer::new(Arc::new(PoisonBackend { poison }), BackoffPolicy::immediate(3)),
            Transcriber::new(Arc::new(QuietBackend)),
            20,
        )
    }

    const FOUR_SENTENCES: &str = "First one here. Second is bad. Third one here. Fourth one here.";

    #[tokio::test]
    async fn partial_failure_keeps_remaining_audio_in_order() {
        let synthesis = pipeline("bad")
            .synthesize_speech(FOUR_SENTENCES, Language::Twi, &Progress::none())
            .await
            .unwrap();

        let indexes: Vec<_> = synthesis.audio_chunks.iter().map(|c| c.index).collect();
        assert_eq!(indexes, vec![0, 2, 3]);
        assert_eq!(synthesis.failed_chunks.len(), 1);
        assert_eq!(synthesis.failed_chunks[0].index, 1);
        assert!(synthesis.is_partial());

        let combined = synthesis.combined_audio().unwrap();
        assert_eq!(
            String::from_utf8(combined).unwrap(),
            "[First one here.][Third one here.][Fourth one here.]"
        );
    }

    #[tokio::test]
    async fn total_failure_is_a_batch_error() {
        let err = pipeline("one")
            .synthesize_speech("one. one. one.", Language::Twi, &Progress::none())
            .await
            .unwrap_err();

        let Error::SynthesisBatch { failures } = err else {
            panic!("expected batch failure, got {err:?}");
        };
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let err = pipeline("x")
            .synthesize_speech("   ", Language::Twi, &Progress::none())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn combined_reports_stages_in_order() {
        let (progress, mut rx) = Progress::channel();
        let (audio, failed) = pipeline("zzz")
            .synthesize_combined("Short text.", Language::Ga, &progress)
            .await
            .unwrap();
        drop(progress);

        assert_eq!(audio, b"[Short text.]");
        assert!(failed.is_empty());

        let mut stages = Vec::new();
        while let Some(stage) = rx.recv().await {
            stages.push(stage);
        }
        assert_eq!(
            stages,
            vec![
                PipelineStage::Synthesizing { chunk: 1, total: 1 },
                PipelineStage::Reassembling,
                PipelineStage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn done_is_reported_once_and_last() {
        let (progress, mut rx) = Progress::channel();
        pipeline("zzz")
            .synthesize_speech("First one here. Third one here.", Language::Ewe, &progress)
            .await
            .unwrap();
        drop(progress);

        let mut stages = Vec::new();
        while let Some(stage) = rx.recv().await {
            stages.push(stage);
        }
        assert_eq!(stages.last(), Some(&PipelineStage::Done));
        assert_eq!(stages.iter().filter(|s| **s == PipelineStage::Done).count(), 1);
    }

    #[tokio::test]
    async fn batch_failure_never_reports_done() {
        let (progress, mut rx) = Progress::channel();
        let result = pipeline("one")
            .synthesize_combined("one. one.", Language::Twi, &progress)
            .await;
        drop(progress);
        assert!(result.is_err());

        while let Some(stage) = rx.recv().await {
            assert!(matches!(stage, PipelineStage::Synthesizing { .. }));
        }
    }

    #[tokio::test]
    async fn transcribe_normalizes_backend_text() {
        let outcome = pipeline("x")
            .transcribe_audio(&[0; 2000], Language::Twi, &Progress::none())
            .await;
        assert_eq!(outcome, TranscriptionOutcome::Text("Maakye".to_string()));
    }

    #[tokio::test]
    async fn same_language_translation_short_circuits() {
        let translator = Arc::new(RecordingTranslator::default());
        let pipeline = pipeline("x").with_translator(translator.clone());

        let out = pipeline
            .translate("hello", Language::Twi, Language::Twi, &Progress::none())
            .await
            .unwrap();

        assert_eq!(out, "hello");
        assert!(translator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn translation_uses_backend() {
        let translator = Arc::new(RecordingTranslator::default());
        let pipeline = pipeline("x").with_translator(translator.clone());

        let out = pipeline
            .translate("hello", Language::English, Language::Ewe, &Progress::none())
            .await
            .unwrap();

        assert_eq!(out, "HELLO");
        assert_eq!(*translator.calls.lock().unwrap(), vec!["en->ee"]);
    }

    #[tokio::test]
    async fn translation_without_backend_is_config_error() {
        let err = pipeline("x")
            .translate("hello", Language::English, Language::Twi, &Progress::none())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn stage_display() {
        assert_eq!(
            PipelineStage::Synthesizing { chunk: 2, total: 4 }.to_string(),
            "synthesizing chunk 2 of 4"
        );
    }
}
