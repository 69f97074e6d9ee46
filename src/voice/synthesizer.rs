//! Sequential chunk synthesis with bounded retries
//!
//! Chunks are sent one at a time, in index order, to stay under the
//! synthesis backend's rate limit. A chunk that keeps failing is recorded
//! and skipped; it never aborts the rest of the batch.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::chunking::Chunk;
use super::language::Language;
use super::pipeline::{PipelineStage, Progress};
use super::retry::BackoffPolicy;
use crate::Result;

/// A text-to-speech backend accepting one short text per request
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Synthesize `text` and return the encoded audio payload verbatim
    ///
    /// # Errors
    ///
    /// Returns error on a non-2xx response or transport failure
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>>;
}

/// Audio produced for one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedChunk {
    /// Index of the originating chunk
    pub index: usize,
    /// Encoded audio exactly as returned by the backend
    pub audio: Vec<u8>,
}

/// A chunk whose retry budget ran out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedChunk {
    /// Index of the originating chunk
    pub index: usize,
    /// Text that could not be synthesized
    pub text: String,
    /// Detail of the last error seen
    pub error: String,
}

/// Result of synthesizing a single chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Success(SynthesizedChunk),
    Failure(FailedChunk),
}

/// Per-chunk results of one synthesis batch, each list ordered by index
#[derive(Debug, Clone, Default)]
pub struct SynthesisReport {
    pub successes: Vec<SynthesizedChunk>,
    pub failures: Vec<FailedChunk>,
}

impl SynthesisReport {
    /// True when no chunk produced audio
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.successes.is_empty()
    }

    /// True when some, but not all, chunks produced audio
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.successes.is_empty() && !self.failures.is_empty()
    }

    fn push(&mut self, outcome: ChunkOutcome) {
        match outcome {
            ChunkOutcome::Success(chunk) => self.successes.push(chunk),
            ChunkOutcome::Failure(chunk) => self.failures.push(chunk),
        }
    }
}

/// Drives a [`SynthesisBackend`] over a batch of chunks
#[derive(Clone)]
pub struct ChunkSynthesizer {
    backend: Arc<dyn SynthesisBackend>,
    policy: BackoffPolicy,
}

impl ChunkSynthesizer {
    /// Create a synthesizer over `backend` using `policy` for retries and pacing
    #[must_use]
    pub fn new(backend: Arc<dyn SynthesisBackend>, policy: BackoffPolicy) -> Self {
        Self { backend, policy }
    }

    /// The retry and pacing policy in use
    #[must_use]
    pub const fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Synthesize one chunk, retrying until the attempt budget runs out
    pub async fn synthesize_chunk(&self, chunk: &Chunk, language: Language) -> ChunkOutcome {
        let mut backoff = self.policy.start();
        let mut last_error = String::new();

        while let Some(delay) = backoff.next_attempt() {
            if !delay.is_zero() {
                tracing::debug!(
                    chunk = chunk.index,
                    delay_ms = delay.as_millis(),
                    "waiting before retry"
                );
                tokio::time::sleep(delay).await;
            }

            match self.backend.synthesize(&chunk.text, language).await {
                Ok(audio) => {
                    tracing::debug!(
                        chunk = chunk.index,
                        attempt = backoff.attempts_made(),
                        audio_bytes = audio.len(),
                        "chunk synthesized"
                    );
                    return ChunkOutcome::Success(SynthesizedChunk {
                        index: chunk.index,
                        audio,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        chunk = chunk.index,
                        attempt = backoff.attempts_made(),
                        attempts_remaining = backoff.attempts_remaining(),
                        error = %e,
                        "chunk synthesis attempt failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        tracing::error!(
            chunk = chunk.index,
            attempts = backoff.attempts_made(),
            error = %last_error,
            "chunk synthesis failed, skipping"
        );

        ChunkOutcome::Failure(FailedChunk {
            index: chunk.index,
            text: chunk.text.clone(),
            error: last_error,
        })
    }

    /// Synthesize every chunk sequentially in index order
    ///
    /// Always returns a report; whether a report with no successes is an
    /// error is the caller's decision.
    pub async fn synthesize_all(
        &self,
        chunks: &[Chunk],
        language: Language,
        progress: &Progress,
    ) -> SynthesisReport {
        let mut ordered: Vec<&Chunk> = chunks.iter().collect();
        ordered.sort_by_key(|c| c.index);

        let total = ordered.len();
        let mut report = SynthesisReport::default();

        for (position, chunk) in ordered.into_iter().enumerate() {
            progress.emit(PipelineStage::Synthesizing {
                chunk: position + 1,
                total,
            });

            let outcome = self.synthesize_chunk(chunk, language).await;
            let succeeded = matches!(outcome, ChunkOutcome::Success(_));
            report.push(outcome);

            let more_remaining = position + 1 < total;
            if succeeded && more_remaining && !self.policy.pacing_delay.is_zero() {
                tokio::time::sleep(self.policy.pacing_delay).await;
            }
        }

        tracing::info!(
            chunks = total,
            succeeded = report.successes.len(),
            failed = report.failures.len(),
            "synthesis batch complete"
        );

        report
    }
}
