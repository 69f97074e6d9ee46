//! Voice processing
//!
//! Text chunking, paced chunk synthesis with retries, audio reassembly,
//! recording capture and validation, and transcript normalization. Remote
//! backends are reached through the traits defined here; see
//! [`crate::providers`] for the HTTP implementations.

mod capture;
pub mod chunking;
mod language;
pub mod pipeline;
mod playback;
mod reassembly;
pub mod recorder;
pub mod retry;
pub mod synthesizer;
pub mod transcriber;
mod translation;

pub use capture::{
    CpalInputStream, CpalMicrophone, SAMPLE_RATE, WAV_MIME, rms_level, samples_to_wav,
};
pub use chunking::{Chunk, DEFAULT_MAX_CHARS, chunk_text, normalize_whitespace};
pub use language::Language;
pub use pipeline::{PipelineStage, Progress, SpeechPipeline, SpeechSynthesis};
pub use playback::{Pcm, decode_mp3, decode_wav, play_mp3, play_wav};
pub use reassembly::reassemble;
pub use recorder::{
    CaptureError, CaptureThresholds, InputStream, Microphone, Recorder, RecorderState, Recording,
};
pub use retry::{Backoff, BackoffPolicy};
pub use synthesizer::{
    ChunkOutcome, ChunkSynthesizer, FailedChunk, SynthesisBackend, SynthesisReport,
    SynthesizedChunk,
};
pub use transcriber::{
    Normalizer, TranscriptionBackend, TranscriptionFailure, TranscriptionOutcome, Transcriber,
    normalize_transcript,
};
pub use translation::{TranslationBackend, language_pair};
