//! Recording capture and validation state machine
//!
//! ```text
//! Idle ──start──▶ Recording ──stop──▶ (validate) ──ok──▶ ReadyForReplay
//!  ▲                                      │                 │     │
//!  └────────────── error ─────────────────┘      discard ◀──┘     └──▶ submit
//! ```
//!
//! The microphone is held only while in `Recording`. Stopping always
//! releases it before validation runs, whatever the validation outcome.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::language::Language;
use super::transcriber::{Transcriber, TranscriptionOutcome};

/// Recorder state, as visible to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    ReadyForReplay,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::ReadyForReplay => "ready for replay",
        })
    }
}

/// Capture and validation failures, surfaced to the user as actionable messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Microphone access was refused by the OS or user
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// No usable input device
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(String),

    /// Clip shorter than the minimum duration
    #[error(
        "recording too short ({}ms, need at least {}ms)",
        duration.as_millis(),
        minimum.as_millis()
    )]
    TooShort { duration: Duration, minimum: Duration },

    /// Clip payload smaller than the minimum size
    #[error("recording too small ({bytes} bytes, need at least {minimum})")]
    TooSmall { bytes: usize, minimum: usize },

    /// Captured samples could not be encoded
    #[error("failed to encode recording: {0}")]
    Encoding(String),

    /// Operation invoked out of order
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: RecorderState,
    },
}

/// A captured audio clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    /// Encoded audio payload
    pub audio: Vec<u8>,
    /// Encoding tag (e.g. `audio/wav`)
    pub mime_type: String,
    /// Wall-clock capture duration
    pub duration: Duration,
}

/// Minimum clip size heuristics against empty or near-silent captures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureThresholds {
    pub min_duration: Duration,
    pub min_bytes: usize,
}

impl Default for CaptureThresholds {
    fn default() -> Self {
        Self {
            min_duration: Duration::from_millis(500),
            min_bytes: 1000,
        }
    }
}

impl CaptureThresholds {
    /// Check a clip against the thresholds; the duration rule is checked first
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::TooShort`] or [`CaptureError::TooSmall`]
    pub fn validate(&self, recording: &Recording) -> Result<(), CaptureError> {
        if recording.duration < self.min_duration {
            return Err(CaptureError::TooShort {
                duration: recording.duration,
                minimum: self.min_duration,
            });
        }

        self.validate_size(recording.audio.len())
    }

    /// Check only the payload size (uploads of unknown duration)
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::TooSmall`]
    pub const fn validate_size(&self, bytes: usize) -> Result<(), CaptureError> {
        if bytes < self.min_bytes {
            return Err(CaptureError::TooSmall {
                bytes,
                minimum: self.min_bytes,
            });
        }
        Ok(())
    }
}

/// An exclusive audio input that can be acquired for one recording at a time
pub trait Microphone {
    /// Live capture handle; dropping it releases the device
    type Stream: InputStream;

    /// Acquire the device and start capturing
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::PermissionDenied`] or [`CaptureError::DeviceUnavailable`]
    fn acquire(&mut self) -> Result<Self::Stream, CaptureError>;
}

/// A live capture started by [`Microphone::acquire`]
pub trait InputStream {
    /// Current input level as RMS amplitude in `0.0..=1.0`
    fn level(&self) -> f32;

    /// Time since capture started
    fn elapsed(&self) -> Duration;

    /// Stop capturing, release the device and return the clip
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Encoding`] if the samples cannot be encoded;
    /// the device is released either way
    fn finish(self) -> Result<Recording, CaptureError>;
}

enum State<S> {
    Idle,
    Recording(S),
    ReadyForReplay(Recording),
}

/// Drives one microphone through the record → validate → replay/submit cycle
pub struct Recorder<M: Microphone> {
    microphone: M,
    thresholds: CaptureThresholds,
    state: State<M::Stream>,
}

impl<M: Microphone> Recorder<M> {
    /// Create an idle recorder
    pub const fn new(microphone: M, thresholds: CaptureThresholds) -> Self {
        Self {
            microphone,
            thresholds,
            state: State::Idle,
        }
    }

    /// Current state
    pub const fn state(&self) -> RecorderState {
        match self.state {
            State::Idle => RecorderState::Idle,
            State::Recording(_) => RecorderState::Recording,
            State::ReadyForReplay(_) => RecorderState::ReadyForReplay,
        }
    }

    /// Start recording
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] unless idle, or the microphone's
    /// acquisition error (the recorder stays idle)
    pub fn start(&mut self) -> Result<(), CaptureError> {
        self.expect_state(RecorderState::Idle, "start recording")?;

        let stream = self.microphone.acquire().inspect_err(|e| {
            tracing::warn!(error = %e, "failed to acquire microphone");
        })?;

        tracing::debug!("recording started");
        self.state = State::Recording(stream);
        Ok(())
    }

    /// Live input level while recording
    pub fn level(&self) -> Option<f32> {
        match &self.state {
            State::Recording(stream) => Some(stream.level()),
            _ => None,
        }
    }

    /// Elapsed capture time while recording
    pub fn elapsed(&self) -> Option<Duration> {
        match &self.state {
            State::Recording(stream) => Some(stream.elapsed()),
            _ => None,
        }
    }

    /// Stop recording, release the microphone and validate the clip
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] unless recording, or the
    /// validation error (the recorder returns to idle)
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        self.expect_state(RecorderState::Recording, "stop recording")?;

        let State::Recording(stream) = std::mem::replace(&mut self.state, State::Idle) else {
            return Err(self.invalid("stop recording"));
        };

        let recording = stream.finish()?;
        tracing::debug!(
            bytes = recording.audio.len(),
            duration_ms = recording.duration.as_millis(),
            "recording stopped, microphone released"
        );

        if let Err(e) = self.thresholds.validate(&recording) {
            tracing::info!(error = %e, "recording rejected");
            return Err(e);
        }

        self.state = State::ReadyForReplay(recording);
        Ok(())
    }

    /// The validated clip awaiting replay or submission
    pub const fn recording(&self) -> Option<&Recording> {
        match &self.state {
            State::ReadyForReplay(recording) => Some(recording),
            _ => None,
        }
    }

    /// Throw the validated clip away
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] unless ready for replay
    pub fn discard(&mut self) -> Result<(), CaptureError> {
        self.take_recording("discard recording").map(drop)
    }

    /// Hand the validated clip over, returning to idle
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] unless ready for replay
    pub fn take(&mut self) -> Result<Recording, CaptureError> {
        self.take_recording("take recording")
    }

    /// Submit the validated clip for transcription
    ///
    /// The recorder is idle once this returns, whatever the transcription
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] unless ready for replay
    pub async fn submit(
        &mut self,
        transcriber: &Transcriber,
        language: Language,
    ) -> Result<TranscriptionOutcome, CaptureError> {
        let recording = self.take_recording("submit recording")?;
        Ok(transcriber.submit(&recording, language).await)
    }

    fn take_recording(&mut self, action: &'static str) -> Result<Recording, CaptureError> {
        self.expect_state(RecorderState::ReadyForReplay, action)?;

        match std::mem::replace(&mut self.state, State::Idle) {
            State::ReadyForReplay(recording) => Ok(recording),
            other => {
                self.state = other;
                Err(self.invalid(action))
            }
        }
    }

    fn expect_state(
        &self,
        wanted: RecorderState,
        action: &'static str,
    ) -> Result<(), CaptureError> {
        if self.state() == wanted {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    const fn invalid(&self, action: &'static str) -> CaptureError {
        CaptureError::InvalidState {
            action,
            state: self.state(),
        }
    }
}
