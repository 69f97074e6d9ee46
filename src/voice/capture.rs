//! Microphone capture on the default input device

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use super::recorder::{CaptureError, InputStream, Microphone, Recording};

/// Preferred capture rate (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// MIME type of recordings produced by [`CpalMicrophone`]
pub const WAV_MIME: &str = "audio/wav";

/// The system's default input device, opened through cpal
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Microphone for CpalMicrophone {
    type Stream = CpalInputStream;

    fn acquire(&mut self) -> Result<CpalInputStream, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no input device available".into()))?;

        let config = input_config(&device)?;
        let channels = usize::from(config.channels.max(1));
        let sample_rate = config.sample_rate.0;

        let samples = Arc::new(Mutex::new(Vec::new()));
        let level = Arc::new(AtomicU32::new(0));

        let stream = {
            let samples = Arc::clone(&samples);
            let level = Arc::clone(&level);
            device
                .build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let mono = downmix(data, channels);
                        level.store(rms_level(&mono).to_bits(), Ordering::Relaxed);
                        if let Ok(mut buf) = samples.lock() {
                            buf.extend_from_slice(&mono);
                        }
                    },
                    |err| {
                        tracing::error!(error = %err, "audio capture error");
                    },
                    None,
                )
                .map_err(|e| classify(e.to_string()))?
        };

        stream.play().map_err(|e| classify(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels,
            "microphone acquired"
        );

        Ok(CpalInputStream {
            stream,
            samples,
            level,
            sample_rate,
            started: Instant::now(),
        })
    }
}

/// A live cpal capture; dropping it stops the stream and frees the device
pub struct CpalInputStream {
    stream: Stream,
    samples: Arc<Mutex<Vec<f32>>>,
    level: Arc<AtomicU32>,
    sample_rate: u32,
    started: Instant,
}

impl InputStream for CpalInputStream {
    fn level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Relaxed))
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn finish(self) -> Result<Recording, CaptureError> {
        let duration = self.started.elapsed();
        let Self {
            stream,
            samples,
            sample_rate,
            ..
        } = self;
        drop(stream);
        tracing::debug!("microphone released");

        let samples = samples
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();

        Ok(Recording {
            audio: samples_to_wav(&samples, sample_rate)?,
            mime_type: WAV_MIME.to_string(),
            duration,
        })
    }
}

/// Prefer mono at [`SAMPLE_RATE`], otherwise the device default
fn input_config(device: &cpal::Device) -> Result<StreamConfig, CaptureError> {
    let preferred = device
        .supported_input_configs()
        .map_err(|e| classify(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.sample_format() == cpal::SampleFormat::F32
                && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        });

    if let Some(config) = preferred {
        return Ok(config.with_sample_rate(SampleRate(SAMPLE_RATE)).config());
    }

    device
        .default_input_config()
        .map(|c| c.config())
        .map_err(|e| classify(e.to_string()))
}

/// Map a cpal error message onto the capture taxonomy
fn classify(detail: String) -> CaptureError {
    let lower = detail.to_lowercase();
    if ["permission", "denied", "not authorized", "not permitted"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        CaptureError::PermissionDenied(detail)
    } else {
        CaptureError::DeviceUnavailable(detail)
    }
}

fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    #[allow(clippy::cast_precision_loss)]
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Root-mean-square amplitude of `samples`, clamped to `0.0..=1.0`
#[must_use]
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean_square = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean_square.sqrt().clamp(0.0, 1.0)
}

/// Encode f32 samples as 16-bit mono WAV
///
/// # Errors
///
/// Returns [`CaptureError::Encoding`] if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, CaptureError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let encoding = |e: hound::Error| CaptureError::Encoding(e.to_string());

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(encoding)?;
        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let pcm = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(pcm).map_err(encoding)?;
        }
        writer.finalize().map_err(encoding)?;
    }

    Ok(cursor.into_inner())
}
