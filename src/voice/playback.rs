//! Audio playback to speakers

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Decoded mono PCM ready for output
#[derive(Debug, Clone, PartialEq)]
pub struct Pcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Play MP3 audio (synthesis output) on the default output device
///
/// # Errors
///
/// Returns error if decoding or playback fails
pub async fn play_mp3(data: Vec<u8>) -> Result<()> {
    tokio::task::spawn_blocking(move || play_blocking(&decode_mp3(&data)?))
        .await
        .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
}

/// Play WAV audio (a captured recording) on the default output device
///
/// # Errors
///
/// Returns error if decoding or playback fails
pub async fn play_wav(data: Vec<u8>) -> Result<()> {
    tokio::task::spawn_blocking(move || play_blocking(&decode_wav(&data)?))
        .await
        .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
}

fn play_blocking(pcm: &Pcm) -> Result<()> {
    if pcm.samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let config = output_config(&device, pcm.sample_rate)?;
    let channels = usize::from(config.channels.max(1));

    let samples: Arc<[f32]> = Arc::from(pcm.samples.as_slice());
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);
        device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let pos = position.load(Ordering::Relaxed);
                        let sample = samples.get(pos).copied().unwrap_or_else(|| {
                            finished.store(true, Ordering::Relaxed);
                            0.0
                        });
                        frame.fill(sample);
                        if pos < samples.len() {
                            position.store(pos + 1, Ordering::Relaxed);
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?
    };

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let length = playback_length(pcm);
    let deadline = Instant::now() + length + Duration::from_millis(500);
    while !finished.load(Ordering::Relaxed) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    // let the device drain its last buffer
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    tracing::debug!(
        samples = samples.len(),
        duration_ms = length.as_millis(),
        "playback complete"
    );

    Ok(())
}

/// Mono at the source rate if possible, else stereo, else the device default
fn output_config(device: &cpal::Device, sample_rate: u32) -> Result<StreamConfig> {
    let rate = SampleRate(sample_rate);
    let supports = |c: &cpal::SupportedStreamConfigRange, channels: u16| {
        c.channels() == channels
            && c.sample_format() == cpal::SampleFormat::F32
            && c.min_sample_rate() <= rate
            && c.max_sample_rate() >= rate
    };

    for channels in [1, 2] {
        let found = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| supports(c, channels));
        if let Some(config) = found {
            return Ok(config.with_sample_rate(rate).config());
        }
    }

    tracing::warn!(sample_rate, "device does not support source rate, using default");
    device
        .default_output_config()
        .map(|c| c.config())
        .map_err(|e| Error::Audio(e.to_string()))
}

fn playback_length(pcm: &Pcm) -> Duration {
    let rate = u64::from(pcm.sample_rate.max(1));
    Duration::from_millis(pcm.samples.len() as u64 * 1000 / rate)
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the payload is not decodable MP3
pub fn decode_mp3(data: &[u8]) -> Result<Pcm> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut samples = Vec::new();
    let mut sample_rate = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = u32::try_from(frame.sample_rate).unwrap_or(sample_rate);
                let channels = frame.channels.max(1);
                #[allow(clippy::cast_precision_loss)]
                samples.extend(frame.data.chunks(channels).map(|pair| {
                    pair.iter().map(|&s| f32::from(s) / 32768.0).sum::<f32>() / pair.len() as f32
                }));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if sample_rate == 0 {
        return Err(Error::Audio("MP3 payload contained no frames".to_string()));
    }

    Ok(Pcm {
        samples,
        sample_rate,
    })
}

/// Decode 16-bit PCM WAV bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the payload is not a readable WAV file
pub fn decode_wav(data: &[u8]) -> Result<Pcm> {
    let mut reader =
        hound::WavReader::new(Cursor::new(data)).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved = reader
        .samples::<i16>()
        .map(|s| s.map(|v| f32::from(v) / 32768.0))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Audio(e.to_string()))?;

    #[allow(clippy::cast_precision_loss)]
    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(Pcm {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::samples_to_wav;

    #[test]
    fn wav_round_trips_through_decoder() {
        let wav = samples_to_wav(&[0.0, 0.5, -0.5, 0.25], 16000).unwrap();
        let pcm = decode_wav(&wav).unwrap();

        assert_eq!(pcm.sample_rate, 16000);
        assert_eq!(pcm.samples.len(), 4);
        assert!((pcm.samples[1] - 0.5).abs() < 1e-3);
        assert!((pcm.samples[2] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn garbage_is_not_wav() {
        assert!(matches!(decode_wav(b"not a wav"), Err(Error::Audio(_))));
    }

    #[test]
    fn garbage_is_not_mp3() {
        assert!(matches!(decode_mp3(&[0u8; 64]), Err(Error::Audio(_))));
    }

    #[test]
    fn playback_length_from_rate() {
        let pcm = Pcm {
            samples: vec![0.0; 24000],
            sample_rate: 24000,
        };
        assert_eq!(playback_length(&pcm), Duration::from_secs(1));
    }
}
