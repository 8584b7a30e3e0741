//! C1: Decoder Adapter — consumes an audio artifact, returns mono PCM at a
//! fixed sample rate.
//!
//! The original codebase carried two parallel decode paths (`audio_processor.rs`
//! and `audio_processor/audio_processor.rs`) that diverged on how stereo was
//! downmixed and never converged on a single resample target. This module is
//! the single canonical replacement for both.

use crate::error::{EngineError, Result};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecRegistry, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::{Hint, Probe};
use symphonia::default;

pub struct DecoderAdapter {
    codec_registry: &'static CodecRegistry,
    format_options: FormatOptions,
    metadata_options: MetadataOptions,
    probe: &'static Probe,
}

impl Default for DecoderAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderAdapter {
    pub fn new() -> Self {
        Self {
            codec_registry: default::get_codecs(),
            format_options: FormatOptions::default(),
            metadata_options: MetadataOptions::default(),
            probe: symphonia::default::get_probe(),
        }
    }

    /// Decodes a file on disk into mono PCM at `target_sample_rate_hz`.
    pub fn decode_file<P: AsRef<Path>>(&self, path: P, target_sample_rate_hz: u32) -> Result<Vec<f32>> {
        let file = File::open(path.as_ref())
            .map_err(|e| EngineError::Decode(format!("could not open {:?}: {e}", path.as_ref())))?;
        self.decode_source(Box::new(file), target_sample_rate_hz)
    }

    /// Decodes an in-memory artifact into mono PCM at `target_sample_rate_hz`.
    pub fn decode_bytes(&self, bytes: Vec<u8>, target_sample_rate_hz: u32) -> Result<Vec<f32>> {
        self.decode_source(Box::new(Cursor::new(bytes)), target_sample_rate_hz)
    }

    fn decode_source(&self, source: Box<dyn MediaSource>, target_sample_rate_hz: u32) -> Result<Vec<f32>> {
        let track = MediaSourceStream::new(source, Default::default());

        let probed = self
            .probe
            .format(&Hint::new(), track, &self.format_options, &self.metadata_options)
            .map_err(|e| EngineError::Decode(format!("unrecognized container: {e}")))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .first()
            .ok_or_else(|| EngineError::Decode("no audio track found".into()))?;
        let codec_params = track.codec_params.clone();
        let source_sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| EngineError::Decode("unknown sample rate".into()))?;

        let mut decoder = self
            .codec_registry
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| EngineError::Decode(format!("unsupported codec: {e}")))?;

        let mut mono_samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => return Err(EngineError::Decode(format!("demux error: {e}"))),
            };

            let decoded = decoder
                .decode(&packet)
                .map_err(|e| EngineError::Decode(format!("decode error: {e}")))?;
            let num_channels = decoded.spec().channels.count();

            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
            sample_buf.copy_interleaved_ref(decoded);

            for frame in sample_buf.samples().chunks(num_channels) {
                let mono = frame.iter().sum::<f32>() / num_channels as f32;
                mono_samples.push(mono);
            }
        }

        if mono_samples.is_empty() {
            return Err(EngineError::Decode("no samples decoded".into()));
        }

        Ok(resample_linear(&mono_samples, source_sample_rate, target_sample_rate_hz))
    }
}

/// Linear-interpolation resampler.
///
/// A polyphase or windowed-sinc resampler would alias less, but no crate in
/// the reference stack happens to be wired in for that; linear interpolation
/// is adequate since the fingerprinting pipeline only cares about peaks in
/// the 20 Hz - 5 kHz band, well under the Nyquist rate of any supported
/// source.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let new_len = (samples.len() as f64 / ratio) as usize;
    let mut resampled = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let pos = i as f64 * ratio;
        let idx = pos.floor() as usize;
        let frac = pos.fract() as f32;

        if idx + 1 < samples.len() {
            let p1 = samples[idx];
            let p2 = samples[idx + 1];
            resampled.push(p1 + frac * (p2 - p1));
        } else if idx < samples.len() {
            resampled.push(samples[idx]);
        } else {
            break;
        }
    }

    resampled
}
