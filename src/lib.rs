//! Audio recognition core for a radio-play monitoring system.
//!
//! Three coupled pieces make up the core:
//!
//! - fingerprinting: decode → spectrogram → peak-pick → hash ([`decoder`],
//!   [`spectrogram`], [`peaks`], [`fingerprint`])
//! - matching: offset-histogram voting against a [`store::FingerprintStore`]
//!   plus a confidence gate ([`matcher`])
//! - play-session aggregation: collapsing [`store::MatchCacheStore`] entries
//!   into [`model::PlaySession`] rows ([`aggregator`])
//!
//! Everything HTTP-, auth-, or persistence-detail-shaped is an external
//! collaborator's concern; this crate exposes plain functions and traits.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fft;
pub mod fingerprint;
pub mod matcher;
pub mod model;
pub mod peaks;
pub mod schema;
pub mod spectrogram;
pub mod store;
pub mod tester;
pub mod visualization;

use config::EngineConfig;
use error::{EngineError, Result};
use model::{IngestReport, MatchOutcome};
use std::time::Instant;
use store::FingerprintStore;

/// `ingest(song_id, audio_bytes) -> IngestReport`
///
/// Decodes, fingerprints, and atomically bulk-inserts one song's
/// fingerprints. Errors with [`EngineError::DuplicateSong`] if the song is
/// already indexed — ingest never silently merges into an existing song.
pub fn ingest(
    song_id: u32,
    audio_bytes: Vec<u8>,
    store: &mut dyn FingerprintStore,
    config: &EngineConfig,
) -> Result<IngestReport> {
    if store.song_exists(song_id)? {
        return Err(EngineError::DuplicateSong(song_id));
    }

    let decoder = decoder::DecoderAdapter::new();
    let samples = decoder.decode_bytes(audio_bytes, config.sample_rate_hz)?;
    let duration_seconds = samples.len() as f64 / config.sample_rate_hz as f64;

    let spectrogram = spectrogram::build_spectrogram(&samples, config.sample_rate_hz, config);
    let peaks = peaks::pick_peaks(&spectrogram, config);
    let fingerprints = fingerprint::generate_fingerprints(&peaks, song_id, config);

    let fingerprints_written = store.bulk_insert(&fingerprints)?;

    tracing::info!(song_id, fingerprints_written, duration_seconds, "ingested song");

    Ok(IngestReport {
        song_id,
        fingerprints_written,
        duration_seconds,
    })
}

/// `recognize(audio_bytes) -> MatchOutcome`
///
/// Always returns a [`MatchOutcome`], positive or negative — never an error
/// for "no match found". Returns [`EngineError::Timeout`] if the pipeline
/// does not finish within `config.recognize_timeout`.
pub fn recognize(
    audio_bytes: Vec<u8>,
    store: &mut dyn FingerprintStore,
    config: &EngineConfig,
) -> Result<MatchOutcome> {
    let budget_start = Instant::now();

    let decoder = decoder::DecoderAdapter::new();
    let samples = match decoder.decode_bytes(audio_bytes, config.sample_rate_hz) {
        Ok(samples) => samples,
        Err(EngineError::Decode(_)) => {
            return Ok(MatchOutcome::Negative {
                reason: model::NegativeReason::NoFingerprintsExtracted,
            });
        }
        Err(e) => return Err(e),
    };

    let fingerprint_start = Instant::now();
    let spectrogram = spectrogram::build_spectrogram(&samples, config.sample_rate_hz, config);
    let query_peaks = peaks::pick_peaks(&spectrogram, config);
    let query_fingerprints = fingerprint::generate_query_fingerprints(&query_peaks, config);
    let fingerprint_ms = fingerprint_start.elapsed().as_secs_f64() * 1000.0;

    if budget_start.elapsed() > config.recognize_timeout {
        return Err(EngineError::Timeout(config.recognize_timeout));
    }

    let query_start = Instant::now();
    let outcome = matcher::recognize_fingerprints(
        &query_fingerprints,
        store,
        config,
        0.0,
        fingerprint_ms,
        0.0,
    )?;
    let query_ms = query_start.elapsed().as_secs_f64() * 1000.0;

    if budget_start.elapsed() > config.recognize_timeout {
        return Err(EngineError::Timeout(config.recognize_timeout));
    }

    let total_ms = budget_start.elapsed().as_secs_f64() * 1000.0;
    let outcome = match outcome {
        MatchOutcome::Positive(mut m) => {
            m.total_ms = total_ms;
            m.query_ms = query_ms;
            MatchOutcome::Positive(m)
        }
        negative => negative,
    };

    tracing::info!(?outcome, total_ms, fingerprint_ms, query_ms, "recognition complete");

    Ok(outcome)
}

/// `record_match(song_id, station_id, matched_at)` — see [`cache::record_match`].
pub use cache::record_match;

/// `run_aggregation(now) -> [PlaySession]` — see [`aggregator::run_aggregation`].
pub use aggregator::run_aggregation;

#[cfg(test)]
mod tests {
    use super::*;
    use store::memory::InMemoryFingerprintStore;

    fn sine_wave(freq_hz: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut buf, spec).unwrap();
            for &s in samples {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        buf.into_inner()
    }

    fn sweep(sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let freq = 200.0 + (4000.0 - 200.0) * (t / seconds);
                (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn duplicate_song_id_is_rejected() {
        let mut store = InMemoryFingerprintStore::new();
        let cfg = EngineConfig::default();
        let samples = sine_wave(440.0, cfg.sample_rate_hz, 2.0);
        let bytes = wav_bytes(&samples, cfg.sample_rate_hz);

        ingest(1, bytes.clone(), &mut store, &cfg).unwrap();
        let second = ingest(1, bytes, &mut store, &cfg);
        assert!(matches!(second, Err(EngineError::DuplicateSong(1))));
    }

    #[test]
    fn recognizing_the_ingested_clip_matches_with_near_zero_offset() {
        let cfg = EngineConfig::default();
        let samples = sweep(cfg.sample_rate_hz, 30.0);
        let bytes = wav_bytes(&samples, cfg.sample_rate_hz);

        let mut store = InMemoryFingerprintStore::new();
        let report = ingest(1, bytes.clone(), &mut store, &cfg).unwrap();
        assert!(report.fingerprints_written > 0);

        let outcome = recognize(bytes, &mut store, &cfg).unwrap();
        match outcome {
            MatchOutcome::Positive(m) => {
                assert_eq!(m.song_id, 1);
                assert!(m.offset_frames.abs() <= 1);
                assert!(m.input_conf >= 95.0);
            }
            other => panic!("expected a positive match, got {other:?}"),
        }
    }

    #[test]
    fn recognizing_a_slice_reports_its_starting_offset() {
        let cfg = EngineConfig::default();
        let full = sweep(cfg.sample_rate_hz, 30.0);
        let bytes = wav_bytes(&full, cfg.sample_rate_hz);

        let mut store = InMemoryFingerprintStore::new();
        ingest(1, bytes, &mut store, &cfg).unwrap();

        let start_sample = (12.0 * cfg.sample_rate_hz as f64) as usize;
        let slice = &full[start_sample..start_sample + cfg.sample_rate_hz as usize * 10];
        let slice_bytes = wav_bytes(slice, cfg.sample_rate_hz);

        let outcome = recognize(slice_bytes, &mut store, &cfg).unwrap();
        match outcome {
            MatchOutcome::Positive(m) => {
                assert!((m.offset_seconds - 12.0).abs() <= 0.05);
            }
            other => panic!("expected a positive match, got {other:?}"),
        }
    }

    #[test]
    fn white_noise_against_a_known_song_does_not_match() {
        let cfg = EngineConfig::default();
        let song = sweep(cfg.sample_rate_hz, 30.0);
        let song_bytes = wav_bytes(&song, cfg.sample_rate_hz);

        let mut store = InMemoryFingerprintStore::new();
        ingest(1, song_bytes, &mut store, &cfg).unwrap();

        let mut rng_state: u32 = 12345;
        let mut next = || {
            rng_state = rng_state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (rng_state as f32 / u32::MAX as f32) * 2.0 - 1.0
        };
        let noise: Vec<f32> = (0..cfg.sample_rate_hz as usize * 10).map(|_| next()).collect();
        let noise_bytes = wav_bytes(&noise, cfg.sample_rate_hz);

        let outcome = recognize(noise_bytes, &mut store, &cfg).unwrap();
        assert!(matches!(outcome, MatchOutcome::Negative { .. }));
    }

    #[test]
    fn unrecognizable_audio_is_a_negative_outcome_not_an_error() {
        let cfg = EngineConfig::default();
        let mut store = InMemoryFingerprintStore::new();

        let outcome = recognize(b"not a real audio container".to_vec(), &mut store, &cfg).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Negative {
                reason: model::NegativeReason::NoFingerprintsExtracted
            }
        );
    }
}
