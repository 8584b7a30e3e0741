//! C2: Spectrogram Engine — windowed STFT → log-magnitude time/frequency matrix.

use crate::config::EngineConfig;
use crate::fft::CooleyTukeyFft;

/// Log-magnitude (dB) spectrogram, indexed `frames[t][f]`.
///
/// `f` ranges over `[0, window_size / 2)`; `t` ranges over
/// `[0, floor((N - window_size) / hop))]`.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub num_bins: usize,
    pub sample_rate_hz: u32,
    pub hop_size: usize,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn get(&self, freq_bin: usize, time_frame: usize) -> f32 {
        self.frames[time_frame][freq_bin]
    }

    /// Converts a frequency bin index into Hz for this spectrogram.
    pub fn bin_to_hz(&self, freq_bin: usize) -> f32 {
        freq_bin as f32 * (self.sample_rate_hz as f32 / (self.num_bins as f32 * 2.0))
    }

    /// Converts a time frame index into seconds since the start of the clip.
    pub fn frame_to_seconds(&self, time_frame: usize) -> f64 {
        (time_frame * self.hop_size) as f64 / self.sample_rate_hz as f64
    }
}

/// Floor, in dB, substituted for a zero-magnitude bin so the matrix never
/// holds `-inf`. Chosen well below `amp_min` so it never registers as a peak.
const MAGNITUDE_FLOOR_DB: f32 = -160.0;

/// Builds a log-magnitude spectrogram from mono PCM samples.
///
/// Uses a fixed magnitude→dB mapping (no per-clip renormalization) so the
/// same audio produces the same dB values whether it is being ingested or
/// queried, per the consistency requirement on the Spectrogram Engine.
pub fn build_spectrogram(samples: &[f32], sample_rate_hz: u32, config: &EngineConfig) -> Spectrogram {
    let window_size = config.window_size;
    let hop = config.hop_size();
    let fft = CooleyTukeyFft::new(window_size);
    let num_bins = window_size / 2;

    let mut frames = Vec::new();
    let mut position = 0usize;

    while position + window_size <= samples.len() {
        let chunk = &samples[position..position + window_size];
        let spectrum = fft.transform_frame(chunk);

        let mut frame = Vec::with_capacity(num_bins);
        for bin in &spectrum[..num_bins] {
            let magnitude = bin.norm_sqr().sqrt();
            let db = if magnitude > 0.0 {
                20.0 * magnitude.log10()
            } else {
                MAGNITUDE_FLOOR_DB
            };
            frame.push(db.max(MAGNITUDE_FLOOR_DB));
        }
        frames.push(frame);

        position += hop;
    }

    Spectrogram {
        frames,
        num_bins,
        sample_rate_hz,
        hop_size: hop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_wave(freq_hz: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn pure_tone_concentrates_energy_near_its_bin() {
        let cfg = EngineConfig::default();
        let samples = sine_wave(1000.0, cfg.sample_rate_hz, 1.0);
        let spec = build_spectrogram(&samples, cfg.sample_rate_hz, &cfg);
        assert!(spec.num_frames() > 0);

        let expected_bin = (1000.0 / (cfg.sample_rate_hz as f32 / cfg.window_size as f32)).round() as usize;
        let frame = &spec.frames[spec.num_frames() / 2];
        let (loudest_bin, _) = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();

        assert!((loudest_bin as isize - expected_bin as isize).abs() <= 1);
    }

    #[test]
    fn silence_never_produces_negative_infinity() {
        let cfg = EngineConfig::default();
        let samples = vec![0.0f32; cfg.window_size * 3];
        let spec = build_spectrogram(&samples, cfg.sample_rate_hz, &cfg);
        for frame in &spec.frames {
            for &db in frame {
                assert!(db.is_finite());
            }
        }
    }

    #[test]
    fn build_is_deterministic() {
        let cfg = EngineConfig::default();
        let samples = sine_wave(440.0, cfg.sample_rate_hz, 0.5);
        let a = build_spectrogram(&samples, cfg.sample_rate_hz, &cfg);
        let b = build_spectrogram(&samples, cfg.sample_rate_hz, &cfg);
        assert_eq!(a.frames, b.frames);
    }
}
