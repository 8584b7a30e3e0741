pub mod complex;

use complex::Complex;
use std::f32::consts::PI;

/// A radix-2 Cooley-Tukey FFT over a power-of-two-sized buffer.
///
/// `window_size` must be a power of two; the spectrogram engine enforces
/// this via `EngineConfig::validate`.
pub struct CooleyTukeyFft {
    window_size: usize,
}

impl CooleyTukeyFft {
    pub fn new(window_size: usize) -> Self {
        assert!(
            window_size.is_power_of_two(),
            "window size must be a power of two for this implementation to work"
        );
        Self { window_size }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Applies a Hann window to a chunk of raw samples.
    pub fn apply_hann_window(&self, chunk: &[f32]) -> Vec<f32> {
        let n = chunk.len();
        chunk
            .iter()
            .enumerate()
            .map(|(i, &sample)| {
                let num = 2.0 * PI * (i as f32);
                let denom = (n as f32) - 1.0;
                let multiplier = 0.5 * (1.0 - (num / denom).cos());
                sample * multiplier
            })
            .collect()
    }

    /// Runs the in-place radix-2 Cooley-Tukey transform.
    ///
    /// P(ω)  = Pₑ(ω²) + ω·Pₒ(ω²)
    /// P(-ω) = Pₑ(ω²) - ω·Pₒ(ω²)
    /// where ω = e^{-i2πk/n}.
    fn transform(&self, buf: &mut [Complex]) {
        let n = buf.len();
        if n <= 1 {
            return;
        }

        let mut even: Vec<Complex> = Vec::with_capacity(n / 2);
        let mut odd: Vec<Complex> = Vec::with_capacity(n / 2);
        for (i, &sample) in buf.iter().enumerate() {
            if i % 2 == 0 {
                even.push(sample);
            } else {
                odd.push(sample);
            }
        }

        self.transform(&mut even);
        self.transform(&mut odd);

        for j in 0..n / 2 {
            let theta = (2.0 * PI * (j as f32)) / (n as f32);
            let omega = Complex::from_polar(1.0, -theta);
            buf[j] = even[j] + (omega * odd[j]);
            buf[j + n / 2] = even[j] - (omega * odd[j]);
        }
    }

    /// Windows and transforms one chunk of real samples, returning the full
    /// complex spectrum (length `window_size`).
    pub fn transform_frame(&self, chunk: &[f32]) -> Vec<Complex> {
        let windowed = self.apply_hann_window(chunk);
        let mut complex_buf: Vec<Complex> = windowed.iter().map(|&s| Complex::new(s, 0.0)).collect();
        self.transform(&mut complex_buf);
        complex_buf
    }
}
