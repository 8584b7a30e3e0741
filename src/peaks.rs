//! C3: Peak Picker — sparse local-maxima constellation extraction.

use crate::config::EngineConfig;
use crate::spectrogram::Spectrogram;

/// A single constellation point: a frequency bin paired with a time frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    pub freq_bin: usize,
    pub time_frame: usize,
}

/// Extracts the constellation: cells that are strictly the loudest point in
/// their `(2ρ+1)×(2ρ+1)` neighborhood and clear `amp_min`.
///
/// Boundary cells within `ρ` of any edge are excluded, since they have no
/// full neighborhood to compare against. The result is sorted by `time_frame`
/// ascending, then `freq_bin` ascending — hash generation depends on this
/// order.
pub fn pick_peaks(spectrogram: &Spectrogram, config: &EngineConfig) -> Vec<Peak> {
    let rho = config.peak_neighborhood;
    let amp_min = config.amp_min;
    let num_frames = spectrogram.num_frames();
    let num_bins = spectrogram.num_bins;

    if num_frames <= 2 * rho || num_bins <= 2 * rho {
        return Vec::new();
    }

    let mut peaks = Vec::new();

    for t in rho..(num_frames - rho) {
        for f in rho..(num_bins - rho) {
            let value = spectrogram.get(f, t);
            if value <= amp_min {
                continue;
            }

            let mut is_peak = true;
            'neighborhood: for dt in 0..=(2 * rho) {
                let nt = t + dt - rho;
                for df in 0..=(2 * rho) {
                    let nf = f + df - rho;
                    if nt == t && nf == f {
                        continue;
                    }
                    if spectrogram.get(nf, nt) >= value {
                        is_peak = false;
                        break 'neighborhood;
                    }
                }
            }

            if is_peak {
                peaks.push(Peak {
                    freq_bin: f,
                    time_frame: t,
                });
            }
        }
    }

    peaks.sort_by(|a, b| a.time_frame.cmp(&b.time_frame).then(a.freq_bin.cmp(&b.freq_bin)));
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_spectrogram(num_frames: usize, num_bins: usize, floor: f32) -> Spectrogram {
        Spectrogram {
            frames: vec![vec![floor; num_bins]; num_frames],
            num_bins,
            sample_rate_hz: 44_100,
            hop_size: 2048,
        }
    }

    #[test]
    fn single_spike_is_the_only_peak() {
        let mut cfg = EngineConfig::default();
        cfg.peak_neighborhood = 2;
        cfg.amp_min = -20.0;

        let mut spec = flat_spectrogram(10, 10, -30.0);
        spec.frames[5][5] = 10.0;

        let peaks = pick_peaks(&spec, &cfg);
        assert_eq!(peaks, vec![Peak { freq_bin: 5, time_frame: 5 }]);
    }

    #[test]
    fn below_amp_min_is_excluded() {
        let mut cfg = EngineConfig::default();
        cfg.peak_neighborhood = 2;
        cfg.amp_min = 0.0;

        let mut spec = flat_spectrogram(10, 10, -30.0);
        spec.frames[5][5] = -10.0; // a local max, but under amp_min

        let peaks = pick_peaks(&spec, &cfg);
        assert!(peaks.is_empty());
    }

    #[test]
    fn boundary_spike_is_excluded() {
        let mut cfg = EngineConfig::default();
        cfg.peak_neighborhood = 2;
        cfg.amp_min = -20.0;

        let mut spec = flat_spectrogram(10, 10, -30.0);
        spec.frames[0][0] = 10.0; // inside the excluded border

        let peaks = pick_peaks(&spec, &cfg);
        assert!(peaks.is_empty());
    }

    #[test]
    fn ties_are_excluded_by_strict_inequality() {
        let mut cfg = EngineConfig::default();
        cfg.peak_neighborhood = 1;
        cfg.amp_min = -20.0;

        let mut spec = flat_spectrogram(6, 6, -30.0);
        spec.frames[3][3] = 5.0;
        spec.frames[3][4] = 5.0; // tie with a neighbor, neither is strictly greatest

        let peaks = pick_peaks(&spec, &cfg);
        assert!(peaks.is_empty());
    }

    #[test]
    fn output_is_sorted_by_time_then_frequency() {
        let mut cfg = EngineConfig::default();
        cfg.peak_neighborhood = 1;
        cfg.amp_min = -20.0;

        let mut spec = flat_spectrogram(8, 8, -30.0);
        spec.frames[5][6] = 5.0;
        spec.frames[2][3] = 5.0;
        spec.frames[2][1] = 5.0;

        let peaks = pick_peaks(&spec, &cfg);
        let ordered: Vec<(usize, usize)> = peaks.iter().map(|p| (p.time_frame, p.freq_bin)).collect();
        assert_eq!(ordered, vec![(2, 1), (2, 3), (5, 6)]);
    }
}
