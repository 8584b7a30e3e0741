//! Explicit, serializable engine configuration.
//!
//! Replaces the ambient module-wide settings the original Django app read
//! fingerprinting parameters from (`settings.DEFAULT_FS`, and so on) with a
//! single value threaded through every constructor. There is no mutable
//! global here — a deployment builds one `EngineConfig` (optionally loaded
//! from TOML/JSON by the CLI layer) and passes it by reference.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Decoder output sample rate, in Hz.
    pub sample_rate_hz: u32,
    /// STFT window size in samples. Must be a power of two.
    pub window_size: usize,
    /// Fraction of each window that overlaps the next, in `[0, 1)`.
    pub overlap_ratio: f32,
    /// Number of subsequent peaks paired with each anchor peak.
    pub fan_value: usize,
    /// Minimum peak amplitude, in dB, to be considered a constellation point.
    pub amp_min: f32,
    /// Peak-picker neighborhood radius, in bins/frames.
    pub peak_neighborhood: usize,
    /// Minimum accepted `Δt` between anchor and target peak, in frames.
    pub min_hash_dt: i64,
    /// Maximum accepted `Δt` between anchor and target peak, in frames.
    pub max_hash_dt: i64,
    /// Number of hex characters the 64-bit hash is truncated to.
    pub hash_reduction: usize,
    /// Minimum vote count for a positive match.
    pub min_match_count: u64,
    /// Minimum input confidence (0–100) for a positive match.
    pub min_input_conf: f64,
    /// Minimum DB confidence (0–100) for a positive match.
    pub min_db_conf: f64,
    /// Aggregation window, in minutes, looked back from `now`.
    pub aggregation_window_minutes: i64,
    /// Minimum span, in seconds, for a group to become a play session.
    pub min_session_seconds: i64,
    /// Royalty rate, in currency units per minute of airplay.
    pub royalty_rate_per_minute: f64,
    /// Wall-clock budget for a single `recognize` call.
    pub recognize_timeout: std::time::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44_100,
            window_size: 4096,
            overlap_ratio: 0.5,
            fan_value: 15,
            amp_min: -20.0,
            peak_neighborhood: 10,
            min_hash_dt: 0,
            max_hash_dt: 200,
            hash_reduction: 20,
            min_match_count: 50,
            min_input_conf: 20.0,
            min_db_conf: 5.0,
            aggregation_window_minutes: 3,
            min_session_seconds: 30,
            royalty_rate_per_minute: 0.10,
            recognize_timeout: std::time::Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Hop size in samples derived from `window_size` and `overlap_ratio`.
    pub fn hop_size(&self) -> usize {
        ((self.window_size as f32) * (1.0 - self.overlap_ratio)).round() as usize
    }

    /// Seconds represented by one spectrogram frame.
    pub fn frame_seconds(&self) -> f64 {
        self.hop_size() as f64 / self.sample_rate_hz as f64
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.window_size.is_power_of_two() {
            return Err(crate::error::EngineError::InvalidConfig(format!(
                "window_size {} must be a power of two",
                self.window_size
            )));
        }
        if !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(crate::error::EngineError::InvalidConfig(format!(
                "overlap_ratio {} must be in [0, 1)",
                self.overlap_ratio
            )));
        }
        if self.fan_value == 0 {
            return Err(crate::error::EngineError::InvalidConfig(
                "fan_value must be at least 1".into(),
            ));
        }
        if self.min_hash_dt > self.max_hash_dt {
            return Err(crate::error::EngineError::InvalidConfig(format!(
                "min_hash_dt {} exceeds max_hash_dt {}",
                self.min_hash_dt, self.max_hash_dt
            )));
        }
        Ok(())
    }
}
