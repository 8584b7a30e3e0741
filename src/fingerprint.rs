//! C4: Hash Generator — combinatorial pairing of peaks into (hash, anchor_time)
//! fingerprints.

use crate::config::EngineConfig;
use crate::peaks::Peak;
use twox_hash::XxHash64;

use std::hash::Hasher;

/// A fingerprint produced against a known song, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub hash: String,
    pub anchor_time: i64,
    pub song_id: u32,
}

/// A fingerprint produced from a query clip, not yet associated with a song.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryFingerprint {
    pub hash: String,
    pub anchor_time: i64,
}

/// Deterministic 64-bit non-cryptographic hash of `(freq1, freq2, delta_t)`,
/// rendered as lowercase hex and truncated to `hash_reduction` characters.
///
/// Uses xxhash64 uniformly for ingest and query, per the single-hash-family
/// requirement — the deployment never mixes hash functions.
fn hash_peak_pair(freq1: usize, freq2: usize, delta_t: i64, hash_reduction: usize) -> String {
    let canonical = format!("{freq1}|{freq2}|{delta_t}");
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(canonical.as_bytes());
    let digest = hasher.finish();
    let hex = format!("{digest:016x}");
    hex.chars().take(hash_reduction).collect()
}

/// Generates fingerprints from a time-sorted peak list.
///
/// For each anchor peak at index `i`, pairs it with each of the next
/// `fan_value - 1` peaks. A pair is emitted only if its frame delta falls in
/// `[min_hash_dt, max_hash_dt]`. The peak list must already be sorted by
/// `time_frame` ascending, then `freq_bin` ascending — `pick_peaks` guarantees
/// this.
pub fn generate_fingerprints(peaks: &[Peak], song_id: u32, config: &EngineConfig) -> Vec<Fingerprint> {
    generate_query_fingerprints(peaks, config)
        .into_iter()
        .map(|q| Fingerprint {
            hash: q.hash,
            anchor_time: q.anchor_time,
            song_id,
        })
        .collect()
}

/// Same algorithm as [`generate_fingerprints`], but for an unassociated query
/// clip during recognition.
pub fn generate_query_fingerprints(peaks: &[Peak], config: &EngineConfig) -> Vec<QueryFingerprint> {
    let mut fingerprints = Vec::new();
    let n = peaks.len();

    for i in 0..n {
        let anchor = peaks[i];
        let last = (i + config.fan_value).min(n);

        for target in &peaks[(i + 1).min(n)..last] {
            let delta_t = target.time_frame as i64 - anchor.time_frame as i64;
            if delta_t < config.min_hash_dt || delta_t > config.max_hash_dt {
                continue;
            }

            let hash = hash_peak_pair(anchor.freq_bin, target.freq_bin, delta_t, config.hash_reduction);
            fingerprints.push(QueryFingerprint {
                hash,
                anchor_time: anchor.time_frame as i64,
            });
        }
    }

    fingerprints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(t: usize, f: usize) -> Peak {
        Peak {
            freq_bin: f,
            time_frame: t,
        }
    }

    #[test]
    fn hash_is_deterministic_across_calls() {
        let peaks = vec![peak(0, 10), peak(3, 20), peak(5, 30)];
        let cfg = EngineConfig::default();
        let a = generate_query_fingerprints(&peaks, &cfg);
        let b = generate_query_fingerprints(&peaks, &cfg);
        assert_eq!(a, b);
    }

    #[test]
    fn ingest_and_query_produce_identical_hashes_for_identical_peaks() {
        let peaks = vec![peak(0, 10), peak(3, 20), peak(5, 30)];
        let cfg = EngineConfig::default();
        let ingest = generate_fingerprints(&peaks, 7, &cfg);
        let query = generate_query_fingerprints(&peaks, &cfg);
        let ingest_hashes: Vec<&str> = ingest.iter().map(|f| f.hash.as_str()).collect();
        let query_hashes: Vec<&str> = query.iter().map(|f| f.hash.as_str()).collect();
        assert_eq!(ingest_hashes, query_hashes);
    }

    #[test]
    fn respects_delta_bounds() {
        let mut cfg = EngineConfig::default();
        cfg.min_hash_dt = 2;
        cfg.max_hash_dt = 3;
        cfg.fan_value = 10;

        // deltas: 1, 2, 3, 4 frames out from the anchor at t=0
        let peaks = vec![peak(0, 1), peak(1, 2), peak(2, 3), peak(3, 4), peak(4, 5)];
        let fps = generate_query_fingerprints(&peaks, &cfg);

        // only targets at t=2 (delta 2) and t=3 (delta 3) survive as pairs with anchor t=0
        let from_anchor_zero = fps.iter().filter(|f| f.anchor_time == 0).count();
        assert_eq!(from_anchor_zero, 2);
    }

    #[test]
    fn fan_value_caps_pairs_per_anchor() {
        let mut cfg = EngineConfig::default();
        cfg.fan_value = 3;
        cfg.max_hash_dt = 1000;

        let peaks: Vec<Peak> = (0..10).map(|t| peak(t, t + 1)).collect();
        let fps = generate_query_fingerprints(&peaks, &cfg);
        let from_anchor_zero = fps.iter().filter(|f| f.anchor_time == 0).count();
        assert_eq!(from_anchor_zero, 2); // fan_value - 1
    }
}
