//! C6: Matcher — query hashes → candidate songs ranked by offset-histogram
//! mode. C7: Confidence Gate — thresholds that turn a vote tally into a
//! `MatchOutcome`.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::fingerprint::QueryFingerprint;
use crate::model::{MatchOutcome, MatchResult, NegativeReason};
use crate::store::FingerprintStore;
use std::collections::HashMap;

/// The winning `(song_id, offset)` vote tally, before the confidence gate is
/// applied.
#[derive(Debug, Clone, PartialEq)]
struct Winner {
    song_id: u32,
    offset_frames: i64,
    votes: u64,
}

/// Runs the offset-histogram vote over every index row matching the query's
/// hashes.
///
/// This is `O(M)` in the number of matched rows `M`, not `O(|Q| * rows)`: each
/// query fingerprint is paired only with the index rows that share its exact
/// hash, via one bulk lookup.
fn vote(
    query: &[QueryFingerprint],
    index_hits: &HashMap<String, Vec<(u32, i64)>>,
) -> HashMap<(u32, i64), u64> {
    let mut histogram: HashMap<(u32, i64), u64> = HashMap::new();

    for q in query {
        if let Some(rows) = index_hits.get(&q.hash) {
            for &(song_id, db_anchor_time) in rows {
                let delta = db_anchor_time - q.anchor_time;
                *histogram.entry((song_id, delta)).or_default() += 1;
            }
        }
    }

    histogram
}

fn winner(histogram: &HashMap<(u32, i64), u64>) -> Option<Winner> {
    histogram
        .iter()
        .max_by(|a, b| {
            // highest vote count wins; ties broken by higher song_id, then higher offset
            a.1.cmp(b.1).then((a.0 .0).cmp(&b.0 .0)).then((a.0 .1).cmp(&b.0 .1))
        })
        .map(|(&(song_id, offset_frames), &votes)| Winner {
            song_id,
            offset_frames,
            votes,
        })
}

/// Recognizes a query clip's fingerprints against the index, returning a
/// `MatchOutcome` that has already passed through the confidence gate.
///
/// `fingerprint_ms` and `query_ms` are supplied by the caller (typically the
/// `recognize` orchestration function) so this function stays a pure
/// computation over its inputs plus one index read.
pub fn recognize_fingerprints(
    query: &[QueryFingerprint],
    store: &mut dyn FingerprintStore,
    config: &EngineConfig,
    total_ms: f64,
    fingerprint_ms: f64,
    query_ms: f64,
) -> Result<MatchOutcome> {
    if query.is_empty() {
        return Ok(MatchOutcome::Negative {
            reason: NegativeReason::NoFingerprintsExtracted,
        });
    }

    let hashes: Vec<String> = query.iter().map(|q| q.hash.clone()).collect();
    let index_hits = store.lookup_hashes(&hashes)?;
    if index_hits.is_empty() {
        return Ok(MatchOutcome::Negative {
            reason: NegativeReason::NoIndexHits,
        });
    }

    let histogram = vote(query, &index_hits);
    let Some(best) = winner(&histogram) else {
        return Ok(MatchOutcome::Negative {
            reason: NegativeReason::NoOffsetAlignment,
        });
    };

    let n_song = store.count_by_song(best.song_id)?;
    let input_conf = (best.votes as f64 / query.len() as f64) * 100.0;
    let db_conf = if n_song > 0 {
        (best.votes as f64 / n_song as f64) * 100.0
    } else {
        0.0
    };

    if best.votes < config.min_match_count || input_conf < config.min_input_conf || db_conf < config.min_db_conf {
        return Ok(MatchOutcome::Negative {
            reason: NegativeReason::LowConfidence,
        });
    }

    Ok(MatchOutcome::Positive(MatchResult {
        song_id: best.song_id,
        offset_frames: best.offset_frames,
        offset_seconds: best.offset_frames as f64 * config.frame_seconds(),
        votes: best.votes,
        input_conf,
        db_conf,
        total_ms,
        fingerprint_ms,
        query_ms,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryFingerprintStore;
    use crate::store::FingerprintStore as _;

    fn qf(hash: &str, anchor_time: i64) -> QueryFingerprint {
        QueryFingerprint {
            hash: hash.to_string(),
            anchor_time,
        }
    }

    fn cfg_with_thresholds(min_match_count: u64, min_input_conf: f64, min_db_conf: f64) -> EngineConfig {
        let mut cfg = EngineConfig::default();
        cfg.min_match_count = min_match_count;
        cfg.min_input_conf = min_input_conf;
        cfg.min_db_conf = min_db_conf;
        cfg
    }

    #[test]
    fn empty_query_is_negative_no_fingerprints() {
        let mut store = InMemoryFingerprintStore::new();
        let cfg = EngineConfig::default();
        let outcome = recognize_fingerprints(&[], &mut store, &cfg, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Negative {
                reason: NegativeReason::NoFingerprintsExtracted
            }
        );
    }

    #[test]
    fn no_index_hits_when_hashes_are_unknown() {
        let mut store = InMemoryFingerprintStore::new();
        store
            .bulk_insert(&[crate::fingerprint::Fingerprint {
                hash: "known".into(),
                anchor_time: 5,
                song_id: 1,
            }])
            .unwrap();

        let cfg = EngineConfig::default();
        let query = vec![qf("unknown", 0)];
        let outcome = recognize_fingerprints(&query, &mut store, &cfg, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Negative {
                reason: NegativeReason::NoIndexHits
            }
        );
    }

    #[test]
    fn strong_alignment_clears_the_gate() {
        let mut store = InMemoryFingerprintStore::new();
        let fps: Vec<_> = (0..100)
            .map(|i| crate::fingerprint::Fingerprint {
                hash: format!("h{i}"),
                anchor_time: 1000 + i,
                song_id: 42,
            })
            .collect();
        store.bulk_insert(&fps).unwrap();

        // query offset by 1000 frames consistently
        let query: Vec<_> = (0..100).map(|i| qf(&format!("h{i}"), i)).collect();
        let cfg = cfg_with_thresholds(50, 20.0, 5.0);
        let outcome = recognize_fingerprints(&query, &mut store, &cfg, 1.0, 1.0, 1.0).unwrap();

        match outcome {
            MatchOutcome::Positive(m) => {
                assert_eq!(m.song_id, 42);
                assert_eq!(m.offset_frames, 1000);
                assert_eq!(m.votes, 100);
            }
            other => panic!("expected positive match, got {other:?}"),
        }
    }

    #[test]
    fn below_threshold_is_low_confidence() {
        let mut store = InMemoryFingerprintStore::new();
        store
            .bulk_insert(&[crate::fingerprint::Fingerprint {
                hash: "h0".into(),
                anchor_time: 5,
                song_id: 1,
            }])
            .unwrap();

        let cfg = cfg_with_thresholds(50, 20.0, 5.0);
        let query = vec![qf("h0", 0)];
        let outcome = recognize_fingerprints(&query, &mut store, &cfg, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Negative {
                reason: NegativeReason::LowConfidence
            }
        );
    }

    #[test]
    fn ties_break_to_higher_song_id() {
        let mut store = InMemoryFingerprintStore::new();
        store
            .bulk_insert(&[
                crate::fingerprint::Fingerprint {
                    hash: "h0".into(),
                    anchor_time: 0,
                    song_id: 5,
                },
                crate::fingerprint::Fingerprint {
                    hash: "h0".into(),
                    anchor_time: 0,
                    song_id: 9,
                },
            ])
            .unwrap();

        let cfg = cfg_with_thresholds(0, 0.0, 0.0);
        let query = vec![qf("h0", 0)];
        let outcome = recognize_fingerprints(&query, &mut store, &cfg, 0.0, 0.0, 0.0).unwrap();
        match outcome {
            MatchOutcome::Positive(m) => assert_eq!(m.song_id, 9),
            other => panic!("expected positive match, got {other:?}"),
        }
    }

    #[test]
    fn offset_ties_for_the_same_song_break_deterministically() {
        let mut histogram: HashMap<(u32, i64), u64> = HashMap::new();
        histogram.insert((7, 100), 10);
        histogram.insert((7, -5), 10);
        histogram.insert((7, 42), 10);

        let a = winner(&histogram);
        let b = winner(&histogram);
        assert_eq!(a, b);
        assert_eq!(a.unwrap().offset_frames, 100);
    }

    #[test]
    fn lowering_thresholds_never_turns_positive_into_negative() {
        let mut store = InMemoryFingerprintStore::new();
        let fps: Vec<_> = (0..80)
            .map(|i| crate::fingerprint::Fingerprint {
                hash: format!("h{i}"),
                anchor_time: i,
                song_id: 1,
            })
            .collect();
        store.bulk_insert(&fps).unwrap();
        let query: Vec<_> = (0..80).map(|i| qf(&format!("h{i}"), i)).collect();

        let strict = cfg_with_thresholds(50, 20.0, 5.0);
        let strict_outcome = recognize_fingerprints(&query, &mut store, &strict, 0.0, 0.0, 0.0).unwrap();
        assert!(matches!(strict_outcome, MatchOutcome::Positive(_)));

        let looser = cfg_with_thresholds(10, 5.0, 1.0);
        let looser_outcome = recognize_fingerprints(&query, &mut store, &looser, 0.0, 0.0, 0.0).unwrap();
        assert!(matches!(looser_outcome, MatchOutcome::Positive(_)));
    }
}
