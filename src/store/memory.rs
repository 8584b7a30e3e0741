//! In-memory implementations of the store traits — used by unit tests and
//! the snippet-test harness so neither needs a live Postgres instance.

use super::{FingerprintStore, MatchCacheStore, PlayLogSink, LOOKUP_CHUNK_SIZE};
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::model::{MatchRecord, PlaySession};
use std::collections::{HashMap, HashSet};

/// A sharded-by-hash in-memory fingerprint index.
#[derive(Debug, Default)]
pub struct InMemoryFingerprintStore {
    // hash -> [(song_id, anchor_time)]
    by_hash: HashMap<String, Vec<(u32, i64)>>,
    // song_id -> set of (hash, anchor_time) already stored, for dedup + count
    by_song: HashMap<u32, HashSet<(String, i64)>>,
}

impl InMemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FingerprintStore for InMemoryFingerprintStore {
    fn bulk_insert(&mut self, fingerprints: &[Fingerprint]) -> Result<u64> {
        let mut written = 0u64;
        for fp in fingerprints {
            let song_entries = self.by_song.entry(fp.song_id).or_default();
            let key = (fp.hash.clone(), fp.anchor_time);
            if song_entries.insert(key) {
                self.by_hash
                    .entry(fp.hash.clone())
                    .or_default()
                    .push((fp.song_id, fp.anchor_time));
                written += 1;
            }
        }
        Ok(written)
    }

    fn lookup_hashes(&mut self, hashes: &[String]) -> Result<HashMap<String, Vec<(u32, i64)>>> {
        let mut result = HashMap::new();
        for chunk in hashes.chunks(LOOKUP_CHUNK_SIZE) {
            for h in chunk {
                if let Some(rows) = self.by_hash.get(h) {
                    result.insert(h.clone(), rows.clone());
                }
            }
        }
        Ok(result)
    }

    fn count_by_song(&mut self, song_id: u32) -> Result<u64> {
        Ok(self.by_song.get(&song_id).map(|s| s.len() as u64).unwrap_or(0))
    }

    fn song_exists(&mut self, song_id: u32) -> Result<bool> {
        Ok(self.by_song.contains_key(&song_id))
    }

    fn delete_song(&mut self, song_id: u32) -> Result<()> {
        if let Some(entries) = self.by_song.remove(&song_id) {
            for (hash, anchor_time) in entries {
                if let Some(rows) = self.by_hash.get_mut(&hash) {
                    rows.retain(|&(sid, t)| !(sid == song_id && t == anchor_time));
                    if rows.is_empty() {
                        self.by_hash.remove(&hash);
                    }
                }
            }
        }
        Ok(())
    }
}

/// An append-only in-memory match cache, addressed by a monotonically
/// increasing row id.
#[derive(Debug, Default)]
pub struct InMemoryMatchCacheStore {
    rows: Vec<Option<(u64, MatchRecord)>>,
    next_id: u64,
}

impl InMemoryMatchCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchCacheStore for InMemoryMatchCacheStore {
    fn record(&mut self, record: MatchRecord) -> Result<()> {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.push(Some((id, record)));
        Ok(())
    }

    fn entries_since(&mut self, since_ms: i64) -> Result<Vec<(u64, MatchRecord)>> {
        Ok(self
            .rows
            .iter()
            .filter_map(|slot| slot.clone())
            .filter(|(_, r)| r.matched_at_ms >= since_ms)
            .collect())
    }

    fn delete_ids(&mut self, ids: &[u64]) -> Result<()> {
        let ids: HashSet<u64> = ids.iter().copied().collect();
        for slot in self.rows.iter_mut() {
            if let Some((id, _)) = slot {
                if ids.contains(id) {
                    *slot = None;
                }
            }
        }
        Ok(())
    }
}

/// An in-memory play-log sink, used by tests that assert the aggregator's
/// overlap-exclusion and idempotence properties without a database.
#[derive(Debug, Default)]
pub struct InMemoryPlayLogSink {
    sessions: Vec<PlaySession>,
}

impl InMemoryPlayLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[PlaySession] {
        &self.sessions
    }
}

impl PlayLogSink for InMemoryPlayLogSink {
    fn insert(&mut self, session: PlaySession) -> Result<()> {
        self.sessions.push(session);
        Ok(())
    }

    fn has_overlap(
        &mut self,
        song_id: u32,
        station_id: u32,
        span_start_ms: i64,
        span_stop_ms: i64,
        slack_ms: i64,
    ) -> Result<bool> {
        Ok(self.sessions.iter().any(|s| {
            s.song_id == song_id
                && s.station_id == station_id
                && (s.start_time_ms - slack_ms) <= span_stop_ms
                && (s.stop_time_ms + slack_ms) >= span_start_ms
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(hash: &str, anchor_time: i64, song_id: u32) -> Fingerprint {
        Fingerprint {
            hash: hash.to_string(),
            anchor_time,
            song_id,
        }
    }

    #[test]
    fn bulk_insert_deduplicates_within_a_song() {
        let mut store = InMemoryFingerprintStore::new();
        let fps = vec![fp("abc", 10, 1), fp("abc", 10, 1), fp("def", 20, 1)];
        let written = store.bulk_insert(&fps).unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.count_by_song(1).unwrap(), 2);
    }

    #[test]
    fn delete_song_removes_its_rows_from_the_hash_index() {
        let mut store = InMemoryFingerprintStore::new();
        store.bulk_insert(&[fp("abc", 10, 1), fp("abc", 11, 2)]).unwrap();
        store.delete_song(1).unwrap();

        let hits = store.lookup_hashes(&["abc".to_string()]).unwrap();
        let rows = &hits["abc"];
        assert_eq!(rows, &vec![(2, 11)]);
    }

    #[test]
    fn match_cache_delete_is_idempotent_and_scoped_to_ids() {
        let mut cache = InMemoryMatchCacheStore::new();
        cache
            .record(MatchRecord {
                song_id: 1,
                station_id: 2,
                matched_at_ms: 1_000,
            })
            .unwrap();
        cache
            .record(MatchRecord {
                song_id: 1,
                station_id: 2,
                matched_at_ms: 2_000,
            })
            .unwrap();

        let all = cache.entries_since(0).unwrap();
        assert_eq!(all.len(), 2);

        let first_id = all[0].0;
        cache.delete_ids(&[first_id]).unwrap();
        cache.delete_ids(&[first_id]).unwrap(); // idempotent

        let remaining = cache.entries_since(0).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].1.matched_at_ms, 2_000);
    }

    #[test]
    fn overlap_check_honors_slack_window() {
        let mut sink = InMemoryPlayLogSink::new();
        sink.insert(PlaySession {
            song_id: 1,
            station_id: 2,
            start_time_ms: 100_000,
            stop_time_ms: 130_000,
            duration_seconds: 30.0,
            royalty_amount: 0.05,
        })
        .unwrap();

        // a new span starting 61s after the prior session's stop clears the slack
        assert!(!sink.has_overlap(1, 2, 191_001, 200_000, 60_000).unwrap());
        // a span starting 59s after clearance still overlaps
        assert!(sink.has_overlap(1, 2, 189_000, 200_000, 60_000).unwrap());
    }
}
