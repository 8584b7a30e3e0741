//! Narrow persistence contracts the DSP and aggregation layers depend on.
//!
//! Replaces direct ORM (Diesel model) usage scattered through the
//! recognition path with a handful of traits, so in-memory test doubles are
//! trivial to write and the pure computational core never imports Diesel
//! itself.

pub mod memory;
pub mod postgres;

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::model::{MatchRecord, PlaySession};
use std::collections::HashMap;

/// Owns all persisted Fingerprints, keyed by hash.
///
/// Implementations may be a sharded in-memory map, a persistent B-tree keyed
/// on `hash`, or an LSM store — the contract only requires hash-keyed lookup
/// and per-song atomic bulk insert/delete.
pub trait FingerprintStore {
    /// Inserts every fingerprint for one song atomically: either all land or
    /// none do. Returns the number of new rows written (duplicates within
    /// the batch are not double-counted).
    fn bulk_insert(&mut self, fingerprints: &[Fingerprint]) -> Result<u64>;

    /// Looks up every stored `(song_id, anchor_time)` for each hash in
    /// `hashes`, chunking internally so a caller can pass up to 10⁴ hashes
    /// without the implementation buffering more than `lookup_chunk_size`
    /// rows worth of query parameters at a time.
    fn lookup_hashes(&mut self, hashes: &[String]) -> Result<HashMap<String, Vec<(u32, i64)>>>;

    /// Total number of fingerprints indexed for a song.
    fn count_by_song(&mut self, song_id: u32) -> Result<u64>;

    /// True if any fingerprints are already indexed for this song.
    fn song_exists(&mut self, song_id: u32) -> Result<bool>;

    /// Deletes every fingerprint belonging to a song (cascade on song
    /// deletion).
    fn delete_song(&mut self, song_id: u32) -> Result<()>;
}

/// Owns append-only [`MatchRecord`] rows awaiting aggregation.
///
/// Each stored row is addressed by an opaque id so the aggregator can delete
/// exactly the rows it consumed without racing a concurrent writer.
pub trait MatchCacheStore {
    fn record(&mut self, record: MatchRecord) -> Result<()>;

    /// Every cache row with `matched_at_ms >= since_ms`, each paired with its
    /// opaque row id.
    fn entries_since(&mut self, since_ms: i64) -> Result<Vec<(u64, MatchRecord)>>;

    fn delete_ids(&mut self, ids: &[u64]) -> Result<()>;
}

/// Owns the permanent log of validated play sessions.
pub trait PlayLogSink {
    fn insert(&mut self, session: PlaySession) -> Result<()>;

    /// True if an existing session for `(song_id, station_id)` has a
    /// `[start - slack_ms, stop + slack_ms]` window intersecting
    /// `[span_start_ms, span_stop_ms]`.
    fn has_overlap(
        &mut self,
        song_id: u32,
        station_id: u32,
        span_start_ms: i64,
        span_stop_ms: i64,
        slack_ms: i64,
    ) -> Result<bool>;
}

/// Lookup batch size used by [`FingerprintStore::lookup_hashes`]
/// implementations, bounding per-query memory to roughly 1,000 rows'
/// worth of bind parameters at a time.
pub const LOOKUP_CHUNK_SIZE: usize = 1_000;
