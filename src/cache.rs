//! C8: Match Cache — append-only positive identifications awaiting
//! aggregation.

use crate::error::Result;
use crate::model::MatchRecord;
use crate::store::MatchCacheStore;

/// Records one positive identification. Writes are idempotent only across
/// process retries — exact duplicate rows may land, and the aggregator is
/// built to tolerate them.
pub fn record_match(
    store: &mut dyn MatchCacheStore,
    song_id: u32,
    station_id: u32,
    matched_at_ms: i64,
) -> Result<()> {
    store.record(MatchRecord {
        song_id,
        station_id,
        matched_at_ms,
    })
}
