//! C9: Play-Session Aggregator — collapses Match Cache entries into
//! validated PlaySession rows.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::{MatchRecord, PlaySession};
use crate::store::{MatchCacheStore, PlayLogSink};
use std::collections::HashMap;

/// Overlap-veto slack, in milliseconds, applied on both sides of an existing
/// session's span.
const OVERLAP_SLACK_MS: i64 = 60_000;

/// Runs one aggregation pass over every Match Cache entry within
/// `aggregation_window_minutes` of `now_ms`, returning the PlaySessions newly
/// emitted.
///
/// Every group within the window is purged after processing, whether it was
/// emitted, dropped as a duplicate, or found insufficient — this keeps the
/// pass uniformly idempotent (see DESIGN.md for why `INSUFFICIENT`/
/// `TOO_SHORT` groups are purged rather than left to accumulate toward a
/// later threshold).
///
/// The aggregator is at-least-once: a crash between emitting a session and
/// deleting its source rows is safe to replay, since the overlap check vetoes
/// re-emission of an already-logged span.
pub fn run_aggregation(
    cache: &mut dyn MatchCacheStore,
    sink: &mut dyn PlayLogSink,
    now_ms: i64,
    config: &EngineConfig,
) -> Result<Vec<PlaySession>> {
    let window_start_ms = now_ms - config.aggregation_window_minutes * 60_000;
    let entries = cache.entries_since(window_start_ms)?;

    let mut groups: HashMap<(u32, u32), Vec<(u64, MatchRecord)>> = HashMap::new();
    for (id, record) in entries {
        groups.entry((record.song_id, record.station_id)).or_default().push((id, record));
    }

    let mut emitted = Vec::new();

    for ((song_id, station_id), rows) in groups {
        let ids: Vec<u64> = rows.iter().map(|(id, _)| *id).collect();
        let timestamps: Vec<i64> = rows.iter().map(|(_, r)| r.matched_at_ms).collect();

        if rows.len() < 3 {
            // INSUFFICIENT
            purge(cache, song_id, station_id, &ids);
            continue;
        }

        let span_start = *timestamps.iter().min().unwrap();
        let span_stop = *timestamps.iter().max().unwrap();
        let span_seconds = (span_stop - span_start) as f64 / 1000.0;

        if span_seconds < config.min_session_seconds as f64 {
            // TOO_SHORT
            purge(cache, song_id, station_id, &ids);
            continue;
        }

        // CONFIRM
        let overlap = match sink.has_overlap(song_id, station_id, span_start, span_stop, OVERLAP_SLACK_MS) {
            Ok(overlap) => overlap,
            Err(e) => {
                tracing::warn!(song_id, station_id, error = %e, "skipping group: overlap check failed");
                continue;
            }
        };

        if overlap {
            // DROP: idempotent skip of an already-logged span
            purge(cache, song_id, station_id, &ids);
            continue;
        }

        let duration_minutes = span_seconds / 60.0;
        let royalty_amount = round2(duration_minutes * config.royalty_rate_per_minute);

        let session = PlaySession {
            song_id,
            station_id,
            start_time_ms: span_start,
            stop_time_ms: span_stop,
            duration_seconds: span_seconds,
            royalty_amount,
        };

        if let Err(e) = sink.insert(session.clone()) {
            tracing::warn!(song_id, station_id, error = %e, "skipping group: play log insert failed");
            continue;
        }

        purge(cache, song_id, station_id, &ids);
        emitted.push(session);
    }

    Ok(emitted)
}

fn purge(cache: &mut dyn MatchCacheStore, song_id: u32, station_id: u32, ids: &[u64]) {
    if let Err(e) = cache.delete_ids(ids) {
        tracing::warn!(song_id, station_id, error = %e, "failed to purge processed match cache rows");
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
