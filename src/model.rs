//! Explicit record types shared across the core's external interfaces.
//!
//! These replace the loose dict/Model-object shapes the original Django app
//! passed around (`JsonResponse({...})`, ORM query results) with concrete,
//! serializable structs — including a proper tagged union for the
//! recognize-or-not outcome instead of a boolean `match` flag plus optional
//! fields.

use serde::{Deserialize, Serialize};

/// A song as known to the index. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub song_id: u32,
    pub title: String,
    pub artist: Option<String>,
}

/// Result of a successful ingest call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub song_id: u32,
    pub fingerprints_written: u64,
    pub duration_seconds: f64,
}

/// A positive recognition result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub song_id: u32,
    pub offset_frames: i64,
    pub offset_seconds: f64,
    pub votes: u64,
    pub input_conf: f64,
    pub db_conf: f64,
    pub total_ms: f64,
    pub fingerprint_ms: f64,
    pub query_ms: f64,
}

/// Closed set of reasons a recognition attempt did not clear the confidence
/// gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeReason {
    NoFingerprintsExtracted,
    NoIndexHits,
    NoOffsetAlignment,
    LowConfidence,
}

impl std::fmt::Display for NegativeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NegativeReason::NoFingerprintsExtracted => "no_fingerprints_extracted",
            NegativeReason::NoIndexHits => "no_index_hits",
            NegativeReason::NoOffsetAlignment => "no_offset_alignment",
            NegativeReason::LowConfidence => "low_confidence",
        };
        f.write_str(s)
    }
}

/// Tagged union returned by `recognize` — never an exception, always one of
/// these two variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome")]
pub enum MatchOutcome {
    Positive(MatchResult),
    Negative { reason: NegativeReason },
}

/// An append-only positive identification awaiting aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub song_id: u32,
    pub station_id: u32,
    pub matched_at_ms: i64,
}

/// A validated, non-overlapping play interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaySession {
    pub song_id: u32,
    pub station_id: u32,
    pub start_time_ms: i64,
    pub stop_time_ms: i64,
    pub duration_seconds: f64,
    pub royalty_amount: f64,
}
