//! Diesel/Postgres-backed implementations of the store traits.

use super::{FingerprintStore, LOOKUP_CHUNK_SIZE, MatchCacheStore, PlayLogSink};
use crate::error::{EngineError, Result};
use crate::fingerprint::Fingerprint as CoreFingerprint;
use crate::model::{MatchRecord, PlaySession};
use crate::schema::{fingerprint, match_cache, play_log, songs};

use chrono::NaiveDateTime;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::on_constraint;
use std::collections::{HashMap, HashSet};
use std::env;

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = fingerprint)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct FingerprintRow {
    hash: String,
    anchor_time: i64,
    song_id: i32,
    created_at: Option<NaiveDateTime>,
}

#[derive(Queryable, Debug)]
struct FingerprintHit {
    hash: String,
    song_id: i32,
    anchor_time: i64,
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = match_cache)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct MatchCacheRow {
    id: i64,
    song_id: i32,
    station_id: i32,
    matched_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = match_cache)]
struct NewMatchCacheRow {
    song_id: i32,
    station_id: i32,
    matched_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = play_log)]
struct NewPlayLogRow {
    song_id: i32,
    station_id: i32,
    start_time: NaiveDateTime,
    stop_time: NaiveDateTime,
    duration_seconds: f64,
    royalty_amount: f64,
}

fn to_naive(ms: i64) -> NaiveDateTime {
    chrono::DateTime::from_timestamp_millis(ms)
        .unwrap_or_default()
        .naive_utc()
}

fn from_naive(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_millis()
}

/// Bulk-insert batch size for fingerprints, keeping a single transaction's
/// bind-parameter count bounded.
const INSERT_BATCH_SIZE: usize = 15_000;

pub struct PgFingerprintStore {
    conn: PgConnection,
}

impl PgFingerprintStore {
    pub fn connect(database_url: &str) -> Result<Self> {
        let conn = PgConnection::establish(database_url)
            .map_err(|e| EngineError::IndexWrite(format!("could not connect to {database_url}: {e}")))?;
        Ok(Self { conn })
    }

    pub fn connect_from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| EngineError::InvalidConfig("DATABASE_URL must be set".into()))?;
        Self::connect(&url)
    }
}

impl FingerprintStore for PgFingerprintStore {
    fn bulk_insert(&mut self, fingerprints: &[CoreFingerprint]) -> Result<u64> {
        if fingerprints.is_empty() {
            return Ok(0);
        }

        let mut seen = HashSet::new();
        let rows: Vec<FingerprintRow> = fingerprints
            .iter()
            .filter(|f| seen.insert((f.hash.clone(), f.anchor_time, f.song_id)))
            .map(|f| FingerprintRow {
                hash: f.hash.clone(),
                anchor_time: f.anchor_time,
                song_id: f.song_id as i32,
                created_at: Some(chrono::Utc::now().naive_utc()),
            })
            .collect();

        let result: std::result::Result<usize, diesel::result::Error> = self.conn.transaction(|conn| {
            let mut total = 0usize;
            for batch in rows.chunks(INSERT_BATCH_SIZE) {
                total += diesel::insert_into(fingerprint::table)
                    .values(batch)
                    .on_conflict(on_constraint("fingerprint_pkey"))
                    .do_nothing()
                    .execute(conn)?;
            }
            Ok(total)
        });

        result
            .map(|n| n as u64)
            .map_err(|e| EngineError::IndexWrite(format!("fingerprint insert failed: {e}")))
    }

    fn lookup_hashes(&mut self, hashes: &[String]) -> Result<HashMap<String, Vec<(u32, i64)>>> {
        if hashes.is_empty() {
            return Ok(HashMap::new());
        }

        use crate::schema::fingerprint::dsl;

        let mut map: HashMap<String, Vec<(u32, i64)>> = HashMap::new();

        for batch in hashes.chunks(LOOKUP_CHUNK_SIZE) {
            let hits: Vec<FingerprintHit> = dsl::fingerprint
                .filter(dsl::hash.eq_any(batch))
                .select((dsl::hash, dsl::song_id, dsl::anchor_time))
                .load(&mut self.conn)
                .map_err(|e| EngineError::IndexRead(format!("hash lookup failed: {e}")))?;

            for hit in hits {
                map.entry(hit.hash)
                    .or_default()
                    .push((hit.song_id as u32, hit.anchor_time));
            }
        }

        Ok(map)
    }

    fn count_by_song(&mut self, song_id_filter: u32) -> Result<u64> {
        use crate::schema::fingerprint::dsl::*;
        let count: i64 = fingerprint
            .filter(song_id.eq(song_id_filter as i32))
            .count()
            .get_result(&mut self.conn)
            .map_err(|e| EngineError::IndexRead(format!("count failed: {e}")))?;
        Ok(count as u64)
    }

    fn song_exists(&mut self, song_id_filter: u32) -> Result<bool> {
        Ok(self.count_by_song(song_id_filter)? > 0)
    }

    fn delete_song(&mut self, song_id_filter: u32) -> Result<()> {
        use crate::schema::fingerprint::dsl::*;
        diesel::delete(fingerprint.filter(song_id.eq(song_id_filter as i32)))
            .execute(&mut self.conn)
            .map_err(|e| EngineError::IndexWrite(format!("delete failed: {e}")))?;
        Ok(())
    }
}

impl PgFingerprintStore {
    /// Creates a `songs` row and returns its assigned id. Not part of the
    /// `FingerprintStore` trait since song creation is a one-time act, not a
    /// per-fingerprint operation.
    pub fn write_song(&mut self, title: &str, artist: Option<&str>) -> Result<i32> {
        #[derive(Insertable)]
        #[diesel(table_name = songs)]
        struct NewSong<'a> {
            title: &'a str,
            artist: Option<&'a str>,
            created_at: Option<NaiveDateTime>,
        }
        #[derive(Queryable)]
        struct InsertedSong {
            id: i32,
        }

        use crate::schema::songs::dsl;
        let inserted: InsertedSong = diesel::insert_into(dsl::songs)
            .values(&NewSong {
                title,
                artist,
                created_at: Some(chrono::Utc::now().naive_utc()),
            })
            .returning(dsl::id)
            .get_result(&mut self.conn)
            .map(|id| InsertedSong { id })
            .map_err(|e| EngineError::IndexWrite(format!("song insert failed: {e}")))?;

        Ok(inserted.id)
    }
}

pub struct PgMatchCacheStore {
    conn: PgConnection,
}

impl PgMatchCacheStore {
    pub fn connect(database_url: &str) -> Result<Self> {
        let conn = PgConnection::establish(database_url)
            .map_err(|e| EngineError::IndexWrite(format!("could not connect to {database_url}: {e}")))?;
        Ok(Self { conn })
    }
}

impl MatchCacheStore for PgMatchCacheStore {
    fn record(&mut self, record: MatchRecord) -> Result<()> {
        diesel::insert_into(match_cache::table)
            .values(&NewMatchCacheRow {
                song_id: record.song_id as i32,
                station_id: record.station_id as i32,
                matched_at: to_naive(record.matched_at_ms),
            })
            .execute(&mut self.conn)
            .map_err(|e| EngineError::IndexWrite(format!("match cache insert failed: {e}")))?;
        Ok(())
    }

    fn entries_since(&mut self, since_ms: i64) -> Result<Vec<(u64, MatchRecord)>> {
        use crate::schema::match_cache::dsl::*;
        let rows: Vec<MatchCacheRow> = match_cache
            .filter(matched_at.ge(to_naive(since_ms)))
            .select(MatchCacheRow::as_select())
            .load(&mut self.conn)
            .map_err(|e| EngineError::IndexRead(format!("match cache read failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.id as u64,
                    MatchRecord {
                        song_id: r.song_id as u32,
                        station_id: r.station_id as u32,
                        matched_at_ms: from_naive(r.matched_at),
                    },
                )
            })
            .collect())
    }

    fn delete_ids(&mut self, ids: &[u64]) -> Result<()> {
        use crate::schema::match_cache::dsl::*;
        let ids: Vec<i64> = ids.iter().map(|&i| i as i64).collect();
        diesel::delete(match_cache.filter(id.eq_any(ids)))
            .execute(&mut self.conn)
            .map_err(|e| EngineError::IndexWrite(format!("match cache delete failed: {e}")))?;
        Ok(())
    }
}

pub struct PgPlayLogSink {
    conn: PgConnection,
}

impl PgPlayLogSink {
    pub fn connect(database_url: &str) -> Result<Self> {
        let conn = PgConnection::establish(database_url)
            .map_err(|e| EngineError::IndexWrite(format!("could not connect to {database_url}: {e}")))?;
        Ok(Self { conn })
    }
}

impl PlayLogSink for PgPlayLogSink {
    fn insert(&mut self, session: PlaySession) -> Result<()> {
        diesel::insert_into(play_log::table)
            .values(&NewPlayLogRow {
                song_id: session.song_id as i32,
                station_id: session.station_id as i32,
                start_time: to_naive(session.start_time_ms),
                stop_time: to_naive(session.stop_time_ms),
                duration_seconds: session.duration_seconds,
                royalty_amount: session.royalty_amount,
            })
            .execute(&mut self.conn)
            .map_err(|e| EngineError::IndexWrite(format!("play log insert failed: {e}")))?;
        Ok(())
    }

    fn has_overlap(
        &mut self,
        song_id_filter: u32,
        station_id_filter: u32,
        span_start_ms: i64,
        span_stop_ms: i64,
        slack_ms: i64,
    ) -> Result<bool> {
        use crate::schema::play_log::dsl::*;
        let window_start = to_naive(span_start_ms - slack_ms);
        let window_stop = to_naive(span_stop_ms + slack_ms);

        let count: i64 = play_log
            .filter(song_id.eq(song_id_filter as i32))
            .filter(station_id.eq(station_id_filter as i32))
            .filter(start_time.le(window_stop))
            .filter(stop_time.ge(window_start))
            .count()
            .get_result(&mut self.conn)
            .map_err(|e| EngineError::IndexRead(format!("overlap check failed: {e}")))?;

        Ok(count > 0)
    }
}
