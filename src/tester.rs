//! Dev-only diagnostic: run the recognition pipeline against random snippets
//! cut from a directory of reference songs and report accuracy.
//!
//! Not part of the library's external interface — end-to-end recognition
//! scenarios are covered by real unit tests in [`crate`]; this harness is a
//! convenience for manually sanity-checking a corpus of songs without
//! shelling out to a full test matrix.

use crate::config::EngineConfig;
use crate::model::MatchOutcome;
use crate::store::memory::InMemoryFingerprintStore;
use crate::store::FingerprintStore;
use rand::Rng;
use std::collections::HashMap;
use std::fs;
use std::process::Command;

const SNIPPETS_PER_SONG: u32 = 3;
const SNIPPET_DURATION_SECS: u64 = 10;
const SNIPPET_TEMP_PATH: &str = "temp_test_snippet.wav";

/// Ingests every file in `songs_dir`, then cuts random snippets from each and
/// recognizes them, printing a running accuracy tally.
pub fn run_random_snippet_test(songs_dir: &str, config: &EngineConfig) {
    let mut store = InMemoryFingerprintStore::new();
    let mut song_titles: HashMap<u32, String> = HashMap::new();

    let song_entries = match fs::read_dir(songs_dir) {
        Ok(entries) => entries.collect::<std::result::Result<Vec<_>, _>>().unwrap_or_default(),
        Err(e) => {
            tracing::error!(songs_dir, error = %e, "could not read songs directory");
            return;
        }
    };

    let mut next_song_id = 1u32;
    for entry in &song_entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let title = path.file_name().unwrap().to_string_lossy().to_string();
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(?path, error = %e, "skipping unreadable file");
                continue;
            }
        };

        let song_id = next_song_id;
        next_song_id += 1;
        match crate::ingest(song_id, bytes, &mut store, config) {
            Ok(report) => {
                tracing::info!(title, fingerprints = report.fingerprints_written, "ingested reference song");
                song_titles.insert(song_id, title);
            }
            Err(e) => {
                tracing::warn!(title, error = %e, "failed to ingest reference song, skipping");
            }
        }
    }

    let mut total_tests = 0u32;
    let mut correct_matches = 0u32;

    for entry in &song_entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_path_str = path.to_string_lossy().to_string();
        let true_title = path.file_name().unwrap().to_string_lossy().to_string();

        let duration_secs = match probe_duration_seconds(&file_path_str) {
            Some(d) => d,
            None => {
                tracing::info!(title = true_title, "skipping, failed to probe duration");
                continue;
            }
        };

        if duration_secs < (SNIPPET_DURATION_SECS + 5) as f64 {
            tracing::info!(title = true_title, "skipping, song too short for a snippet");
            continue;
        }

        for i in 0..SNIPPETS_PER_SONG {
            total_tests += 1;
            let max_start = duration_secs as u64 - SNIPPET_DURATION_SECS;
            let start_time = rand::rng().random_range(0..=max_start);

            if !extract_snippet(&file_path_str, start_time, config.sample_rate_hz) {
                tracing::warn!(title = true_title, snippet = i, "ffmpeg snippet extraction failed");
                continue;
            }

            let snippet_bytes = match fs::read(SNIPPET_TEMP_PATH) {
                Ok(b) => b,
                Err(_) => continue,
            };

            match crate::recognize(snippet_bytes, &mut store, config) {
                Ok(MatchOutcome::Positive(m)) => {
                    let predicted = song_titles.get(&m.song_id).cloned().unwrap_or_default();
                    if predicted == true_title {
                        correct_matches += 1;
                        tracing::info!(title = true_title, votes = m.votes, "correct match");
                    } else {
                        tracing::info!(title = true_title, predicted, votes = m.votes, "incorrect match");
                    }
                }
                Ok(MatchOutcome::Negative { reason }) => {
                    tracing::info!(title = true_title, %reason, "no match found");
                }
                Err(e) => {
                    tracing::warn!(title = true_title, error = %e, "recognition failed");
                }
            }
        }
    }

    let _ = fs::remove_file(SNIPPET_TEMP_PATH);

    if total_tests > 0 {
        let accuracy = (correct_matches as f32 / total_tests as f32) * 100.0;
        tracing::info!(correct_matches, total_tests, accuracy, "snippet test finished");
    } else {
        tracing::warn!("no tests were run, check the songs directory path");
    }
}

fn probe_duration_seconds(file_path: &str) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            file_path,
        ])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse::<f64>().ok()
}

fn extract_snippet(file_path: &str, start_time: u64, sample_rate_hz: u32) -> bool {
    Command::new("ffmpeg")
        .args([
            "-y",
            "-ss",
            &start_time.to_string(),
            "-t",
            &SNIPPET_DURATION_SECS.to_string(),
            "-i",
            file_path,
            "-c:a",
            "pcm_s16le",
            "-ar",
            &sample_rate_hz.to_string(),
            "-ac",
            "1",
            SNIPPET_TEMP_PATH,
        ])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
