use aircheck_core::config::EngineConfig;
use aircheck_core::store::postgres::{PgFingerprintStore, PgMatchCacheStore, PgPlayLogSink};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "aircheck", about = "Audio fingerprinting and play-session aggregation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fingerprint a song and write it to the index.
    Ingest {
        song_id: u32,
        file: PathBuf,
    },
    /// Recognize a clip against the index.
    Recognize {
        file: PathBuf,
    },
    /// Record a positive identification into the match cache.
    RecordMatch {
        song_id: u32,
        station_id: u32,
        matched_at_ms: i64,
    },
    /// Collapse match cache entries into play sessions.
    RunAggregation {
        now_ms: i64,
    },
    /// Render a spectrogram + constellation heatmap as SVG.
    Visualize {
        file: PathBuf,
        out: PathBuf,
    },
    /// Run the random-snippet accuracy harness against a directory of songs.
    SnippetTest {
        songs_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = EngineConfig::default();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid engine configuration");
        return ExitCode::FAILURE;
    }

    let result = run(cli.command, &config);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &EngineConfig) -> anyhow::Result<()> {
    match command {
        Command::Ingest { song_id, file } => {
            let mut store = PgFingerprintStore::connect_from_env()?;
            let bytes = fs::read(&file)?;
            let report = aircheck_core::ingest(song_id, bytes, &mut store, config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Recognize { file } => {
            let mut store = PgFingerprintStore::connect_from_env()?;
            let bytes = fs::read(&file)?;
            let outcome = aircheck_core::recognize(bytes, &mut store, config)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::RecordMatch {
            song_id,
            station_id,
            matched_at_ms,
        } => {
            let database_url = std::env::var("DATABASE_URL")?;
            let mut store = PgMatchCacheStore::connect(&database_url)?;
            aircheck_core::record_match(&mut store, song_id, station_id, matched_at_ms)?;
        }
        Command::RunAggregation { now_ms } => {
            let database_url = std::env::var("DATABASE_URL")?;
            let mut cache = PgMatchCacheStore::connect(&database_url)?;
            let mut sink = PgPlayLogSink::connect(&database_url)?;
            let sessions = aircheck_core::run_aggregation(&mut cache, &mut sink, now_ms, config)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        Command::Visualize { file, out } => {
            let decoder = aircheck_core::decoder::DecoderAdapter::new();
            let bytes = fs::read(&file)?;
            let samples = decoder.decode_bytes(bytes, config.sample_rate_hz)?;
            let spectrogram = aircheck_core::spectrogram::build_spectrogram(&samples, config.sample_rate_hz, config);
            let peaks = aircheck_core::peaks::pick_peaks(&spectrogram, config);
            let name = file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            aircheck_core::visualization::write_heatmap_svg(&spectrogram, &peaks, &out, &name)?;
        }
        Command::SnippetTest { songs_dir } => {
            aircheck_core::tester::run_random_snippet_test(&songs_dir.to_string_lossy(), config);
        }
    }

    Ok(())
}
