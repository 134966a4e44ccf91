use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use lectern::{
    AnthropicClient, AnthropicConfig, BatchItem, CsvAccumulator, PipelineDirs, RecordingMeta,
    ResolverConfig, Transcriber, TranscriberConfig, WhisperResponse, ZoomClient, ZoomConfig,
    load_catalog, process_recording, read_resolution_csv, resolve, run_batch, segment_and_export,
    write_canonical_catalog, write_resolution_csv,
};

#[derive(Parser)]
#[command(name = "lectern")]
#[command(author, version, about = "Class recording archive pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the provider's recordings for a date range to a reference CSV
    Catalog {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: String,

        /// Output CSV file
        #[arg(short, long, default_value = "recordings_catalog.csv")]
        output: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Match a manual catalog CSV against the provider's recordings
    Resolve {
        /// Manually maintained catalog CSV
        #[arg(short, long)]
        catalog: PathBuf,

        /// Start of the provider query range (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// End of the provider query range (YYYY-MM-DD)
        #[arg(long)]
        to: String,

        /// Output CSV for the resolution results
        #[arg(short, long, default_value = "matched_recordings.csv")]
        output: PathBuf,

        /// Candidate window around the cataloged start time, in minutes
        #[arg(long, default_value = "15")]
        window_minutes: i64,

        /// Sub-window for an Exact classification, in minutes
        #[arg(long, default_value = "2")]
        exact_window_minutes: i64,

        /// Minimum topic similarity for the final tie-break (0-1)
        #[arg(long, default_value = "0.6")]
        topic_threshold: f64,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Download, transcribe, classify and export one recording
    Process {
        /// Canonical recording identifier
        #[arg(long)]
        uuid: String,

        /// Video name used in the archive
        #[arg(long)]
        name: String,

        /// Recording date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Teacher name
        #[arg(long, default_value = "")]
        teacher: String,

        /// Root directory for downloads, transcripts and exports
        #[arg(long, default_value = "archive")]
        output_dir: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Process every confidently resolved row of a resolution CSV
    Batch {
        /// Resolution CSV produced by the resolve command
        #[arg(short, long)]
        resolved: PathBuf,

        /// Root directory for downloads, transcripts and exports
        #[arg(long, default_value = "archive")]
        output_dir: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Classify and export an already-transcribed recording
    Segment {
        /// Transcript JSON from the transcription service
        #[arg(short, long)]
        transcript: PathBuf,

        /// Video name used in the archive
        #[arg(long)]
        name: String,

        /// Recording date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Teacher name
        #[arg(long, default_value = "")]
        teacher: String,

        /// Root directory for exports
        #[arg(long, default_value = "archive")]
        output_dir: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Catalog {
            from,
            to,
            output,
            verbose,
        } => {
            setup_logging(verbose);
            run_catalog(&from, &to, output).await
        }
        Commands::Resolve {
            catalog,
            from,
            to,
            output,
            window_minutes,
            exact_window_minutes,
            topic_threshold,
            verbose,
        } => {
            setup_logging(verbose);
            let config = ResolverConfig {
                window: Duration::minutes(window_minutes),
                exact_window: Duration::minutes(exact_window_minutes),
                topic_threshold,
            };
            run_resolve(catalog, &from, &to, output, config).await
        }
        Commands::Process {
            uuid,
            name,
            date,
            teacher,
            output_dir,
            verbose,
        } => {
            setup_logging(verbose);
            let meta = RecordingMeta {
                video_name: name,
                date,
                teacher,
            };
            run_process(&uuid, meta, output_dir).await
        }
        Commands::Batch {
            resolved,
            output_dir,
            verbose,
        } => {
            setup_logging(verbose);
            run_batch_command(resolved, output_dir).await
        }
        Commands::Segment {
            transcript,
            name,
            date,
            teacher,
            output_dir,
            verbose,
        } => {
            setup_logging(verbose);
            let meta = RecordingMeta {
                video_name: name,
                date,
                teacher,
            };
            run_segment(transcript, meta, output_dir).await
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date {value:?}, expected YYYY-MM-DD"))
}

async fn run_catalog(from: &str, to: &str, output: PathBuf) -> Result<()> {
    let from = parse_date(from)?;
    let to = parse_date(to)?;

    let zoom = ZoomClient::new(ZoomConfig::from_env()?);
    info!("listing recordings from {} to {}", from, to);
    let recordings = zoom.list_recordings(from, to).await?;

    write_canonical_catalog(&output, &recordings)?;
    info!("exported {} recordings to {:?}", recordings.len(), output);
    Ok(())
}

async fn run_resolve(
    catalog: PathBuf,
    from: &str,
    to: &str,
    output: PathBuf,
    config: ResolverConfig,
) -> Result<()> {
    let from = parse_date(from)?;
    let to = parse_date(to)?;

    info!("loading catalog from {:?}", catalog);
    let load = load_catalog(&catalog).context("failed to load catalog")?;
    for error in &load.errors {
        warn!("{error}");
    }
    info!(
        "loaded {} catalog rows ({} rejected)",
        load.records.len(),
        load.errors.len()
    );

    let zoom = ZoomClient::new(ZoomConfig::from_env()?);
    let canonical = zoom.list_recordings(from, to).await?;

    let results = resolve(&load.records, canonical, &config);
    write_resolution_csv(&output, &load.records, &results)?;

    let mut tallies: BTreeMap<String, usize> = BTreeMap::new();
    for result in &results {
        *tallies.entry(result.confidence.to_string()).or_default() += 1;
    }
    for (confidence, count) in &tallies {
        info!("{confidence}: {count}");
    }
    info!("resolution written to {:?}", output);
    Ok(())
}

async fn run_process(uuid: &str, meta: RecordingMeta, output_dir: PathBuf) -> Result<()> {
    let zoom = ZoomClient::new(ZoomConfig::from_env()?);
    let transcriber = Transcriber::new(TranscriberConfig::from_env()?);
    let classifier = AnthropicClient::new(AnthropicConfig::from_env()?);

    let dirs = PipelineDirs::under(&output_dir);
    dirs.ensure()?;
    let accumulator = CsvAccumulator::open(&dirs.accumulator_path())?;

    let summary = process_recording(
        &zoom,
        &transcriber,
        &classifier,
        uuid,
        &meta,
        &dirs,
        &accumulator,
    )
    .await?;

    info!(
        "complete: {} sections ({} coverage gaps) in {:?}",
        summary.sections_found, summary.coverage_gaps, summary.structured_path
    );
    Ok(())
}

async fn run_batch_command(resolved: PathBuf, output_dir: PathBuf) -> Result<()> {
    let rows = read_resolution_csv(&resolved)?;
    let total = rows.len();

    let items: Vec<BatchItem> = rows
        .into_iter()
        .filter(|row| row.is_processable())
        .map(|row| BatchItem {
            uuid: row.uuid,
            meta: RecordingMeta {
                video_name: row.name,
                date: row.date,
                teacher: row.teacher,
            },
        })
        .collect();

    if items.len() < total {
        warn!(
            "skipping {} rows without a confident match",
            total - items.len()
        );
    }
    if items.is_empty() {
        warn!("nothing to process");
        return Ok(());
    }

    let zoom = ZoomClient::new(ZoomConfig::from_env()?);
    let transcriber = Transcriber::new(TranscriberConfig::from_env()?);
    let classifier = AnthropicClient::new(AnthropicConfig::from_env()?);

    let dirs = PipelineDirs::under(&output_dir);
    dirs.ensure()?;
    let accumulator = CsvAccumulator::open(&dirs.accumulator_path())?;

    let outcomes = run_batch(
        &zoom,
        &transcriber,
        &classifier,
        items,
        &dirs,
        &accumulator,
    )
    .await;

    let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
    info!("batch complete: {} ok, {} failed", succeeded, outcomes.len() - succeeded);
    for outcome in outcomes.iter().filter(|o| o.result.is_err()) {
        if let Err(e) = &outcome.result {
            warn!("{} ({}): {e:#}", outcome.video_name, outcome.uuid);
        }
    }
    Ok(())
}

async fn run_segment(transcript: PathBuf, meta: RecordingMeta, output_dir: PathBuf) -> Result<()> {
    let file = std::fs::File::open(&transcript)
        .with_context(|| format!("failed to open transcript {transcript:?}"))?;
    let whisper: WhisperResponse =
        serde_json::from_reader(file).context("failed to parse transcript JSON")?;

    let classifier = AnthropicClient::new(AnthropicConfig::from_env()?);

    let dirs = PipelineDirs::under(&output_dir);
    dirs.ensure()?;
    let accumulator = CsvAccumulator::open(&dirs.accumulator_path())?;

    let summary =
        segment_and_export(&classifier, &whisper, &meta, &dirs.structured, &accumulator).await?;

    info!(
        "complete: {} sections ({} coverage gaps) in {:?}",
        summary.sections_found, summary.coverage_gaps, summary.structured_path
    );
    Ok(())
}
