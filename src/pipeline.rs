use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::align::align;
use crate::io::{CsvAccumulator, sanitize_name, write_structured_json};
use crate::llm::AnthropicClient;
use crate::models::{Transcript, VideoRecord, WhisperResponse};
use crate::transcribe::Transcriber;
use crate::zoom::ZoomClient;

/// Operator-supplied metadata for one recording.
#[derive(Debug, Clone)]
pub struct RecordingMeta {
    pub video_name: String,
    pub date: String,
    pub teacher: String,
}

/// Working directories for a processing run.
#[derive(Debug, Clone)]
pub struct PipelineDirs {
    pub recordings: PathBuf,
    pub transcripts: PathBuf,
    pub structured: PathBuf,
}

impl PipelineDirs {
    pub fn under(root: &Path) -> Self {
        Self {
            recordings: root.join("recordings"),
            transcripts: root.join("transcripts"),
            structured: root.join("structured_output"),
        }
    }

    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.recordings, &self.transcripts, &self.structured] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {dir:?}"))?;
        }
        Ok(())
    }

    /// Path of the shared tabular file.
    pub fn accumulator_path(&self) -> PathBuf {
        self.structured.join("all_videos_structured.csv")
    }
}

/// What one fully processed recording produced.
#[derive(Debug)]
pub struct ProcessSummary {
    pub video_name: String,
    pub structured_path: PathBuf,
    pub sections_found: usize,
    pub coverage_gaps: usize,
    pub rejected_categories: usize,
}

/// Run one recording end to end: download, transcribe, classify, align,
/// export. Fatal only for this recording; the caller decides whether other
/// recordings continue.
pub async fn process_recording(
    zoom: &ZoomClient,
    transcriber: &Transcriber,
    classifier: &AnthropicClient,
    uuid: &str,
    meta: &RecordingMeta,
    dirs: &PipelineDirs,
    accumulator: &CsvAccumulator,
) -> Result<ProcessSummary> {
    dirs.ensure()?;
    let stem = sanitize_name(&format!("{}_{}", meta.date, meta.video_name));

    info!("[{}] downloading", meta.video_name);
    let media = zoom.download_by_uuid(uuid, &dirs.recordings, &stem).await?;

    info!("[{}] transcribing", meta.video_name);
    let whisper = transcriber.transcribe(&media).await?;
    persist_transcript(&whisper, &dirs.transcripts, &stem)?;

    segment_and_export(classifier, &whisper, meta, &dirs.structured, accumulator).await
}

/// Classify, align and export an already-transcribed recording.
pub async fn segment_and_export(
    classifier: &AnthropicClient,
    whisper: &WhisperResponse,
    meta: &RecordingMeta,
    structured_dir: &Path,
    accumulator: &CsvAccumulator,
) -> Result<ProcessSummary> {
    let (transcript, stats) = Transcript::from_whisper(whisper);
    if stats.dropped > 0 || stats.clipped > 0 {
        warn!(
            "[{}] transcript normalization dropped {} and clipped {} spans",
            meta.video_name, stats.dropped, stats.clipped
        );
    }

    info!("[{}] classifying", meta.video_name);
    let raw = classifier.classify(&transcript).await?;
    let (segmentation, rejected) = raw.into_segmentation();
    for category in &rejected {
        warn!(
            "[{}] classifier returned unrecognized category {:?}; ignoring it",
            meta.video_name, category
        );
    }

    info!(
        "[{}] aligning {} labels against {} spans",
        meta.video_name,
        segmentation.labels.len(),
        transcript.spans.len()
    );
    let alignment = align(&transcript, &segmentation.labels);

    let duration_seconds = if whisper.duration > 0.0 {
        whisper.duration
    } else {
        transcript.duration_seconds()
    };
    let video = VideoRecord {
        video_name: meta.video_name.clone(),
        date: meta.date.clone(),
        teacher: meta.teacher.clone(),
        duration_minutes: (duration_seconds / 60.0 * 10.0).round() / 10.0,
        overall_summary: segmentation.overall_summary,
        detected_order: segmentation.detected_order,
        sections: alignment.sections,
    };

    let structured_path = write_structured_json(&video, structured_dir)?;
    accumulator.upsert(&video)?;

    info!(
        "[{}] exported {} sections to {:?}",
        meta.video_name,
        video.sections.len(),
        structured_path
    );

    Ok(ProcessSummary {
        video_name: meta.video_name.clone(),
        structured_path,
        sections_found: video.sections.len(),
        coverage_gaps: alignment.report.coverage_gaps.len(),
        rejected_categories: rejected.len(),
    })
}

fn persist_transcript(whisper: &WhisperResponse, dir: &Path, stem: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{stem}_transcript.json"));
    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create transcript file {path:?}"))?;
    serde_json::to_writer_pretty(file, whisper)
        .with_context(|| format!("failed to write transcript {path:?}"))?;
    Ok(path)
}

/// One recording queued for batch processing.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub uuid: String,
    pub meta: RecordingMeta,
}

/// Per-recording outcome of a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub video_name: String,
    pub uuid: String,
    pub result: Result<ProcessSummary>,
}

/// Process many recordings, continuing past per-recording failures and
/// collecting every outcome for the operator.
pub async fn run_batch(
    zoom: &ZoomClient,
    transcriber: &Transcriber,
    classifier: &AnthropicClient,
    items: Vec<BatchItem>,
    dirs: &PipelineDirs,
    accumulator: &CsvAccumulator,
) -> Vec<BatchOutcome> {
    let total = items.len();
    let mut outcomes = Vec::with_capacity(total);

    for (idx, item) in items.into_iter().enumerate() {
        info!("[{}/{}] {}", idx + 1, total, item.meta.video_name);
        let result = process_recording(
            zoom,
            transcriber,
            classifier,
            &item.uuid,
            &item.meta,
            dirs,
            accumulator,
        )
        .await;

        if let Err(e) = &result {
            warn!("[{}] failed: {e:#}", item.meta.video_name);
        }
        outcomes.push(BatchOutcome {
            video_name: item.meta.video_name,
            uuid: item.uuid,
            result,
        });
    }

    outcomes
}
