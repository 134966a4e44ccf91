use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;
use crate::models::{SectionKind, VideoRecord};

/// Reduce a video name to something every filesystem accepts, the same way
/// for every run so re-exports land on the same file.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

/// Write one recording's structured JSON, overwriting any previous export.
pub fn write_structured_json(video: &VideoRecord, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|source| ArchiveError::ExportIo {
        path: dir.display().to_string(),
        source,
    })?;

    let path = dir.join(format!("{}_structured.json", sanitize_name(&video.video_name)));
    let file = File::create(&path).map_err(|source| ArchiveError::ExportIo {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::to_writer_pretty(file, video)
        .with_context(|| format!("failed to write {path:?}"))?;
    Ok(path)
}

/// One row of the shared wide CSV. A category the classifier did not detect
/// is an empty cell, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TabularRow {
    #[serde(rename = "Video_Name")]
    video_name: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Teacher")]
    teacher: String,
    #[serde(rename = "Duration_Minutes")]
    duration_minutes: f64,
    #[serde(rename = "Overall_Summary")]
    overall_summary: String,
    #[serde(rename = "Salam_Time_Ice_Breaker")]
    salam_ice_breaker: String,
    #[serde(rename = "Discussion_Topic")]
    discussion_topic: String,
    #[serde(rename = "Quran_Recitation")]
    quran_recitation: String,
    #[serde(rename = "Arabic")]
    arabic: String,
    #[serde(rename = "Worship")]
    worship: String,
}

impl TabularRow {
    fn from_video(video: &VideoRecord) -> Self {
        let section_text = |kind: SectionKind| {
            video
                .sections
                .get(&kind)
                .map(|s| s.text.clone())
                .unwrap_or_default()
        };

        Self {
            video_name: video.video_name.clone(),
            date: video.date.clone(),
            teacher: video.teacher.clone(),
            duration_minutes: video.duration_minutes,
            overall_summary: video.overall_summary.clone(),
            salam_ice_breaker: section_text(SectionKind::SalamIceBreaker),
            discussion_topic: section_text(SectionKind::DiscussionTopic),
            quran_recitation: section_text(SectionKind::QuranRecitation),
            arabic: section_text(SectionKind::Arabic),
            worship: section_text(SectionKind::Worship),
        }
    }
}

/// The shared tabular file, one row per recording, keyed by video name.
///
/// Re-exporting a recording replaces its row rather than appending a
/// duplicate, and the interior mutex serializes the replace when recordings
/// are exported concurrently. Existing rows are loaded on open so
/// idempotence also holds across runs.
pub struct CsvAccumulator {
    state: Mutex<AccumulatorState>,
}

struct AccumulatorState {
    path: PathBuf,
    rows: Vec<TabularRow>,
}

impl CsvAccumulator {
    pub fn open(path: &Path) -> Result<Self> {
        let rows = if path.exists() {
            let mut reader = csv::Reader::from_path(path)
                .with_context(|| format!("failed to open accumulator {path:?}"))?;
            reader
                .deserialize::<TabularRow>()
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("failed to read existing rows from {path:?}"))?
        } else {
            Vec::new()
        };

        Ok(Self {
            state: Mutex::new(AccumulatorState {
                path: path.to_path_buf(),
                rows,
            }),
        })
    }

    /// Insert or replace the row for this recording and rewrite the file.
    pub fn upsert(&self, video: &VideoRecord) -> Result<()> {
        let row = TabularRow::from_video(video);
        let mut state = self.state.lock().expect("accumulator lock poisoned");

        match state
            .rows
            .iter_mut()
            .find(|r| r.video_name == row.video_name)
        {
            Some(existing) => *existing = row,
            None => state.rows.push(row),
        }

        let mut writer = csv::Writer::from_path(&state.path)
            .with_context(|| format!("failed to rewrite accumulator {:?}", state.path))?;
        for row in &state.rows {
            writer.serialize(row)?;
        }
        writer.flush().context("failed to flush accumulator")?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("accumulator lock poisoned").rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionRecord;
    use std::collections::BTreeMap;

    fn video(name: &str, discussion_text: &str) -> VideoRecord {
        let mut sections = BTreeMap::new();
        sections.insert(
            SectionKind::DiscussionTopic,
            SectionRecord {
                text: discussion_text.to_string(),
                word_count: discussion_text.split_whitespace().count(),
                start_time: "02:30".to_string(),
                end_time: "15:45".to_string(),
                summary: "Main lesson".to_string(),
            },
        );
        VideoRecord {
            video_name: name.to_string(),
            date: "2020-03-22".to_string(),
            teacher: "Marwa".to_string(),
            duration_minutes: 45.2,
            overall_summary: "A class about patience".to_string(),
            detected_order: vec![SectionKind::DiscussionTopic],
            sections,
        }
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Ibn Battuta 1 and 2"), "Ibn_Battuta_1_and_2");
        assert_eq!(sanitize_name("What? A/B: test!"), "What_AB_test");
        assert_eq!(sanitize_name("  padded  "), "padded");
    }

    #[test]
    fn test_structured_json_overwrites() {
        let dir = tempfile::tempdir().unwrap();

        let first = write_structured_json(&video("My Class", "v1"), dir.path()).unwrap();
        let second = write_structured_json(&video("My Class", "v2"), dir.path()).unwrap();

        assert_eq!(first, second);
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);

        let reloaded: VideoRecord =
            serde_json::from_reader(File::open(&second).unwrap()).unwrap();
        assert_eq!(reloaded.sections[&SectionKind::DiscussionTopic].text, "v2");
    }

    #[test]
    fn test_upsert_replaces_not_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all_videos.csv");
        let accumulator = CsvAccumulator::open(&path).unwrap();

        accumulator.upsert(&video("My Class", "first version")).unwrap();
        accumulator.upsert(&video("Other Class", "other")).unwrap();
        accumulator.upsert(&video("My Class", "second version")).unwrap();

        assert_eq!(accumulator.len(), 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<TabularRow> = reader
            .deserialize()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].video_name, "My Class");
        assert_eq!(rows[0].discussion_topic, "second version");
        assert_eq!(rows[1].video_name, "Other Class");
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all_videos.csv");

        {
            let accumulator = CsvAccumulator::open(&path).unwrap();
            accumulator.upsert(&video("My Class", "v1")).unwrap();
        }

        let reopened = CsvAccumulator::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        reopened.upsert(&video("My Class", "v2")).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_absent_category_is_empty_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all_videos.csv");
        let accumulator = CsvAccumulator::open(&path).unwrap();

        accumulator.upsert(&video("My Class", "lesson text")).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<TabularRow> = reader
            .deserialize()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(rows[0].quran_recitation, "");
        assert_eq!(rows[0].worship, "");
        assert_eq!(rows[0].discussion_topic, "lesson text");
    }

    #[test]
    fn test_concurrent_upserts_keep_one_row_per_video() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all_videos.csv");
        let accumulator = std::sync::Arc::new(CsvAccumulator::open(&path).unwrap());

        std::thread::scope(|scope| {
            for i in 0..8 {
                let accumulator = accumulator.clone();
                scope.spawn(move || {
                    accumulator
                        .upsert(&video("Contested Class", &format!("version {i}")))
                        .unwrap();
                });
            }
        });

        assert_eq!(accumulator.len(), 1);
    }
}
