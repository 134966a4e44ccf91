use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CanonicalRecording, FileVariant};

/// One page of the provider's recording listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordingsPage {
    #[serde(default)]
    pub meetings: Vec<ZoomMeeting>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A recorded meeting as returned by the provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoomMeeting {
    pub uuid: String,
    /// The human-visible meeting number; recurring sessions reuse it
    pub id: u64,
    #[serde(default)]
    pub topic: String,
    pub start_time: DateTime<Utc>,
    /// Duration in minutes
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub share_url: String,
    #[serde(default)]
    pub recording_files: Vec<ZoomRecordingFile>,
}

/// One stored media file for a meeting.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoomRecordingFile {
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub file_size: u64,
}

impl ZoomMeeting {
    pub fn to_canonical(&self) -> CanonicalRecording {
        let file_variants: BTreeSet<FileVariant> = self
            .recording_files
            .iter()
            .filter_map(|f| FileVariant::from_file_type(&f.file_type))
            .collect();

        CanonicalRecording {
            uuid: self.uuid.clone(),
            secondary_id: self.id.to_string(),
            topic: self.topic.clone(),
            start_time: self.start_time,
            duration_seconds: self.duration * 60,
            file_variants,
        }
    }

    /// The preferred media file for download: full video when available,
    /// otherwise the audio-only track.
    pub fn preferred_file(&self) -> Option<(FileVariant, &ZoomRecordingFile)> {
        let mut audio = None;
        for file in &self.recording_files {
            match FileVariant::from_file_type(&file.file_type) {
                Some(FileVariant::Video) => return Some((FileVariant::Video, file)),
                Some(FileVariant::AudioOnly) => audio = Some(file),
                None => {}
            }
        }
        audio.map(|f| (FileVariant::AudioOnly, f))
    }
}
