use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A media kind the provider stored for a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileVariant {
    /// Full video (MP4)
    Video,
    /// Audio-only (M4A)
    AudioOnly,
}

impl FileVariant {
    /// Map a provider file-type string; kinds we never download map to None.
    pub fn from_file_type(file_type: &str) -> Option<Self> {
        match file_type.trim().to_ascii_uppercase().as_str() {
            "MP4" => Some(FileVariant::Video),
            "M4A" => Some(FileVariant::AudioOnly),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileVariant::Video => "mp4",
            FileVariant::AudioOnly => "m4a",
        }
    }
}

impl fmt::Display for FileVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileVariant::Video => f.write_str("MP4"),
            FileVariant::AudioOnly => f.write_str("M4A"),
        }
    }
}

/// One recording as the provider reports it: the uuid is the authoritative
/// identity, everything else is descriptive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecording {
    pub uuid: String,
    /// Same semantics as the catalog's secondary id - reused by recurring
    /// sessions, never unique on its own
    pub secondary_id: String,
    pub topic: String,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: u64,
    pub file_variants: BTreeSet<FileVariant>,
}

impl CanonicalRecording {
    /// Provider start time with the timezone stripped, for comparison with
    /// human-entered catalog timestamps.
    pub fn start_naive(&self) -> NaiveDateTime {
        self.start_time.naive_utc()
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds as f64 / 60.0
    }
}

/// How confidently a catalog row was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchConfidence {
    /// Single candidate, equal secondary id, inside the strict sub-window
    Exact,
    /// Single candidate survived the tie-breaks inside the wide window
    TimeWindow,
    /// Multiple candidates tied after every tie-break; left for review
    Ambiguous,
    /// Nothing inside the window
    None,
}

impl fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchConfidence::Exact => "EXACT",
            MatchConfidence::TimeWindow => "TIME_WINDOW",
            MatchConfidence::Ambiguous => "AMBIGUOUS",
            MatchConfidence::None => "NONE",
        };
        f.write_str(s)
    }
}

impl MatchConfidence {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "EXACT" => Some(MatchConfidence::Exact),
            "TIME_WINDOW" => Some(MatchConfidence::TimeWindow),
            "AMBIGUOUS" => Some(MatchConfidence::Ambiguous),
            "NONE" => Some(MatchConfidence::None),
            _ => None,
        }
    }

    /// Confident enough to feed downstream processing without review.
    pub fn is_confident(&self) -> bool {
        matches!(self, MatchConfidence::Exact | MatchConfidence::TimeWindow)
    }
}

/// Resolution outcome for one catalog row.
///
/// `candidates` is the audit trail of recordings considered. When a match was
/// made, the chosen recording is first; for Exact it is the only entry, for
/// Ambiguous all tied candidates are retained, and for None the list is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched_uuid: Option<String>,
    pub confidence: MatchConfidence,
    pub candidates: Vec<CanonicalRecording>,
}

impl MatchResult {
    /// The recording a confident match selected.
    pub fn chosen(&self) -> Option<&CanonicalRecording> {
        if self.matched_uuid.is_some() {
            self.candidates.first()
        } else {
            None
        }
    }
}
