use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// The five section categories a class recording is divided into.
///
/// The set is closed: category strings coming back from the classifier are
/// validated against it at the boundary, so a typo fails loudly instead of
/// propagating as a sixth phantom category. Enum order is also the column
/// order of the tabular export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    #[serde(rename = "Salam Time/Ice Breaker")]
    SalamIceBreaker,
    #[serde(rename = "Discussion Topic")]
    DiscussionTopic,
    #[serde(rename = "Quran Recitation")]
    QuranRecitation,
    #[serde(rename = "Arabic")]
    Arabic,
    #[serde(rename = "Worship")]
    Worship,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::SalamIceBreaker,
        SectionKind::DiscussionTopic,
        SectionKind::QuranRecitation,
        SectionKind::Arabic,
        SectionKind::Worship,
    ];

    /// The display name used by the classifier and the structured JSON keys.
    pub fn display_name(&self) -> &'static str {
        match self {
            SectionKind::SalamIceBreaker => "Salam Time/Ice Breaker",
            SectionKind::DiscussionTopic => "Discussion Topic",
            SectionKind::QuranRecitation => "Quran Recitation",
            SectionKind::Arabic => "Arabic",
            SectionKind::Worship => "Worship",
        }
    }

    /// The CSV column header for this category.
    pub fn column_name(&self) -> &'static str {
        match self {
            SectionKind::SalamIceBreaker => "Salam_Time_Ice_Breaker",
            SectionKind::DiscussionTopic => "Discussion_Topic",
            SectionKind::QuranRecitation => "Quran_Recitation",
            SectionKind::Arabic => "Arabic",
            SectionKind::Worship => "Worship",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SectionKind {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SectionKind::ALL
            .iter()
            .find(|kind| kind.display_name().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| ArchiveError::UnrecognizedCategory(s.to_string()))
    }
}

/// One time-range label produced by the classifier, already validated
/// against the closed category set. Times are kept as the classifier's
/// clock strings ("MM:SS" or "HH:MM:SS"); the aligner parses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionLabel {
    pub kind: SectionKind,
    pub start_time: String,
    pub end_time: String,
    pub summary: String,
}

/// The text slice attributed to one (recording, category) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub text: String,
    pub word_count: usize,
    pub start_time: String,
    pub end_time: String,
    pub summary: String,
}

/// Everything persisted for one recording: metadata plus the section map.
///
/// Categories the classifier did not detect are simply absent from
/// `sections` - absence is the signal, never an empty placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_name: String,
    pub date: String,
    pub teacher: String,
    pub duration_minutes: f64,
    pub overall_summary: String,
    pub detected_order: Vec<SectionKind>,
    pub sections: BTreeMap<SectionKind, SectionRecord>,
}

/// Raw classifier output, category names still unvalidated strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierResponse {
    #[serde(default)]
    pub sections: Vec<RawSectionLabel>,
    #[serde(default)]
    pub overall_summary: String,
    #[serde(default)]
    pub detected_order: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSectionLabel {
    #[serde(rename = "type")]
    pub kind: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub summary: String,
}

/// Classifier output after boundary validation.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub labels: Vec<SectionLabel>,
    pub overall_summary: String,
    pub detected_order: Vec<SectionKind>,
}

impl ClassifierResponse {
    /// Validate category names against the closed set.
    ///
    /// Labels and order entries with unrecognized categories are dropped and
    /// returned separately so the caller can report them; they are never
    /// silently accepted.
    pub fn into_segmentation(self) -> (Segmentation, Vec<String>) {
        let mut rejected = Vec::new();
        let mut labels = Vec::new();

        for raw in self.sections {
            match raw.kind.parse::<SectionKind>() {
                Ok(kind) => labels.push(SectionLabel {
                    kind,
                    start_time: raw.start_time,
                    end_time: raw.end_time,
                    summary: raw.summary,
                }),
                Err(_) => rejected.push(raw.kind),
            }
        }

        let mut detected_order = Vec::new();
        for name in self.detected_order {
            match name.parse::<SectionKind>() {
                Ok(kind) => {
                    if !detected_order.contains(&kind) {
                        detected_order.push(kind);
                    }
                }
                Err(_) => rejected.push(name),
            }
        }

        (
            Segmentation {
                labels,
                overall_summary: self.overall_summary,
                detected_order,
            },
            rejected,
        )
    }
}
