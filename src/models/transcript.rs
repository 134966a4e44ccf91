use serde::{Deserialize, Serialize};

/// Verbose-JSON response from the transcription service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhisperResponse {
    /// Plain-text rendering of the whole recording
    #[serde(default)]
    pub text: String,
    /// Total audio duration in seconds
    #[serde(default)]
    pub duration: f64,
    /// Timestamped utterance segments
    #[serde(default)]
    pub segments: Vec<WhisperSegment>,
}

/// A single timestamped segment from the transcription service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhisperSegment {
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    /// The spoken text
    pub text: String,
}

/// One utterance unit with second offsets into the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSpan {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

impl TranscriptSpan {
    pub fn duration_seconds(&self) -> f64 {
        (self.end_seconds - self.start_seconds).max(0.0)
    }
}

/// Counts of spans the normalization pass had to touch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizationStats {
    /// Spans dropped for empty text or non-positive duration
    pub dropped: usize,
    /// Spans whose start was clipped to the previous span's end
    pub clipped: usize,
}

/// An ordered, non-overlapping sequence of transcript spans.
///
/// The transcription service promises ordered, non-overlapping output, but
/// construction does not trust it: spans are sorted by start and overlapping
/// starts are clipped to the previous span's end before anything downstream
/// sees them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub spans: Vec<TranscriptSpan>,
}

impl Transcript {
    pub fn from_spans(mut spans: Vec<TranscriptSpan>) -> (Self, NormalizationStats) {
        let mut stats = NormalizationStats::default();

        spans.retain(|span| {
            let keep = !span.text.trim().is_empty() && span.end_seconds > span.start_seconds;
            if !keep {
                stats.dropped += 1;
            }
            keep
        });

        spans.sort_by(|a, b| {
            a.start_seconds
                .partial_cmp(&b.start_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut normalized: Vec<TranscriptSpan> = Vec::with_capacity(spans.len());
        for mut span in spans {
            if let Some(prev) = normalized.last() {
                if span.start_seconds < prev.end_seconds {
                    span.start_seconds = prev.end_seconds;
                    if span.end_seconds <= span.start_seconds {
                        stats.dropped += 1;
                        continue;
                    }
                    stats.clipped += 1;
                }
            }
            normalized.push(span);
        }

        (Transcript { spans: normalized }, stats)
    }

    pub fn from_whisper(response: &WhisperResponse) -> (Self, NormalizationStats) {
        let spans = response
            .segments
            .iter()
            .map(|seg| TranscriptSpan {
                start_seconds: seg.start,
                end_seconds: seg.end,
                text: seg.text.trim().to_string(),
            })
            .collect();
        Self::from_spans(spans)
    }

    /// Time extent as (first start, last end), or None for an empty transcript.
    pub fn extent(&self) -> Option<(f64, f64)> {
        match (self.spans.first(), self.spans.last()) {
            (Some(first), Some(last)) => Some((first.start_seconds, last.end_seconds)),
            _ => None,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.spans.last().map(|s| s.end_seconds).unwrap_or(0.0)
    }

    /// All span texts joined with single spaces.
    pub fn full_text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: f64, end: f64, text: &str) -> TranscriptSpan {
        TranscriptSpan {
            start_seconds: start,
            end_seconds: end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_from_spans_sorts_by_start() {
        let (transcript, stats) = Transcript::from_spans(vec![
            span(10.0, 20.0, "second"),
            span(0.0, 10.0, "first"),
        ]);

        assert_eq!(transcript.spans[0].text, "first");
        assert_eq!(transcript.spans[1].text, "second");
        assert_eq!(stats, NormalizationStats::default());
    }

    #[test]
    fn test_from_spans_drops_malformed() {
        let (transcript, stats) = Transcript::from_spans(vec![
            span(0.0, 10.0, "ok"),
            span(10.0, 10.0, "zero duration"),
            span(12.0, 11.0, "negative"),
            span(15.0, 20.0, "   "),
        ]);

        assert_eq!(transcript.spans.len(), 1);
        assert_eq!(stats.dropped, 3);
    }

    #[test]
    fn test_from_spans_clips_overlap() {
        let (transcript, stats) = Transcript::from_spans(vec![
            span(0.0, 12.0, "a"),
            span(10.0, 20.0, "b"),
        ]);

        assert_eq!(transcript.spans[1].start_seconds, 12.0);
        assert_eq!(stats.clipped, 1);
    }

    #[test]
    fn test_from_spans_drops_contained_span() {
        let (transcript, stats) = Transcript::from_spans(vec![
            span(0.0, 30.0, "outer"),
            span(5.0, 10.0, "inner"),
        ]);

        assert_eq!(transcript.spans.len(), 1);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn test_from_whisper() {
        let json = r#"{
            "text": "Hello there. Welcome back.",
            "duration": 12.5,
            "segments": [
                {"start": 0.0, "end": 5.0, "text": " Hello there."},
                {"start": 5.0, "end": 12.5, "text": " Welcome back."}
            ]
        }"#;
        let response: WhisperResponse = serde_json::from_str(json).unwrap();
        let (transcript, stats) = Transcript::from_whisper(&response);

        assert_eq!(transcript.spans.len(), 2);
        assert_eq!(transcript.spans[0].text, "Hello there.");
        assert_eq!(transcript.full_text(), "Hello there. Welcome back.");
        assert_eq!(transcript.duration_seconds(), 12.5);
        assert_eq!(stats, NormalizationStats::default());
    }

    #[test]
    fn test_extent() {
        let (transcript, _) = Transcript::from_spans(vec![
            span(2.0, 10.0, "a"),
            span(10.0, 30.0, "b"),
        ]);
        assert_eq!(transcript.extent(), Some((2.0, 30.0)));

        let (empty, _) = Transcript::from_spans(vec![]);
        assert_eq!(empty.extent(), None);
    }
}
