use std::collections::BTreeMap;

use tracing::warn;

use crate::models::{SectionKind, SectionLabel, SectionRecord, Transcript};

use super::timestamp::{format_clock, parse_clock};

/// Ignore sub-millisecond slivers when hunting for coverage gaps.
const GAP_EPSILON: f64 = 0.001;

/// A label with parsed bounds, possibly clipped against its predecessor.
#[derive(Debug, Clone)]
struct TimedLabel {
    kind: SectionKind,
    start: f64,
    end: f64,
    summary: String,
}

/// A later label whose start was pulled forward off an earlier label.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapClip {
    pub earlier: SectionKind,
    pub later: SectionKind,
    pub clipped_from: f64,
    pub clipped_to: f64,
}

/// Transcript time no label claims.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageGap {
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// Integrity findings from one alignment run. Everything here is
/// informational: alignment always produces whatever sections it can.
#[derive(Debug, Default)]
pub struct AlignmentReport {
    /// Labels dropped before attribution, with the reason
    pub skipped_labels: Vec<String>,
    pub overlap_clips: Vec<OverlapClip>,
    pub coverage_gaps: Vec<CoverageGap>,
    /// Spans claimed by no label under the majority-overlap rule
    pub unattributed_spans: usize,
}

/// Sections plus the integrity report for one recording.
#[derive(Debug)]
pub struct AlignmentResult {
    pub sections: BTreeMap<SectionKind, SectionRecord>,
    pub report: AlignmentReport,
}

/// Slice a transcript into per-category text blocks.
///
/// Attribution follows the majority-overlap rule: a span belongs to the
/// label holding the largest share of it, and only if that share is at
/// least half the span's duration; a span split exactly in half goes to the
/// later label. Each span lands in at most one section, so classifier
/// boundaries that cut through an utterance neither duplicate nor drop it.
pub fn align(transcript: &Transcript, labels: &[SectionLabel]) -> AlignmentResult {
    let mut report = AlignmentReport::default();

    let mut timed = parse_labels(labels, &mut report);
    timed.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    clip_overlaps(&mut timed, &mut report);
    detect_gaps(transcript, &timed, &mut report);

    // Attribute each span to the label with majority overlap.
    let mut attributed: Vec<Vec<&str>> = vec![Vec::new(); timed.len()];
    for span in &transcript.spans {
        let mut best: Option<(usize, f64)> = None;
        for (idx, label) in timed.iter().enumerate() {
            let overlap =
                (span.end_seconds.min(label.end) - span.start_seconds.max(label.start)).max(0.0);
            if overlap <= 0.0 {
                continue;
            }
            // >= so that an exact half-half split resolves to the later label
            if best.is_none_or(|(_, best_overlap)| overlap >= best_overlap) {
                best = Some((idx, overlap));
            }
        }

        match best {
            Some((idx, overlap)) if overlap * 2.0 >= span.duration_seconds() => {
                attributed[idx].push(span.text.as_str());
            }
            _ => report.unattributed_spans += 1,
        }
    }

    // Merge repeated categories: chronological text order, union extent.
    let mut sections: BTreeMap<SectionKind, SectionRecord> = BTreeMap::new();
    for (label, texts) in timed.iter().zip(attributed) {
        let text = texts.join(" ");
        match sections.get_mut(&label.kind) {
            Some(existing) => {
                if !text.is_empty() {
                    if !existing.text.is_empty() {
                        existing.text.push(' ');
                    }
                    existing.text.push_str(&text);
                }
                existing.word_count = existing.text.split_whitespace().count();
                existing.end_time = format_clock(label.end);
                if !label.summary.is_empty() {
                    if !existing.summary.is_empty() {
                        existing.summary.push_str("; ");
                    }
                    existing.summary.push_str(&label.summary);
                }
            }
            None => {
                let word_count = text.split_whitespace().count();
                sections.insert(
                    label.kind,
                    SectionRecord {
                        text,
                        word_count,
                        start_time: format_clock(label.start),
                        end_time: format_clock(label.end),
                        summary: label.summary.clone(),
                    },
                );
            }
        }
    }

    AlignmentResult { sections, report }
}

fn parse_labels(labels: &[SectionLabel], report: &mut AlignmentReport) -> Vec<TimedLabel> {
    let mut timed = Vec::with_capacity(labels.len());

    for label in labels {
        let start = match parse_clock(&label.start_time) {
            Ok(s) => s,
            Err(e) => {
                let reason = format!("'{}' skipped: {e}", label.kind);
                warn!("{reason}");
                report.skipped_labels.push(reason);
                continue;
            }
        };
        let end = match parse_clock(&label.end_time) {
            Ok(s) => s,
            Err(e) => {
                let reason = format!("'{}' skipped: {e}", label.kind);
                warn!("{reason}");
                report.skipped_labels.push(reason);
                continue;
            }
        };
        if end <= start {
            let reason = format!(
                "'{}' skipped: end {} not after start {}",
                label.kind, label.end_time, label.start_time
            );
            warn!("{reason}");
            report.skipped_labels.push(reason);
            continue;
        }
        timed.push(TimedLabel {
            kind: label.kind,
            start,
            end,
            summary: label.summary.clone(),
        });
    }

    timed
}

/// Resolve overlapping labels by pulling the later label's start up to the
/// running end of everything before it. A label swallowed whole is dropped,
/// which keeps any stretch of transcript claimable by one label only.
fn clip_overlaps(timed: &mut Vec<TimedLabel>, report: &mut AlignmentReport) {
    let mut kept: Vec<TimedLabel> = Vec::with_capacity(timed.len());
    let mut covered_until = f64::NEG_INFINITY;
    let mut covered_by = None;

    for mut label in timed.drain(..) {
        if label.start < covered_until {
            let clip = OverlapClip {
                earlier: covered_by.unwrap_or(label.kind),
                later: label.kind,
                clipped_from: label.start,
                clipped_to: covered_until,
            };
            warn!(
                "'{}' overlaps '{}': start clipped from {} to {}",
                clip.later,
                clip.earlier,
                format_clock(clip.clipped_from),
                format_clock(clip.clipped_to),
            );
            label.start = covered_until;
            report.overlap_clips.push(clip);

            if label.end <= label.start {
                let reason = format!("'{}' skipped: clipped to nothing", label.kind);
                warn!("{reason}");
                report.skipped_labels.push(reason);
                continue;
            }
        }
        if label.end > covered_until {
            covered_until = label.end;
            covered_by = Some(label.kind);
        }
        kept.push(label);
    }

    *timed = kept;
}

fn detect_gaps(transcript: &Transcript, timed: &[TimedLabel], report: &mut AlignmentReport) {
    let Some((extent_start, extent_end)) = transcript.extent() else {
        return;
    };

    let mut cursor = extent_start;
    for label in timed {
        let start = label.start.clamp(extent_start, extent_end);
        let end = label.end.clamp(extent_start, extent_end);
        if start > cursor + GAP_EPSILON {
            report.coverage_gaps.push(CoverageGap {
                start_seconds: cursor,
                end_seconds: start,
            });
        }
        cursor = cursor.max(end);
    }
    if extent_end > cursor + GAP_EPSILON {
        report.coverage_gaps.push(CoverageGap {
            start_seconds: cursor,
            end_seconds: extent_end,
        });
    }

    for gap in &report.coverage_gaps {
        warn!(
            "no label claims {} - {}",
            format_clock(gap.start_seconds),
            format_clock(gap.end_seconds)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TranscriptSpan;

    fn transcript(spans: &[(f64, f64, &str)]) -> Transcript {
        let (transcript, stats) = Transcript::from_spans(
            spans
                .iter()
                .map(|&(start, end, text)| TranscriptSpan {
                    start_seconds: start,
                    end_seconds: end,
                    text: text.to_string(),
                })
                .collect(),
        );
        assert_eq!(stats.dropped, 0);
        transcript
    }

    fn label(kind: SectionKind, start: &str, end: &str) -> SectionLabel {
        SectionLabel {
            kind,
            start_time: start.to_string(),
            end_time: end.to_string(),
            summary: String::new(),
        }
    }

    #[test]
    fn test_boundary_spans_follow_majority_overlap() {
        let transcript = transcript(&[
            (0.0, 150.0, "Welcome everyone"),
            (150.0, 1500.0, "Today we discuss Surah Al-Kahf"),
            (1500.0, 1800.0, "Let's recite together"),
        ]);
        let labels = vec![
            label(SectionKind::SalamIceBreaker, "00:00", "02:30"),
            label(SectionKind::QuranRecitation, "02:30", "30:00"),
        ];

        let result = align(&transcript, &labels);

        assert_eq!(
            result.sections[&SectionKind::SalamIceBreaker].text,
            "Welcome everyone"
        );
        assert_eq!(
            result.sections[&SectionKind::QuranRecitation].text,
            "Today we discuss Surah Al-Kahf Let's recite together"
        );
        assert_eq!(result.report.unattributed_spans, 0);
        assert!(result.report.coverage_gaps.is_empty());
    }

    #[test]
    fn test_half_split_span_goes_to_later_label() {
        let transcript = transcript(&[(100.0, 200.0, "straddling the boundary")]);
        let labels = vec![
            label(SectionKind::DiscussionTopic, "00:00", "02:30"),
            label(SectionKind::Worship, "02:30", "05:00"),
        ];

        let result = align(&transcript, &labels);

        assert!(!result.sections.contains_key(&SectionKind::DiscussionTopic)
            || result.sections[&SectionKind::DiscussionTopic].text.is_empty());
        assert_eq!(
            result.sections[&SectionKind::Worship].text,
            "straddling the boundary"
        );
    }

    #[test]
    fn test_full_coverage_round_trips_transcript_text() {
        let transcript = transcript(&[
            (0.0, 60.0, "salam everyone how are you"),
            (60.0, 120.0, "let us begin"),
            (120.0, 300.0, "today's topic is patience"),
            (300.0, 420.0, "now recite with me"),
        ]);
        let labels = vec![
            label(SectionKind::SalamIceBreaker, "00:00", "02:00"),
            label(SectionKind::DiscussionTopic, "02:00", "05:00"),
            label(SectionKind::QuranRecitation, "05:00", "07:00"),
        ];

        let result = align(&transcript, &labels);

        // Chronological concatenation reproduces the transcript exactly:
        // nothing duplicated, nothing dropped.
        let mut ordered: Vec<&SectionRecord> = result.sections.values().collect();
        ordered.sort_by_key(|s| parse_clock(&s.start_time).unwrap() as u64);
        let joined = ordered
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, transcript.full_text());
        assert_eq!(result.report.unattributed_spans, 0);
        assert!(result.report.coverage_gaps.is_empty());
        assert!(result.report.overlap_clips.is_empty());
    }

    #[test]
    fn test_overlapping_labels_are_clipped_not_duplicated() {
        let transcript = transcript(&[
            (0.0, 500.0, "first block"),
            (500.0, 700.0, "shared stretch"),
            (700.0, 1200.0, "second block"),
        ]);
        // Discussion claims 00:00-10:30, Quran claims 10:00-20:00; the
        // later label must give up the contested half-minute.
        let labels = vec![
            label(SectionKind::DiscussionTopic, "00:00", "10:30"),
            label(SectionKind::QuranRecitation, "10:00", "20:00"),
        ];

        let result = align(&transcript, &labels);

        assert_eq!(result.report.overlap_clips.len(), 1);
        let clip = &result.report.overlap_clips[0];
        assert_eq!(clip.later, SectionKind::QuranRecitation);
        assert_eq!(clip.clipped_from, 600.0);
        assert_eq!(clip.clipped_to, 630.0);

        // No span text may appear in two sections.
        let discussion = &result.sections[&SectionKind::DiscussionTopic].text;
        let quran = &result.sections[&SectionKind::QuranRecitation].text;
        assert!(discussion.contains("shared stretch"));
        assert!(!quran.contains("shared stretch"));
        assert!(quran.contains("second block"));
    }

    #[test]
    fn test_repeated_category_merges_chronologically() {
        let transcript = transcript(&[
            (0.0, 100.0, "first discussion part"),
            (100.0, 200.0, "quran in the middle"),
            (200.0, 300.0, "second discussion part"),
        ]);
        let labels = vec![
            label(SectionKind::DiscussionTopic, "00:00", "01:40"),
            label(SectionKind::QuranRecitation, "01:40", "03:20"),
            label(SectionKind::DiscussionTopic, "03:20", "05:00"),
        ];

        let result = align(&transcript, &labels);

        let discussion = &result.sections[&SectionKind::DiscussionTopic];
        assert_eq!(discussion.text, "first discussion part second discussion part");
        assert_eq!(discussion.word_count, 6);
        assert_eq!(discussion.start_time, "00:00");
        assert_eq!(discussion.end_time, "05:00");
    }

    #[test]
    fn test_degenerate_label_skipped() {
        let transcript = transcript(&[(0.0, 60.0, "hello")]);
        let labels = vec![
            label(SectionKind::Arabic, "02:00", "02:00"),
            label(SectionKind::Worship, "03:00", "01:00"),
            label(SectionKind::SalamIceBreaker, "bogus", "01:00"),
            label(SectionKind::DiscussionTopic, "00:00", "01:00"),
        ];

        let result = align(&transcript, &labels);

        assert_eq!(result.report.skipped_labels.len(), 3);
        assert_eq!(result.sections.len(), 1);
        assert!(result.sections.contains_key(&SectionKind::DiscussionTopic));
    }

    #[test]
    fn test_coverage_gap_is_reported_not_fixed() {
        let transcript = transcript(&[
            (0.0, 60.0, "covered"),
            (60.0, 120.0, "nobody claims this"),
            (120.0, 180.0, "covered again"),
        ]);
        let labels = vec![
            label(SectionKind::SalamIceBreaker, "00:00", "01:00"),
            label(SectionKind::Worship, "02:00", "03:00"),
        ];

        let result = align(&transcript, &labels);

        assert_eq!(
            result.report.coverage_gaps,
            vec![CoverageGap {
                start_seconds: 60.0,
                end_seconds: 120.0
            }]
        );
        assert_eq!(result.report.unattributed_spans, 1);
        assert_eq!(result.sections.len(), 2);
    }

    #[test]
    fn test_word_count_matches_whitespace_tokens() {
        let transcript = transcript(&[(0.0, 90.0, "  one   two\tthree  ")]);
        let labels = vec![label(SectionKind::Arabic, "00:00", "02:00")];

        let result = align(&transcript, &labels);

        let section = &result.sections[&SectionKind::Arabic];
        assert_eq!(section.word_count, section.text.split_whitespace().count());
        assert_eq!(section.word_count, 3);
    }

    #[test]
    fn test_label_with_no_spans_yields_empty_section() {
        let transcript = transcript(&[(0.0, 60.0, "hello")]);
        let labels = vec![
            label(SectionKind::SalamIceBreaker, "00:00", "01:00"),
            label(SectionKind::Worship, "40:00", "45:00"),
        ];

        let result = align(&transcript, &labels);

        let worship = &result.sections[&SectionKind::Worship];
        assert!(worship.text.is_empty());
        assert_eq!(worship.word_count, 0);
    }
}
