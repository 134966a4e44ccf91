use std::collections::HashMap;

use chrono::Duration;
use tracing::debug;

use crate::models::{CanonicalRecording, CatalogRecord, MatchConfidence, MatchResult};

use super::similarity::topic_similarity;

/// Matching tolerances.
///
/// The defaults are operational choices, not contracts - both windows and
/// the similarity threshold are exposed on the CLI for tuning against a
/// particular catalog's sloppiness.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Candidate window around the cataloged start time
    pub window: Duration,
    /// Sub-window inside which a secondary-id match is classified Exact
    pub exact_window: Duration,
    /// Minimum topic similarity for the final tie-break
    pub topic_threshold: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            window: Duration::minutes(15),
            exact_window: Duration::minutes(2),
            topic_threshold: 0.6,
        }
    }
}

/// Secondary ids are compared with separators stripped, so "824 3329 0922"
/// and "82433290922" are the same id.
fn normalize_secondary_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Canonical recordings grouped by secondary id, with greedy consumption.
///
/// A recurring session produces many recordings sharing one secondary id,
/// so the grouping is one-to-many by construction. Once a recording is
/// chosen for a catalog row it leaves the pool, which keeps two catalog
/// rows from silently collapsing onto the same recording.
pub struct CandidatePool {
    recordings: Vec<CanonicalRecording>,
    by_secondary_id: HashMap<String, Vec<usize>>,
    consumed: Vec<bool>,
}

impl CandidatePool {
    pub fn new(recordings: Vec<CanonicalRecording>) -> Self {
        let mut by_secondary_id: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, rec) in recordings.iter().enumerate() {
            let key = normalize_secondary_id(&rec.secondary_id);
            if !key.is_empty() {
                by_secondary_id.entry(key).or_default().push(idx);
            }
        }
        let consumed = vec![false; recordings.len()];
        Self {
            recordings,
            by_secondary_id,
            consumed,
        }
    }

    fn available(&self) -> impl Iterator<Item = (usize, &CanonicalRecording)> {
        self.recordings
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.consumed[*idx])
    }

    fn get(&self, idx: usize) -> &CanonicalRecording {
        &self.recordings[idx]
    }

    fn in_group(&self, normalized_sid: &str, idx: usize) -> bool {
        self.by_secondary_id
            .get(normalized_sid)
            .is_some_and(|group| group.contains(&idx))
    }

    fn consume(&mut self, idx: usize) {
        self.consumed[idx] = true;
    }

    /// How many recordings share a secondary id.
    pub fn group_size(&self, secondary_id: &str) -> usize {
        self.by_secondary_id
            .get(&normalize_secondary_id(secondary_id))
            .map_or(0, Vec::len)
    }
}

/// Resolve every catalog row against the canonical set, one result per row,
/// input order preserved.
///
/// Ambiguity and absence are classified outcomes, not errors: a row with two
/// indistinguishable candidates comes back `Ambiguous` with both retained
/// for review, and nothing is ever guessed on the caller's behalf.
pub fn resolve(
    catalog: &[CatalogRecord],
    canonical: Vec<CanonicalRecording>,
    config: &ResolverConfig,
) -> Vec<MatchResult> {
    let mut pool = CandidatePool::new(canonical);

    catalog
        .iter()
        .map(|record| {
            let result = resolve_one(record, &mut pool, config);
            debug!(
                "'{}' ({}) resolved as {}",
                record.topic, record.approx_start_time, result.confidence
            );
            result
        })
        .collect()
}

fn resolve_one(
    record: &CatalogRecord,
    pool: &mut CandidatePool,
    config: &ResolverConfig,
) -> MatchResult {
    let window_seconds = config.window.num_seconds().abs();
    let exact_seconds = config.exact_window.num_seconds().abs();

    // Everything still in the pool whose start lies within the window,
    // closest first. Index is the tie key to keep ordering stable.
    let mut in_window: Vec<(usize, i64)> = pool
        .available()
        .filter_map(|(idx, rec)| {
            let delta = (rec.start_naive() - record.approx_start_time)
                .num_seconds()
                .abs();
            (delta <= window_seconds).then_some((idx, delta))
        })
        .collect();
    in_window.sort_by_key(|&(idx, delta)| (delta, idx));

    if in_window.is_empty() {
        return MatchResult {
            matched_uuid: None,
            confidence: MatchConfidence::None,
            candidates: Vec::new(),
        };
    }

    let considered: Vec<CanonicalRecording> = in_window
        .iter()
        .map(|&(idx, _)| pool.get(idx).clone())
        .collect();

    // Tie-break (a): restrict to the record's secondary-id group when the
    // group has anything in the window. Preference, not requirement.
    let record_sid = normalize_secondary_id(&record.secondary_id);
    let mut tied = in_window;
    if !record_sid.is_empty() {
        let same_group: Vec<(usize, i64)> = tied
            .iter()
            .copied()
            .filter(|&(idx, _)| pool.in_group(&record_sid, idx))
            .collect();
        if !same_group.is_empty() {
            tied = same_group;
        }
    }

    // Tie-break (b): closest start time.
    let best_delta = tied[0].1;
    tied.retain(|&(_, delta)| delta == best_delta);

    if tied.len() == 1 {
        let (idx, delta) = tied[0];
        let same_sid = !record_sid.is_empty() && pool.in_group(&record_sid, idx);
        let chosen = pool.get(idx).clone();
        pool.consume(idx);

        if same_sid && delta <= exact_seconds {
            return MatchResult {
                matched_uuid: Some(chosen.uuid.clone()),
                confidence: MatchConfidence::Exact,
                candidates: vec![chosen],
            };
        }
        return MatchResult {
            matched_uuid: Some(chosen.uuid.clone()),
            confidence: MatchConfidence::TimeWindow,
            candidates: chosen_first(chosen, considered),
        };
    }

    // Tie-break (c): topic similarity.
    let similar: Vec<(usize, i64)> = tied
        .iter()
        .copied()
        .filter(|&(idx, _)| {
            topic_similarity(&record.topic, &pool.get(idx).topic) >= config.topic_threshold
        })
        .collect();

    if similar.len() == 1 {
        let (idx, _) = similar[0];
        let chosen = pool.get(idx).clone();
        pool.consume(idx);
        return MatchResult {
            matched_uuid: Some(chosen.uuid.clone()),
            confidence: MatchConfidence::TimeWindow,
            candidates: chosen_first(chosen, considered),
        };
    }

    // Still tied after every tie-break: retain the tied candidates for
    // review and consume nothing.
    let final_tied = if similar.is_empty() { tied } else { similar };
    let candidates: Vec<CanonicalRecording> = final_tied
        .iter()
        .map(|&(idx, _)| pool.get(idx).clone())
        .collect();

    MatchResult {
        matched_uuid: None,
        confidence: MatchConfidence::Ambiguous,
        candidates,
    }
}

/// Audit list with the chosen recording first, then the rest of the
/// considered candidates by closeness.
fn chosen_first(
    chosen: CanonicalRecording,
    considered: Vec<CanonicalRecording>,
) -> Vec<CanonicalRecording> {
    let chosen_uuid = chosen.uuid.clone();
    let mut candidates = vec![chosen];
    candidates.extend(considered.into_iter().filter(|c| c.uuid != chosen_uuid));
    candidates
}
