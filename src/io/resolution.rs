use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::models::{CatalogRecord, MatchConfidence, MatchResult};

const RESOLUTION_HEADER: [&str; 10] = [
    "Name",
    "Date",
    "Teacher",
    "Meeting ID",
    "Share Token",
    "Matched UUID",
    "Canonical Topic",
    "Canonical Start Time",
    "Confidence",
    "Candidates",
];

/// Write the resolution review CSV, one row per catalog entry, catalog
/// order preserved. Ambiguous and unmatched rows keep their confidence and
/// candidate count so an operator can see exactly what needs a decision.
pub fn write_resolution_csv(
    path: &Path,
    catalog: &[CatalogRecord],
    results: &[MatchResult],
) -> Result<()> {
    ensure!(
        catalog.len() == results.len(),
        "catalog and results disagree: {} vs {}",
        catalog.len(),
        results.len()
    );

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create resolution export {path:?}"))?;
    writer.write_record(RESOLUTION_HEADER)?;

    for (record, result) in catalog.iter().zip(results) {
        let chosen = result.chosen();
        writer.write_record([
            record.topic.as_str(),
            &record.date_string(),
            record.teacher.as_deref().unwrap_or(""),
            record.secondary_id.as_str(),
            record.share_token.as_deref().unwrap_or(""),
            result.matched_uuid.as_deref().unwrap_or(""),
            chosen.map(|c| c.topic.as_str()).unwrap_or(""),
            &chosen
                .map(|c| c.start_time.to_rfc3339())
                .unwrap_or_default(),
            &result.confidence.to_string(),
            &result.candidates.len().to_string(),
        ])?;
    }

    writer.flush().context("failed to flush resolution export")?;
    Ok(())
}

/// One row read back from a resolution CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Date", default)]
    pub date: String,
    #[serde(rename = "Teacher", default)]
    pub teacher: String,
    #[serde(rename = "Matched UUID", default)]
    pub uuid: String,
    #[serde(rename = "Confidence", default)]
    pub confidence: String,
}

impl ResolvedRow {
    /// Resolved confidently enough to process without operator review.
    pub fn is_processable(&self) -> bool {
        !self.uuid.is_empty()
            && MatchConfidence::parse(&self.confidence).is_some_and(|c| c.is_confident())
    }
}

/// Read a resolution CSV back for batch processing.
pub fn read_resolution_csv(path: &Path) -> Result<Vec<ResolvedRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open resolution file {path:?}"))?;

    let mut rows = Vec::new();
    for row in reader.deserialize::<ResolvedRow>() {
        rows.push(row.context("malformed resolution row")?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CanonicalRecording;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::collections::BTreeSet;

    fn record(topic: &str) -> CatalogRecord {
        CatalogRecord {
            topic: topic.to_string(),
            secondary_id: "111".to_string(),
            approx_start_time: NaiveDate::from_ymd_opt(2020, 3, 22)
                .unwrap()
                .and_hms_opt(15, 30, 0)
                .unwrap(),
            share_token: Some("tok".to_string()),
            account_email: None,
            meeting_type: None,
            teacher: Some("Marwa".to_string()),
        }
    }

    fn matched(uuid: &str) -> MatchResult {
        MatchResult {
            matched_uuid: Some(uuid.to_string()),
            confidence: MatchConfidence::Exact,
            candidates: vec![CanonicalRecording {
                uuid: uuid.to_string(),
                secondary_id: "111".to_string(),
                topic: "Sunday Class".to_string(),
                start_time: Utc.with_ymd_and_hms(2020, 3, 22, 15, 30, 0).unwrap(),
                duration_seconds: 2700,
                file_variants: BTreeSet::new(),
            }],
        }
    }

    #[test]
    fn test_round_trip_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.csv");

        let catalog = vec![record("Ibn Battuta"), record("Unmatched Class")];
        let results = vec![
            matched("uuid-1"),
            MatchResult {
                matched_uuid: None,
                confidence: MatchConfidence::None,
                candidates: vec![],
            },
        ];

        write_resolution_csv(&path, &catalog, &results).unwrap();
        let rows = read_resolution_csv(&path).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Ibn Battuta");
        assert_eq!(rows[0].uuid, "uuid-1");
        assert!(rows[0].is_processable());
        assert_eq!(rows[1].confidence, "NONE");
        assert!(!rows[1].is_processable());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.csv");

        let err = write_resolution_csv(&path, &[record("A")], &[]);
        assert!(err.is_err());
    }
}
