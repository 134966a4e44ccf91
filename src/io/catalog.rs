use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use crate::error::ArchiveError;
use crate::models::{CanonicalRecording, CatalogRecord};

/// Column layout of the manually maintained catalog sheet.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Name of the Meeting", default)]
    name: String,
    #[serde(rename = "Email", default)]
    email: String,
    #[serde(rename = "Meeting ID", default)]
    meeting_id: String,
    #[serde(rename = "Date", default)]
    date: String,
    #[serde(rename = "Time", default)]
    time: String,
    #[serde(rename = "Meeting Type", default)]
    meeting_type: String,
    #[serde(rename = "Teacher", default)]
    teacher: String,
    #[serde(rename = "Share Link", default)]
    share_link: String,
}

impl CatalogRow {
    fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.share_link.trim().is_empty()
    }
}

/// Good rows plus the per-row failures; a bad row never sinks the batch.
#[derive(Debug)]
pub struct CatalogLoad {
    pub records: Vec<CatalogRecord>,
    pub errors: Vec<ArchiveError>,
}

/// Load the manual catalog CSV.
///
/// Blank rows are skipped. Rows missing or garbling their date/time are
/// reported with their row number and excluded; everything else flows
/// through even when optional columns are absent.
pub fn load_catalog(path: &Path) -> Result<CatalogLoad> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open catalog {path:?}"))?;

    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (idx, row) in reader.deserialize::<CatalogRow>().enumerate() {
        // +2: one for the header, one for 1-based numbering
        let row_number = idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                errors.push(ArchiveError::InputMalformed {
                    row: row_number,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if row.is_blank() {
            continue;
        }

        match record_from_row(row, row_number) {
            Ok(record) => records.push(record),
            Err(e) => errors.push(e),
        }
    }

    Ok(CatalogLoad { records, errors })
}

fn record_from_row(row: CatalogRow, row_number: usize) -> Result<CatalogRecord, ArchiveError> {
    let date = parse_catalog_date(&row.date).ok_or_else(|| ArchiveError::InputMalformed {
        row: row_number,
        reason: format!("missing or unparsable date {:?}", row.date),
    })?;
    let time = parse_catalog_time(&row.time).ok_or_else(|| ArchiveError::InputMalformed {
        row: row_number,
        reason: format!("missing or unparsable time {:?}", row.time),
    })?;

    let optional = |s: &str| {
        let trimmed = s.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    Ok(CatalogRecord {
        topic: row.name.trim().to_string(),
        secondary_id: row.meeting_id.trim().to_string(),
        approx_start_time: NaiveDateTime::new(date, time),
        share_token: share_token_from_link(&row.share_link),
        account_email: optional(&row.email),
        meeting_type: optional(&row.meeting_type),
        teacher: optional(&row.teacher),
    })
}

/// Catalogers enter dates in whatever form they feel like; try the shapes
/// that actually occur in the sheets.
fn parse_catalog_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }

    const FORMATS: [&str; 4] = ["%b %d %Y", "%B %d %Y", "%m/%d/%Y", "%Y-%m-%d"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

fn parse_catalog_time(raw: &str) -> Option<NaiveTime> {
    let cleaned = raw.trim().to_uppercase();
    if cleaned.is_empty() {
        return None;
    }

    const FORMATS: [&str; 4] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&cleaned, fmt).ok())
}

/// Pull the share token out of a share link cell.
///
/// Cells often carry a passcode on a following line or after a
/// "Passcode:" marker; only the first line's `/rec/share/<token>` part
/// identifies anything.
pub fn share_token_from_link(link: &str) -> Option<String> {
    let first_line = link.lines().next()?.trim();
    let without_passcode = first_line.split("Passcode:").next()?.trim();
    let token = without_passcode.split("/rec/share/").nth(1)?;
    let token = token.split(['?', '/']).next()?;
    (!token.is_empty()).then(|| token.to_string())
}

/// Export the provider's recordings to a reference CSV, one row each.
pub fn write_canonical_catalog(path: &Path, recordings: &[CanonicalRecording]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create catalog export {path:?}"))?;

    writer.write_record([
        "Meeting UUID",
        "Meeting ID",
        "Topic",
        "Start Time",
        "Duration (min)",
        "File Types",
    ])?;

    for rec in recordings {
        let file_types = rec
            .file_variants
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writer.write_record([
            rec.uuid.as_str(),
            rec.secondary_id.as_str(),
            rec.topic.as_str(),
            &rec.start_time.to_rfc3339(),
            &format!("{:.0}", rec.duration_minutes()),
            &file_types,
        ])?;
    }

    writer.flush().context("failed to flush catalog export")?;
    Ok(())
}
