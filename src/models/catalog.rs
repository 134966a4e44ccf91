use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One human-entered catalog row.
///
/// Identity is the fields as entered - there is no synthetic key. The
/// secondary id is the meeting number visible to participants, which a
/// recurring session reuses across every occurrence, so it alone can never
/// identify a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Meeting name as typed by the cataloger, not guaranteed unique
    pub topic: String,
    /// Human-visible meeting number, reused across occurrences
    pub secondary_id: String,
    /// Cataloged start, combined from the date and time columns; may be off
    /// by minutes from the provider's clock
    pub approx_start_time: NaiveDateTime,
    /// Token extracted from the share link, if one was recorded
    pub share_token: Option<String>,
    pub account_email: Option<String>,
    pub meeting_type: Option<String>,
    pub teacher: Option<String>,
}

impl CatalogRecord {
    /// The date portion as YYYY-MM-DD, used for export metadata.
    pub fn date_string(&self) -> String {
        self.approx_start_time.date().format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_date_string() {
        let record = CatalogRecord {
            topic: "Ibn Battuta 1 and 2".to_string(),
            secondary_id: "82433290922".to_string(),
            approx_start_time: NaiveDate::from_ymd_opt(2020, 3, 22)
                .unwrap()
                .and_hms_opt(15, 30, 0)
                .unwrap(),
            share_token: None,
            account_email: None,
            meeting_type: None,
            teacher: Some("Marwa".to_string()),
        };

        assert_eq!(record.date_string(), "2020-03-22");
    }
}
