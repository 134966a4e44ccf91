use thiserror::Error;

/// Failure taxonomy for archive processing.
///
/// Ambiguous or absent identity matches are not errors; they are classified
/// outcomes on `MatchResult`. Label-integrity findings (clipped overlaps,
/// skipped labels, coverage gaps) are carried on the alignment report and
/// logged as warnings. Every variant here is fatal for exactly one record,
/// never for a whole batch.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A catalog row that cannot be used (missing or unparsable date/time).
    #[error("catalog row {row}: {reason}")]
    InputMalformed { row: usize, reason: String },

    /// The provider has no recording under this identifier.
    #[error("recording {uuid} not found")]
    RecordingNotFound { uuid: String },

    /// The provider knows the identifier but the download cannot proceed
    /// (expired link, account mismatch, no usable media variant).
    #[error("retrieval failed for {uuid}: {reason}")]
    Retrieval { uuid: String, reason: String },

    /// A section category outside the closed set.
    #[error("unrecognized section category: {0:?}")]
    UnrecognizedCategory(String),

    /// Could not write a structured file or the tabular accumulator.
    #[error("export failed for {path}: {source}")]
    ExportIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
