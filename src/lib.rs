pub mod align;
pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod transcribe;
pub mod zoom;

pub use align::{AlignmentReport, AlignmentResult, align, format_clock, parse_clock};
pub use error::ArchiveError;
pub use io::{
    CatalogLoad, CsvAccumulator, load_catalog, read_resolution_csv, write_canonical_catalog,
    write_resolution_csv, write_structured_json,
};
pub use llm::{AnthropicClient, AnthropicConfig};
pub use models::{
    CanonicalRecording, CatalogRecord, ClassifierResponse, MatchConfidence, MatchResult,
    SectionKind, SectionLabel, SectionRecord, Segmentation, Transcript, TranscriptSpan,
    VideoRecord, WhisperResponse,
};
pub use pipeline::{
    BatchItem, BatchOutcome, PipelineDirs, ProcessSummary, RecordingMeta, process_recording,
    run_batch, segment_and_export,
};
pub use resolver::{CandidatePool, ResolverConfig, resolve, topic_similarity};
pub use transcribe::{Transcriber, TranscriberConfig};
pub use zoom::{ZoomClient, ZoomConfig};
