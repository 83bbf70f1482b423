//! Trail Ingest - Geometry Ingestion for KML/KMZ Trail Uploads
//!
//! This library turns an uploaded KML or KMZ trail file into validated points,
//! tracks, and summary statistics, ready for preview and storage. The pipeline
//! runs synchronously once per upload with no shared state, so concurrent
//! invocations are safe by construction.
//!
//! # Architecture
//!
//! - **[`archive`]**: Locates and extracts the annotation document from a KMZ container
//! - **[`parse`]**: Parses KML into raw geometry features, with a manual tree-walk fallback
//! - **[`normalize`]**: Validates coordinates and flattens geometry variants into points and tracks
//! - **[`stats`]**: Computes distance, elevation, centroid, and bounds over the normalized data
//! - **[`pipeline`]**: Ties the stages together and produces an [`IngestionResult`]
//!
//! # Error Policy
//!
//! Only two conditions abort ingestion: a KMZ with no KML entry, and text that
//! is not well-formed markup. Everything else (unsupported geometry kinds,
//! out-of-range coordinates, degenerate tracks) degrades to per-feature
//! entries in [`IngestionResult::validation_errors`], so a file with 40 good
//! points and 2 malformed ones still yields 40 usable points.

pub mod archive;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod stats;
pub mod value;

// Public API exports
pub use archive::ArchiveEntryPolicy;
pub use normalize::{NormalizedGeometry, NormalizedPoint, NormalizedTrack};
pub use parse::{RawFeature, RawGeometry};
pub use pipeline::{Config, IngestionResult, ingest, ingest_document};
pub use stats::TrailStatistics;
pub use value::RawValue;

/// Error types for the ingestion pipeline
///
/// These are the fatal cases only; recoverable per-feature problems are
/// reported through [`IngestionResult::validation_errors`] instead.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("no annotation document (.kml) found in archive")]
    NoAnnotationDocument,

    #[error("archive contains {0} annotation documents")]
    AmbiguousAnnotationDocument(usize),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("document is not well-formed markup: {0}")]
    DocumentParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that the top-level entry points are accessible
        let _: fn(&str, &Config) -> Result<IngestionResult> = ingest_document;
        let _: fn() -> Config = Config::default;
    }

    #[test]
    fn test_error_display() {
        let err = IngestError::NoAnnotationDocument;
        assert!(err.to_string().contains(".kml"));

        let err = IngestError::AmbiguousAnnotationDocument(3);
        assert!(err.to_string().contains('3'));
    }
}
