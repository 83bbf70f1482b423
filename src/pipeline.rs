//! Top-level ingestion pipeline
//!
//! One call per uploaded file: archive extraction (for KMZ), parsing,
//! normalization, and statistics run as a single sequential chain with no
//! shared state between invocations. The result is a self-contained
//! [`IngestionResult`] meant to be serialized as JSON by the caller for
//! preview; persistence of the contained points and tracks is the caller's
//! concern.

use crate::archive::{self, ArchiveEntryPolicy};
use crate::normalize::{self, NormalizedPoint, NormalizedTrack};
use crate::stats::{self, TrailStatistics};
use crate::{Result, parse};
use serde::{Deserialize, Serialize};

/// Configuration for the ingestion pipeline
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// How to resolve archives with more than one annotation document
    pub archive_entry_policy: ArchiveEntryPolicy,
    /// Display cap for [`IngestionResult::displayed_errors`]. The full error
    /// list is always kept; this only limits what is shown.
    pub max_displayed_errors: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archive_entry_policy: ArchiveEntryPolicy::FirstMatch,
            max_displayed_errors: 20,
        }
    }
}

/// The pipeline's output for one upload attempt
///
/// `points` and `tracks` are in document order. `validation_errors` holds
/// parser warnings followed by normalizer rejections, one entry per
/// rejected or skipped feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    pub points: Vec<NormalizedPoint>,
    pub tracks: Vec<NormalizedTrack>,
    pub statistics: TrailStatistics,
    pub validation_errors: Vec<String>,
    /// Display cap carried over from [`Config::max_displayed_errors`];
    /// not part of the wire shape
    #[serde(skip, default = "default_display_cap")]
    display_cap: usize,
}

fn default_display_cap() -> usize {
    Config::default().max_displayed_errors
}

impl IngestionResult {
    /// Prefix of the error list capped for display
    ///
    /// The cap comes from the [`Config`] the result was ingested with; the
    /// full list stays available through `validation_errors`.
    #[inline]
    pub fn displayed_errors(&self) -> &[String] {
        &self.validation_errors[..self.validation_errors.len().min(self.display_cap)]
    }

    /// Full error count, independent of any display cap
    #[inline]
    pub fn error_count(&self) -> usize {
        self.validation_errors.len()
    }

    /// True when parsing succeeded but the document contained no usable
    /// geometry. Whether that counts as an error is the caller's policy.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.tracks.is_empty()
    }
}

/// Ingest an uploaded file
///
/// The filename decides the container format: `.kmz` (case-insensitive)
/// goes through the archive reader, anything else is treated as plain
/// annotation text.
pub fn ingest(bytes: &[u8], filename: &str, config: &Config) -> Result<IngestionResult> {
    #[cfg(feature = "profiling")]
    profiling::scope!("pipeline::ingest");

    let text = if is_archive(filename) {
        archive::extract_annotation_document(bytes, config.archive_entry_policy)?
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    };

    ingest_document(&text, config)
}

/// Ingest annotation text directly
pub fn ingest_document(text: &str, config: &Config) -> Result<IngestionResult> {
    #[cfg(feature = "profiling")]
    profiling::scope!("pipeline::ingest_document");

    let (features, warnings) = parse::parse_document(text)?;
    let normalized = normalize::normalize(&features);
    let statistics = stats::compute(&normalized.points, &normalized.tracks);

    let mut validation_errors = warnings;
    validation_errors.extend(normalized.rejections);

    tracing::debug!(
        points = normalized.points.len(),
        tracks = normalized.tracks.len(),
        errors = validation_errors.len(),
        "ingestion complete"
    );

    Ok(IngestionResult {
        points: normalized.points,
        tracks: normalized.tracks,
        statistics,
        validation_errors,
        display_cap: config.max_displayed_errors,
    })
}

#[inline]
fn is_archive(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("kmz"))
}
