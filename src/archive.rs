//! Archive reader for KMZ containers
//!
//! A KMZ upload is a ZIP archive bundling one KML document with auxiliary
//! assets (icons, overlays). This module locates the KML entry and extracts
//! its text; everything else in the archive is ignored. The whole operation
//! is a pure transform of bytes to text with no disk or network side effects.

use crate::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

/// File extension of the annotation document inside the container
const DOCUMENT_EXTENSION: &str = "kml";

/// Tie-break policy when an archive contains more than one KML entry
///
/// Upstream tooling is inconsistent about which entry "wins", so the choice
/// is configurable rather than hard-coded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveEntryPolicy {
    /// Use the first matching entry in listing order
    #[default]
    FirstMatch,
    /// Fail with [`IngestError::AmbiguousAnnotationDocument`]
    RejectAmbiguous,
}

/// Extract the annotation document from a KMZ archive as text
///
/// Scans the entry list for names ending in `.kml` (case-insensitive,
/// directories excluded). Zero matches is a fatal
/// [`IngestError::NoAnnotationDocument`]; multiple matches are resolved by
/// `policy`. Entry bytes are decoded as UTF-8 with lossy replacement, the
/// container format's default encoding.
pub fn extract_annotation_document(bytes: &[u8], policy: ArchiveEntryPolicy) -> Result<String> {
    #[cfg(feature = "profiling")]
    profiling::scope!("archive::extract_annotation_document");

    let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;

    // First pass: collect indices of candidate entries in listing order
    let mut candidates = Vec::new();
    for i in 0..zip.len() {
        let entry = zip.by_index(i)?;
        let name = entry.name();
        if !name.ends_with('/') && has_document_extension(name) {
            candidates.push(i);
        }
    }

    let index = match (candidates.as_slice(), policy) {
        ([], _) => return Err(IngestError::NoAnnotationDocument),
        ([first], _) | ([first, ..], ArchiveEntryPolicy::FirstMatch) => *first,
        (many, ArchiveEntryPolicy::RejectAmbiguous) => {
            return Err(IngestError::AmbiguousAnnotationDocument(many.len()));
        }
    };

    // Second pass: decompress only the selected entry
    let mut entry = zip.by_index(index)?;
    let mut raw = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut raw)?;

    tracing::debug!(
        entry = entry.name(),
        bytes = raw.len(),
        "extracted annotation document from archive"
    );

    Ok(String::from_utf8_lossy(&raw).into_owned())
}

// Entry names are arbitrary UTF-8, so byte-slicing them is not safe;
// `Path::extension` respects char boundaries.
#[inline]
fn has_document_extension(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
}
