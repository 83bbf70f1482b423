//! Annotation document parser
//!
//! Parses KML text into a flat, document-ordered sequence of [`RawFeature`]
//! records. The primary path walks the typed tree produced by the `kml`
//! crate; when that walk visits no placemark at all, the parser retries once
//! with a manual walk over generic elements, tokenizing coordinate text by
//! hand. The only fatal outcome is text that is not well-formed markup;
//! every other anomaly degrades to a per-feature warning.

use crate::value::RawValue;
use crate::{IngestError, Result};
use kml::Kml;
use kml::types::{Coord, Element, Geometry};

/// Raw geometry extracted from a placemark, before validation
///
/// Coordinate nesting depth follows the kind: one vertex for a point, a
/// vertex list for a line, and a list of lines (or rings) for the multi-part
/// kinds. Vertex arity is preserved so the normalizer can reject vertices
/// with fewer than two numeric values.
#[derive(Clone, Debug, PartialEq)]
pub enum RawGeometry {
    Point(Vec<f64>),
    LineString(Vec<Vec<f64>>),
    MultiLineString(Vec<Vec<Vec<f64>>>),
    Polygon(Vec<Vec<Vec<f64>>>),
}

impl RawGeometry {
    /// Human-readable kind label, used in validation messages
    pub fn kind(&self) -> &'static str {
        match self {
            RawGeometry::Point(_) => "Point",
            RawGeometry::LineString(_) => "LineString",
            RawGeometry::MultiLineString(_) => "MultiLineString",
            RawGeometry::Polygon(_) => "Polygon",
        }
    }
}

/// A single placemark-like feature in document order
#[derive(Clone, Debug, PartialEq)]
pub struct RawFeature {
    pub name: RawValue,
    pub description: RawValue,
    pub geometry: RawGeometry,
}

/// Parse an annotation document into raw features plus per-feature warnings
///
/// Returns [`IngestError::DocumentParse`] only for structurally broken
/// markup. Warnings are threaded through the walk as an explicit accumulator
/// and returned alongside the features.
pub fn parse_document(text: &str) -> Result<(Vec<RawFeature>, Vec<String>)> {
    #[cfg(feature = "profiling")]
    profiling::scope!("parse::parse_document");

    let kml: Kml = text
        .parse()
        .map_err(|e: kml::Error| IngestError::DocumentParse(e.to_string()))?;

    // Primary path: typed placemark walk. An explicit `None` means the walk
    // saw no placemark-like node, which triggers exactly one fallback pass.
    if let Some(extraction) = extract_typed(&kml) {
        return Ok(extraction);
    }

    tracing::debug!("typed extraction found no placemarks, retrying with manual element walk");
    let mut features = Vec::new();
    let mut warnings = Vec::new();
    walk_untyped(&kml, &mut features, &mut warnings);
    Ok((features, warnings))
}

/// Typed extraction over the parsed tree
///
/// Returns `None` when no placemark-like node was visited, signalling the
/// caller to fall back to the manual walk.
fn extract_typed(kml: &Kml) -> Option<(Vec<RawFeature>, Vec<String>)> {
    let mut features = Vec::new();
    let mut warnings = Vec::new();
    let mut placemarks_seen = 0usize;
    walk_typed(kml, &mut features, &mut warnings, &mut placemarks_seen);

    if placemarks_seen == 0 {
        None
    } else {
        Some((features, warnings))
    }
}

fn walk_typed(
    node: &Kml,
    features: &mut Vec<RawFeature>,
    warnings: &mut Vec<String>,
    placemarks_seen: &mut usize,
) {
    match node {
        Kml::KmlDocument(doc) => {
            for element in &doc.elements {
                walk_typed(element, features, warnings, placemarks_seen);
            }
        }
        Kml::Document { elements, .. } => {
            for element in elements {
                walk_typed(element, features, warnings, placemarks_seen);
            }
        }
        Kml::Folder { elements, .. } => {
            for element in elements {
                walk_typed(element, features, warnings, placemarks_seen);
            }
        }
        Kml::Placemark(placemark) => {
            *placemarks_seen += 1;
            let name = RawValue::from_content(placemark.name.clone());
            let description = RawValue::from_content(placemark.description.clone());
            match &placemark.geometry {
                Some(geometry) => convert_geometry(geometry, &name, &description, features, warnings),
                None => {
                    tracing::warn!(name = %name.to_text("unnamed"), "placemark has no geometry, skipping");
                    warnings.push(format!(
                        "skipped \"{}\": placemark has no geometry",
                        name.to_text("unnamed")
                    ));
                }
            }
        }
        // Bare top-level geometry outside any placemark
        Kml::Point(point) => {
            *placemarks_seen += 1;
            convert_geometry(
                &Geometry::Point(point.clone()),
                &RawValue::Absent,
                &RawValue::Absent,
                features,
                warnings,
            );
        }
        Kml::LineString(line) => {
            *placemarks_seen += 1;
            convert_geometry(
                &Geometry::LineString(line.clone()),
                &RawValue::Absent,
                &RawValue::Absent,
                features,
                warnings,
            );
        }
        Kml::Polygon(polygon) => {
            *placemarks_seen += 1;
            convert_geometry(
                &Geometry::Polygon(polygon.clone()),
                &RawValue::Absent,
                &RawValue::Absent,
                features,
                warnings,
            );
        }
        Kml::MultiGeometry(multi) => {
            *placemarks_seen += 1;
            convert_geometry(
                &Geometry::MultiGeometry(multi.clone()),
                &RawValue::Absent,
                &RawValue::Absent,
                features,
                warnings,
            );
        }
        // Styles, network links, overlays and other non-feature elements
        _ => {}
    }
}

/// Convert one typed geometry into raw features
///
/// MultiGeometry nodes whose members are all lines collapse into a single
/// MultiLineString feature; mixed collections emit one feature per member,
/// sharing the parent's name and description.
fn convert_geometry(
    geometry: &Geometry,
    name: &RawValue,
    description: &RawValue,
    features: &mut Vec<RawFeature>,
    warnings: &mut Vec<String>,
) {
    match geometry {
        Geometry::Point(point) => features.push(RawFeature {
            name: name.clone(),
            description: description.clone(),
            geometry: RawGeometry::Point(coord_values(&point.coord)),
        }),
        Geometry::LineString(line) => features.push(RawFeature {
            name: name.clone(),
            description: description.clone(),
            geometry: RawGeometry::LineString(line_values(&line.coords)),
        }),
        Geometry::LinearRing(ring) => features.push(RawFeature {
            name: name.clone(),
            description: description.clone(),
            geometry: RawGeometry::LineString(line_values(&ring.coords)),
        }),
        Geometry::Polygon(polygon) => {
            let mut rings = Vec::with_capacity(1 + polygon.inner.len());
            rings.push(line_values(&polygon.outer.coords));
            for inner in &polygon.inner {
                rings.push(line_values(&inner.coords));
            }
            features.push(RawFeature {
                name: name.clone(),
                description: description.clone(),
                geometry: RawGeometry::Polygon(rings),
            });
        }
        Geometry::MultiGeometry(multi) => {
            if multi.geometries.is_empty() {
                warnings.push(format!(
                    "skipped \"{}\": empty multi-geometry",
                    name.to_text("unnamed")
                ));
                return;
            }
            let all_lines = multi.geometries.iter().all(|g| {
                matches!(g, Geometry::LineString(_) | Geometry::LinearRing(_))
            });
            if all_lines {
                let components = multi
                    .geometries
                    .iter()
                    .map(|g| match g {
                        Geometry::LineString(line) => line_values(&line.coords),
                        Geometry::LinearRing(ring) => line_values(&ring.coords),
                        _ => unreachable!("checked above"),
                    })
                    .collect();
                features.push(RawFeature {
                    name: name.clone(),
                    description: description.clone(),
                    geometry: RawGeometry::MultiLineString(components),
                });
            } else {
                for member in &multi.geometries {
                    convert_geometry(member, name, description, features, warnings);
                }
            }
        }
        _ => {
            tracing::warn!(
                name = %name.to_text("unnamed"),
                "unsupported geometry kind, skipping"
            );
            warnings.push(format!(
                "skipped \"{}\": unsupported geometry kind",
                name.to_text("unnamed")
            ));
        }
    }
}

#[inline]
fn coord_values(coord: &Coord) -> Vec<f64> {
    match coord.z {
        Some(z) => vec![coord.x, coord.y, z],
        None => vec![coord.x, coord.y],
    }
}

#[inline]
fn line_values(coords: &[Coord]) -> Vec<Vec<f64>> {
    coords.iter().map(coord_values).collect()
}

// ---------------------------------------------------------------------------
// Fallback: manual walk over generic elements
// ---------------------------------------------------------------------------

fn walk_untyped(node: &Kml, features: &mut Vec<RawFeature>, warnings: &mut Vec<String>) {
    match node {
        Kml::KmlDocument(doc) => {
            for element in &doc.elements {
                walk_untyped(element, features, warnings);
            }
        }
        Kml::Document { elements, .. } => {
            for element in elements {
                walk_untyped(element, features, warnings);
            }
        }
        Kml::Folder { elements, .. } => {
            for element in elements {
                walk_untyped(element, features, warnings);
            }
        }
        Kml::Element(element) => scan_element(element, features, warnings),
        _ => {}
    }
}

fn scan_element(element: &Element, features: &mut Vec<RawFeature>, warnings: &mut Vec<String>) {
    if element.name.eq_ignore_ascii_case("placemark") {
        extract_placemark_element(element, features, warnings);
        return;
    }
    for child in &element.children {
        scan_element(child, features, warnings);
    }
}

/// Extract one feature from a raw placemark element
///
/// Only Point and LineString children are recognized on this path; anything
/// else is skipped with a warning, never a fatal error for the document.
fn extract_placemark_element(
    placemark: &Element,
    features: &mut Vec<RawFeature>,
    warnings: &mut Vec<String>,
) {
    let name = RawValue::from_content(child_content(placemark, "name"));
    let description = RawValue::from_content(child_content(placemark, "description"));

    let geometry = if let Some(point) = find_child(placemark, "point") {
        let text = child_content(point, "coordinates").unwrap_or_default();
        let vertex = tokenize_coordinates(&text).into_iter().next().unwrap_or_default();
        Some(RawGeometry::Point(vertex))
    } else if let Some(line) = find_child(placemark, "linestring") {
        let text = child_content(line, "coordinates").unwrap_or_default();
        Some(RawGeometry::LineString(tokenize_coordinates(&text)))
    } else {
        None
    };

    match geometry {
        Some(geometry) => features.push(RawFeature {
            name,
            description,
            geometry,
        }),
        None => {
            tracing::warn!(
                name = %name.to_text("unnamed"),
                "placemark has no supported geometry child, skipping"
            );
            warnings.push(format!(
                "skipped \"{}\": placemark has no supported geometry",
                name.to_text("unnamed")
            ));
        }
    }
}

fn find_child<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    element
        .children
        .iter()
        .find(|child| child.name.eq_ignore_ascii_case(name))
}

fn child_content(element: &Element, name: &str) -> Option<String> {
    find_child(element, name).and_then(|child| child.content.clone())
}

/// Tokenize coordinate text into vertices
///
/// Vertices are whitespace-separated; within a vertex, values are
/// comma-separated `lon,lat[,alt]`. Each numeric token is coerced leniently
/// so one malformed token yields a 0.0 component instead of aborting the
/// whole track; genuinely out-of-range results are rejected downstream.
pub(crate) fn tokenize_coordinates(text: &str) -> Vec<Vec<f64>> {
    text.split_whitespace()
        .map(|vertex| {
            vertex
                .split(',')
                .map(|token| RawValue::Text(token.to_string()).to_finite_number())
                .collect()
        })
        .collect()
}
