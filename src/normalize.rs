//! Geometry normalization and validation
//!
//! Takes the parser's raw features and produces validated points and tracks,
//! flattening multi-part geometry into single-part tracks. This stage is a
//! pure, deterministic function of its input: no I/O, no shared state, and
//! re-running it over already-normalized data yields identical output.
//!
//! Validation is stricter than the parser's per-token lenience on purpose: a
//! track containing one out-of-range vertex is geometrically meaningless, so
//! the whole track is rejected rather than emitted partially. Rejections are
//! recorded and never stop the walk.

use crate::parse::{RawFeature, RawGeometry};
use serde::{Deserialize, Serialize};

/// Default names for features missing one
const UNNAMED_POINT: &str = "Unnamed Point";
const UNNAMED_TRACK: &str = "Unnamed Track";

/// A validated point of interest
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub name: String,
    pub description: String,
    /// `[longitude, latitude, altitude]`; altitude defaults to 0.0
    pub coordinates: [f64; 3],
}

/// A validated single-part trail track with at least 2 vertices
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTrack {
    pub name: String,
    pub description: String,
    /// Ordered `[longitude, latitude, altitude]` vertices
    pub coordinates: Vec<[f64; 3]>,
}

/// Output of the normalization stage
///
/// `points` and `tracks` keep document order; multi-part expansions sit
/// contiguously at the position of their source feature. `rejections` holds
/// one human-readable entry per rejected feature or component.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedGeometry {
    pub points: Vec<NormalizedPoint>,
    pub tracks: Vec<NormalizedTrack>,
    pub rejections: Vec<String>,
}

/// Validate and flatten raw features into points and tracks
pub fn normalize(features: &[RawFeature]) -> NormalizedGeometry {
    #[cfg(feature = "profiling")]
    profiling::scope!("normalize::normalize");

    let mut out = NormalizedGeometry::default();

    for (index, feature) in features.iter().enumerate() {
        let index = index + 1; // 1-based in messages
        match &feature.geometry {
            RawGeometry::Point(values) => {
                let name = feature.name.to_text(UNNAMED_POINT);
                match normalize_vertex(values) {
                    Some(coordinates) => out.points.push(NormalizedPoint {
                        name,
                        description: feature.description.to_text(""),
                        coordinates,
                    }),
                    None => reject(&mut out.rejections, index, "Point", &name, vertex_problem(values)),
                }
            }
            RawGeometry::LineString(vertices) => {
                let name = feature.name.to_text(UNNAMED_TRACK);
                match normalize_line(vertices) {
                    Some(coordinates) => out.tracks.push(NormalizedTrack {
                        name,
                        description: feature.description.to_text(""),
                        coordinates,
                    }),
                    None => reject(
                        &mut out.rejections,
                        index,
                        "LineString",
                        &name,
                        line_problem(vertices),
                    ),
                }
            }
            RawGeometry::MultiLineString(components) => {
                let name = feature.name.to_text(UNNAMED_TRACK);
                // Components validate independently: one bad component does
                // not reject its siblings. Segments after the first carry a
                // " (N)" suffix with the 1-based component number.
                for (component_index, component) in components.iter().enumerate() {
                    let component_name = if component_index == 0 {
                        name.clone()
                    } else {
                        format!("{} ({})", name, component_index + 1)
                    };
                    match normalize_line(component) {
                        Some(coordinates) => out.tracks.push(NormalizedTrack {
                            name: component_name,
                            description: feature.description.to_text(""),
                            coordinates,
                        }),
                        None => out.rejections.push(format!(
                            "feature {index} (MultiLineString \"{name}\"): component {} {}",
                            component_index + 1,
                            line_problem(component),
                        )),
                    }
                }
            }
            RawGeometry::Polygon(rings) => {
                let name = feature.name.to_text(UNNAMED_TRACK);
                // Only the outer ring becomes a track; holes are discarded
                match rings.first() {
                    Some(outer) => match normalize_line(outer) {
                        Some(coordinates) => out.tracks.push(NormalizedTrack {
                            name,
                            description: feature.description.to_text(""),
                            coordinates,
                        }),
                        None => reject(
                            &mut out.rejections,
                            index,
                            "Polygon",
                            &name,
                            line_problem(outer),
                        ),
                    },
                    None => reject(&mut out.rejections, index, "Polygon", &name, "has no rings"),
                }
            }
        }
    }

    if !out.rejections.is_empty() {
        tracing::warn!(
            rejected = out.rejections.len(),
            "some features failed validation"
        );
    }

    out
}

/// Check the coordinate-range invariant
#[inline]
pub fn coordinate_in_range(longitude: f64, latitude: f64) -> bool {
    longitude.is_finite()
        && latitude.is_finite()
        && (-180.0..=180.0).contains(&longitude)
        && (-90.0..=90.0).contains(&latitude)
}

/// Validate a single raw vertex into a `[lon, lat, alt]` triple
///
/// Requires at least two numeric values; a missing or non-finite altitude
/// defaults to 0.0. Out-of-range coordinates are rejected, never clamped.
fn normalize_vertex(values: &[f64]) -> Option<[f64; 3]> {
    if values.len() < 2 {
        return None;
    }
    let (longitude, latitude) = (values[0], values[1]);
    if !coordinate_in_range(longitude, latitude) {
        return None;
    }
    let altitude = values
        .get(2)
        .copied()
        .filter(|a| a.is_finite())
        .unwrap_or(0.0);
    Some([longitude, latitude, altitude])
}

/// Validate a vertex list into track coordinates
///
/// A track needs at least 2 vertices and every vertex must pass validation,
/// otherwise the whole track is invalid (no partial tracks).
fn normalize_line(vertices: &[Vec<f64>]) -> Option<Vec<[f64; 3]>> {
    if vertices.len() < 2 {
        return None;
    }
    vertices.iter().map(|v| normalize_vertex(v)).collect()
}

fn vertex_problem(values: &[f64]) -> &'static str {
    if values.len() < 2 {
        "has fewer than 2 coordinate values"
    } else {
        "has out-of-range coordinates"
    }
}

fn line_problem(vertices: &[Vec<f64>]) -> &'static str {
    if vertices.len() < 2 {
        "has fewer than 2 vertices"
    } else {
        "contains an invalid vertex"
    }
}

fn reject(rejections: &mut Vec<String>, index: usize, kind: &str, name: &str, problem: &str) {
    rejections.push(format!("feature {index} ({kind} \"{name}\") {problem}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RawValue;

    fn point_feature(name: &str, values: Vec<f64>) -> RawFeature {
        RawFeature {
            name: RawValue::Text(name.to_string()),
            description: RawValue::Absent,
            geometry: RawGeometry::Point(values),
        }
    }

    fn line_feature(name: &str, vertices: Vec<Vec<f64>>) -> RawFeature {
        RawFeature {
            name: RawValue::Text(name.to_string()),
            description: RawValue::Absent,
            geometry: RawGeometry::LineString(vertices),
        }
    }

    #[test]
    fn test_point_roundtrip_fidelity() {
        let out = normalize(&[point_feature("Spring", vec![107.5, -6.9, 1500.0])]);
        assert_eq!(out.points.len(), 1);
        assert_eq!(out.points[0].coordinates, [107.5, -6.9, 1500.0]);
        assert!(out.rejections.is_empty());
    }

    #[test]
    fn test_missing_altitude_defaults_to_zero() {
        let out = normalize(&[point_feature("Spring", vec![107.5, -6.9])]);
        assert_eq!(out.points[0].coordinates, [107.5, -6.9, 0.0]);
    }

    #[test]
    fn test_out_of_range_latitude_rejected() {
        let out = normalize(&[point_feature("Bad", vec![10.0, 95.0])]);
        assert!(out.points.is_empty());
        assert_eq!(out.rejections.len(), 1);
        assert!(out.rejections[0].contains("feature 1"));
        assert!(out.rejections[0].contains("Point"));
    }

    #[test]
    fn test_point_with_single_value_rejected() {
        let out = normalize(&[point_feature("Bad", vec![10.0])]);
        assert!(out.points.is_empty());
        assert!(out.rejections[0].contains("fewer than 2"));
    }

    #[test]
    fn test_missing_name_defaults() {
        let out = normalize(&[RawFeature {
            name: RawValue::Absent,
            description: RawValue::Absent,
            geometry: RawGeometry::Point(vec![1.0, 2.0]),
        }]);
        assert_eq!(out.points[0].name, "Unnamed Point");
        assert_eq!(out.points[0].description, "");
    }

    #[test]
    fn test_single_vertex_track_rejected_entirely() {
        let out = normalize(&[line_feature("Stub", vec![vec![1.0, 2.0]])]);
        assert!(out.tracks.is_empty());
        assert_eq!(out.rejections.len(), 1);
        assert!(out.rejections[0].contains("fewer than 2 vertices"));
    }

    #[test]
    fn test_track_with_invalid_vertex_rejected_whole() {
        let out = normalize(&[line_feature(
            "Broken",
            vec![vec![1.0, 2.0], vec![200.0, 2.0], vec![3.0, 4.0]],
        )]);
        assert!(out.tracks.is_empty(), "no partial tracks");
        assert_eq!(out.rejections.len(), 1);
        assert!(out.rejections[0].contains("invalid vertex"));
    }

    #[test]
    fn test_multilinestring_expansion_names() {
        let out = normalize(&[RawFeature {
            name: RawValue::Text("Ridge".to_string()),
            description: RawValue::Text("main ridge".to_string()),
            geometry: RawGeometry::MultiLineString(vec![
                vec![vec![0.0, 0.0], vec![1.0, 1.0]],
                vec![vec![2.0, 2.0], vec![3.0, 3.0]],
                vec![vec![4.0, 4.0], vec![5.0, 5.0]],
            ]),
        }]);
        let names: Vec<&str> = out.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Ridge", "Ridge (2)", "Ridge (3)"]);
        // Description is inherited unchanged by every component
        assert!(out.tracks.iter().all(|t| t.description == "main ridge"));
    }

    #[test]
    fn test_multilinestring_components_validate_independently() {
        let out = normalize(&[RawFeature {
            name: RawValue::Text("Ridge".to_string()),
            description: RawValue::Absent,
            geometry: RawGeometry::MultiLineString(vec![
                vec![vec![0.0, 0.0], vec![1.0, 1.0]],
                vec![vec![999.0, 0.0], vec![1.0, 1.0]], // invalid component
                vec![vec![4.0, 4.0], vec![5.0, 5.0]],
            ]),
        }]);
        assert_eq!(out.tracks.len(), 2);
        assert_eq!(out.tracks[0].name, "Ridge");
        assert_eq!(out.tracks[1].name, "Ridge (3)");
        assert_eq!(out.rejections.len(), 1);
        assert!(out.rejections[0].contains("component 2"));
    }

    #[test]
    fn test_polygon_uses_outer_ring_only() {
        let out = normalize(&[RawFeature {
            name: RawValue::Text("Crater".to_string()),
            description: RawValue::Absent,
            geometry: RawGeometry::Polygon(vec![
                vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0], vec![0.0, 0.0]],
                vec![vec![0.2, 0.2], vec![0.2, 0.4], vec![0.4, 0.4], vec![0.2, 0.2]],
            ]),
        }]);
        assert_eq!(out.tracks.len(), 1, "holes are discarded");
        assert_eq!(out.tracks[0].coordinates.len(), 4);
    }

    #[test]
    fn test_ordering_with_contiguous_expansion() {
        let out = normalize(&[
            line_feature("First", vec![vec![0.0, 0.0], vec![1.0, 1.0]]),
            RawFeature {
                name: RawValue::Text("Multi".to_string()),
                description: RawValue::Absent,
                geometry: RawGeometry::MultiLineString(vec![
                    vec![vec![2.0, 2.0], vec![3.0, 3.0]],
                    vec![vec![4.0, 4.0], vec![5.0, 5.0]],
                ]),
            },
            line_feature("Last", vec![vec![6.0, 6.0], vec![7.0, 7.0]]),
        ]);
        let names: Vec<&str> = out.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["First", "Multi", "Multi (2)", "Last"]);
    }

    #[test]
    fn test_partial_success() {
        let out = normalize(&[
            point_feature("Good", vec![1.0, 2.0]),
            point_feature("Bad", vec![1.0, 95.0]),
            point_feature("AlsoGood", vec![3.0, 4.0]),
        ]);
        assert_eq!(out.points.len(), 2);
        assert_eq!(out.rejections.len(), 1);
        assert!(out.rejections[0].contains("feature 2"));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let features = vec![
            point_feature("Spring", vec![107.5, -6.9, 1500.0]),
            line_feature("Trail", vec![vec![0.0, 0.0, 10.0], vec![1.0, 1.0, 20.0]]),
        ];
        let first = normalize(&features);

        // Feed the normalized output back through as raw features
        let refed: Vec<RawFeature> = first
            .points
            .iter()
            .map(|p| RawFeature {
                name: RawValue::Text(p.name.clone()),
                description: RawValue::Text(p.description.clone()),
                geometry: RawGeometry::Point(p.coordinates.to_vec()),
            })
            .chain(first.tracks.iter().map(|t| RawFeature {
                name: RawValue::Text(t.name.clone()),
                description: RawValue::Text(t.description.clone()),
                geometry: RawGeometry::LineString(
                    t.coordinates.iter().map(|c| c.to_vec()).collect(),
                ),
            }))
            .collect();
        let second = normalize(&refed);

        assert_eq!(first.points, second.points);
        assert_eq!(first.tracks, second.tracks);
        assert!(second.rejections.is_empty());
    }

    #[test]
    fn test_coordinate_in_range_bounds() {
        assert!(coordinate_in_range(180.0, 90.0));
        assert!(coordinate_in_range(-180.0, -90.0));
        assert!(!coordinate_in_range(180.1, 0.0));
        assert!(!coordinate_in_range(0.0, -90.1));
        assert!(!coordinate_in_range(f64::NAN, 0.0));
    }
}
