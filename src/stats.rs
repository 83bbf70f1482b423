//! Summary statistics over normalized trail geometry
//!
//! Pure, deterministic computation: great-circle distance over track
//! vertices, elevation extremes over point altitudes, and centroid/bounds
//! over every vertex combined. Distances are kilometers, elevations meters,
//! coordinates decimal degrees.

use crate::normalize::{NormalizedPoint, NormalizedTrack};
use geo::Rect;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Derived statistics for one ingestion
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailStatistics {
    /// Sum of great-circle distances over all track vertices, in km
    pub total_distance: f64,
    pub total_points: usize,
    pub total_segments: usize,
    /// `highest_point - lowest_point`, 0 when no elevation data
    pub elevation_gain: f64,
    pub highest_point: Option<f64>,
    pub lowest_point: Option<f64>,
    pub average_elevation: f64,
    /// Mean `(longitude, latitude)` over all point and track vertices;
    /// `(0.0, 0.0)` when there are no vertices at all
    pub center_coordinates: (f64, f64),
    /// Component-wise lon/lat extent over the same vertex set
    pub bounds: Option<Rect<f64>>,
}

/// Compute statistics over validated points and tracks
///
/// Defined for empty input: zero distance, no bounds, center at the origin.
pub fn compute(points: &[NormalizedPoint], tracks: &[NormalizedTrack]) -> TrailStatistics {
    #[cfg(feature = "profiling")]
    profiling::scope!("stats::compute");

    let total_distance: f64 = tracks
        .iter()
        .map(|track| {
            track
                .coordinates
                .windows(2)
                .map(|pair| haversine_km(pair[0], pair[1]))
                .sum::<f64>()
        })
        .sum();

    // Elevation extremes consider point altitudes only, and only those
    // strictly above 0: an unset altitude is encoded as 0, and counting it
    // would produce false sea-level readings.
    let elevations: Vec<f64> = points
        .iter()
        .map(|p| p.coordinates[2])
        .filter(|&alt| alt > 0.0)
        .collect();
    let highest_point = elevations.iter().copied().fold(None, |acc: Option<f64>, e| {
        Some(acc.map_or(e, |a| a.max(e)))
    });
    let lowest_point = elevations.iter().copied().fold(None, |acc: Option<f64>, e| {
        Some(acc.map_or(e, |a| a.min(e)))
    });
    let elevation_gain = match (highest_point, lowest_point) {
        (Some(high), Some(low)) => high - low,
        _ => 0.0,
    };
    let average_elevation = if elevations.is_empty() {
        0.0
    } else {
        elevations.iter().sum::<f64>() / elevations.len() as f64
    };

    // Center and bounds weigh every vertex equally, whatever feature type
    // it came from.
    let mut vertex_count = 0usize;
    let mut sum_lon = 0.0;
    let mut sum_lat = 0.0;
    let mut min_lon = f64::INFINITY;
    let mut min_lat = f64::INFINITY;
    let mut max_lon = f64::NEG_INFINITY;
    let mut max_lat = f64::NEG_INFINITY;

    let all_vertices = points
        .iter()
        .map(|p| p.coordinates)
        .chain(tracks.iter().flat_map(|t| t.coordinates.iter().copied()));
    for [lon, lat, _] in all_vertices {
        vertex_count += 1;
        sum_lon += lon;
        sum_lat += lat;
        min_lon = min_lon.min(lon);
        min_lat = min_lat.min(lat);
        max_lon = max_lon.max(lon);
        max_lat = max_lat.max(lat);
    }

    let (center_coordinates, bounds) = if vertex_count == 0 {
        ((0.0, 0.0), None)
    } else {
        let n = vertex_count as f64;
        (
            (sum_lon / n, sum_lat / n),
            Some(Rect::new(
                geo::Coord {
                    x: min_lon,
                    y: min_lat,
                },
                geo::Coord {
                    x: max_lon,
                    y: max_lat,
                },
            )),
        )
    };

    TrailStatistics {
        total_distance,
        total_points: points.len(),
        total_segments: tracks.len(),
        elevation_gain,
        highest_point,
        lowest_point,
        average_elevation,
        center_coordinates,
        bounds,
    }
}

/// Great-circle distance between two `[lon, lat, alt]` vertices in km
///
/// Haversine formula over a sphere with mean Earth radius; altitude is
/// ignored.
#[inline]
pub fn haversine_km(a: [f64; 3], b: [f64; 3]) -> f64 {
    let lat1 = a[1].to_radians();
    let lat2 = b[1].to_radians();
    let delta_lat = (b[1] - a[1]).to_radians();
    let delta_lon = (b[0] - a[0]).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}
