//! Geometry math: WGS84 conversions, local-plane projection, shoelace area,
//! prism volume and centroid-relative rotation.
//!
//! Everything here is a pure function of its input. Metrics are recomputed on
//! demand from the current geometry and never cached.

use glam::{DVec2, DVec3};
use serde::Serialize;
use shared::{Feature, Geometry, Position};

/// WGS84 semi-major axis (m)
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// Geodetic coordinate in degrees / meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub lon: f64,
    pub lat: f64,
    pub height: f64,
}

impl Geodetic {
    pub fn to_position(self) -> Position {
        Position::new(self.lon, self.lat)
    }
}

/// Geodetic (degrees, meters) to earth-centered cartesian (meters)
pub fn geodetic_to_world(lon: f64, lat: f64, height: f64) -> DVec3 {
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    DVec3::new(
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + height) * sin_lat,
    )
}

/// Earth-centered cartesian to geodetic, by fixed-point iteration on latitude
pub fn world_to_geodetic(p: DVec3) -> Geodetic {
    let lon = p.y.atan2(p.x);
    let rho = (p.x * p.x + p.y * p.y).sqrt();

    if rho < 1e-9 {
        let b = WGS84_A * (1.0 - WGS84_F);
        let lat = if p.z >= 0.0 { 90.0 } else { -90.0 };
        return Geodetic {
            lon: 0.0,
            lat,
            height: p.z.abs() - b,
        };
    }

    let mut lat = p.z.atan2(rho * (1.0 - WGS84_E2));
    let mut height = 0.0;
    for _ in 0..8 {
        let sin_lat = lat.sin();
        let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        height = rho / lat.cos() - n;
        lat = p.z.atan2(rho * (1.0 - WGS84_E2 * n / (n + height)));
    }

    Geodetic {
        lon: lon.to_degrees(),
        lat: lat.to_degrees(),
        height,
    }
}

/// East-north-up frame anchored at a point on the ellipsoid
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin: DVec3,
    east: DVec3,
    north: DVec3,
}

impl LocalFrame {
    pub fn at(origin: Geodetic) -> Self {
        let (sin_lat, cos_lat) = origin.lat.to_radians().sin_cos();
        let (sin_lon, cos_lon) = origin.lon.to_radians().sin_cos();
        Self {
            origin: geodetic_to_world(origin.lon, origin.lat, origin.height),
            east: DVec3::new(-sin_lon, cos_lon, 0.0),
            north: DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat),
        }
    }

    /// Planar (east, north) offset of a world point from the frame origin
    pub fn project(&self, world: DVec3) -> DVec2 {
        let d = world - self.origin;
        DVec2::new(d.dot(self.east), d.dot(self.north))
    }
}

/// Arithmetic mean of longitude, latitude and height.
///
/// Not a spherical centroid; good enough for footprints spanning a few hundred meters.
pub fn geodetic_centroid(points: &[Position]) -> Option<Geodetic> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lon, lat, h) = points.iter().fold((0.0, 0.0, 0.0), |(lon, lat, h), p| {
        (lon + p.lon, lat + p.lat, h + p.z.unwrap_or(0.0))
    });
    Some(Geodetic {
        lon: lon / n,
        lat: lat / n,
        height: h / n,
    })
}

/// Project geodetic points onto the tangent plane at their centroid
pub fn project_to_local_plane(points: &[Position]) -> Vec<DVec2> {
    let Some(centroid) = geodetic_centroid(points) else {
        return Vec::new();
    };
    let frame = LocalFrame::at(centroid);
    points
        .iter()
        .map(|p| frame.project(geodetic_to_world(p.lon, p.lat, p.z.unwrap_or(0.0))))
        .collect()
}

/// Shoelace sum over an implicitly closed planar ring. Positive when counter-clockwise.
pub fn signed_area(ring: &[DVec2]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Planar area (m²) of a geodetic ring; a closing duplicate vertex is ignored.
///
/// Self-intersecting rings are not rejected: the result is whatever the shoelace sum gives.
pub fn ring_area(ring: &[Position]) -> f64 {
    let open = match ring {
        [first, .., last] if ring.len() > 3 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    };
    signed_area(&project_to_local_plane(open)).abs()
}

/// Right-prism volume
pub fn volume(area_m2: f64, height: f64) -> f64 {
    area_m2 * height
}

/// Area and volume derived from a polygon's current geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub area_m2: f64,
    pub volume_m3: f64,
}

impl Metrics {
    pub fn of(feature: &Feature) -> Option<Self> {
        if !feature.is_polygon() {
            return None;
        }
        let area_m2 = ring_area(feature.geometry.vertices());
        Some(Self {
            area_m2,
            volume_m3: volume(area_m2, feature.height),
        })
    }
}

/// Mean of raw longitude/latitude, used as the rotation pivot
pub fn planar_centroid(points: &[Position]) -> Option<DVec2> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(DVec2::ZERO, |acc, p| acc + DVec2::new(p.lon, p.lat));
    Some(sum / points.len() as f64)
}

/// Rotate every vertex about the planar centroid in (lon, lat) space.
///
/// The pivot averages the outer ring as stored, so a closed ring counts its
/// first vertex twice. Positive angles turn counter-clockwise. Per-vertex `z` is kept as is and a
/// closed ring stays closed.
pub fn rotate_about_centroid(geometry: &Geometry, degrees: f64) -> Geometry {
    let Some(center) = planar_centroid(geometry.vertices()) else {
        return geometry.clone();
    };
    let (sin, cos) = degrees.to_radians().sin_cos();
    let rotate = |p: &Position| {
        let d = DVec2::new(p.lon, p.lat) - center;
        Position {
            lon: center.x + d.x * cos - d.y * sin,
            lat: center.y + d.x * sin + d.y * cos,
            z: p.z,
        }
    };

    match geometry {
        Geometry::Polygon(rings) => {
            Geometry::Polygon(rings.iter().map(|r| r.iter().map(rotate).collect()).collect())
        }
        Geometry::LineString(points) => Geometry::LineString(points.iter().map(rotate).collect()),
    }
}

/// Straight-line distance between two world points (m)
pub fn segment_length(a: DVec3, b: DVec3) -> f64 {
    a.distance(b)
}

pub fn midpoint(a: DVec3, b: DVec3) -> DVec3 {
    (a + b) * 0.5
}

/// Human-readable length: meters with one decimal, kilometers with two from 1 km up
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{:.1} m", meters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    const EPS: f64 = 1e-9;

    fn assert_same_vertices(a: &Geometry, b: &Geometry, tol: f64) {
        let (va, vb) = (a.vertices(), b.vertices());
        assert_eq!(va.len(), vb.len());
        for (p, q) in va.iter().zip(vb) {
            assert!((p.lon - q.lon).abs() < tol, "lon {} vs {}", p.lon, q.lon);
            assert!((p.lat - q.lat).abs() < tol, "lat {} vs {}", p.lat, q.lat);
            assert_eq!(p.z, q.z);
        }
    }

    #[test]
    fn test_world_roundtrip() {
        for (lon, lat, h) in [(5.79, 53.2, 0.0), (-122.4, 37.8, 120.0), (0.0, 0.0, 0.0)] {
            let g = world_to_geodetic(geodetic_to_world(lon, lat, h));
            assert!((g.lon - lon).abs() < 1e-9);
            assert!((g.lat - lat).abs() < 1e-9);
            assert!((g.height - h).abs() < 1e-4);
        }
    }

    #[test]
    fn test_triangle_area_near_equator() {
        let ring = fixtures::triangle_ring();
        let area = ring_area(ring.vertices());
        // 0.5 * 111.32 m * 110.57 m
        assert!((area - 6154.0).abs() < 60.0, "area = {area}");
    }

    #[test]
    fn test_area_is_orientation_independent() {
        let ring = fixtures::square_ring(5.79, 53.2, 0.0005);
        let mut reversed = ring.vertices().to_vec();
        reversed.reverse();
        let a = ring_area(ring.vertices());
        let b = ring_area(&reversed);
        assert!(a > 0.0);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_closing_vertex_does_not_change_area() {
        let ring = fixtures::square_ring(5.79, 53.2, 0.0005);
        let open = ring.distinct_vertices();
        assert!((ring_area(ring.vertices()) - ring_area(open)).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_ring_has_zero_area() {
        let collinear = [
            Position::new(0.0, 0.0),
            Position::new(0.0005, 0.0),
            Position::new(0.001, 0.0),
        ];
        assert!(ring_area(&collinear) < 1e-6);
        assert_eq!(signed_area(&[DVec2::ZERO, DVec2::X]), 0.0);
    }

    #[test]
    fn test_signed_area_orientation() {
        let ccw = [DVec2::new(0.0, 0.0), DVec2::new(2.0, 0.0), DVec2::new(0.0, 2.0)];
        assert!((signed_area(&ccw) - 2.0).abs() < EPS);
        let cw: Vec<DVec2> = ccw.iter().rev().copied().collect();
        assert!((signed_area(&cw) + 2.0).abs() < EPS);
    }

    #[test]
    fn test_volume_is_area_times_height() {
        let feature = fixtures::building("b", fixtures::triangle_ring(), 10.0);
        let m = Metrics::of(&feature).unwrap();
        assert_eq!(m.volume_m3, m.area_m2 * 10.0);
        assert_eq!(volume(12.5, 0.0), 0.0);
    }

    #[test]
    fn test_lines_have_no_metrics() {
        assert!(Metrics::of(&fixtures::road("r", fixtures::short_line())).is_none());
    }

    #[test]
    fn test_rotate_then_inverse_is_identity() {
        let ring = fixtures::square_ring(5.79, 53.2, 0.0005);
        let back = rotate_about_centroid(&rotate_about_centroid(&ring, 37.0), -37.0);
        assert_same_vertices(&ring, &back, 1e-12);
    }

    #[test]
    fn test_full_turn_is_identity() {
        let line = fixtures::short_line();
        assert_same_vertices(&line, &rotate_about_centroid(&line, 360.0), 1e-12);
    }

    #[test]
    fn test_rotation_keeps_ring_closed_and_z() {
        let ring = Geometry::closed_polygon(vec![
            Position::with_z(0.0, 0.0, 4.0),
            Position::with_z(0.001, 0.0, 5.0),
            Position::with_z(0.0, 0.001, 6.0),
        ]);
        let rotated = rotate_about_centroid(&ring, 90.0);
        let v = rotated.vertices();
        assert_eq!(v.first(), v.last());
        assert_eq!(v[1].z, Some(5.0));
    }

    #[test]
    fn test_closed_ring_pivot_counts_closing_vertex() {
        let ring = Geometry::closed_polygon(vec![
            Position::new(0.0, 0.0),
            Position::new(0.001, 0.0),
            Position::new(0.0, 0.001),
        ]);
        let center = planar_centroid(ring.vertices()).unwrap();
        assert!((center - DVec2::new(0.00025, 0.00025)).length() < EPS);

        // a half turn maps every vertex p to 2c - p
        let rotated = rotate_about_centroid(&ring, 180.0);
        for (p, q) in ring.vertices().iter().zip(rotated.vertices()) {
            assert!((q.lon - (2.0 * center.x - p.lon)).abs() < EPS);
            assert!((q.lat - (2.0 * center.y - p.lat)).abs() < EPS);
        }
    }

    #[test]
    fn test_quarter_turn_about_centroid() {
        let line = Geometry::line(vec![Position::new(-1.0, 0.0), Position::new(1.0, 0.0)]);
        let rotated = rotate_about_centroid(&line, 90.0);
        let v = rotated.vertices();
        assert!((v[0].lon).abs() < EPS && (v[0].lat + 1.0).abs() < EPS);
        assert!((v[1].lon).abs() < EPS && (v[1].lat - 1.0).abs() < EPS);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(12.34), "12.3 m");
        assert_eq!(format_distance(999.94), "999.9 m");
        assert_eq!(format_distance(1000.0), "1.00 km");
        assert_eq!(format_distance(2345.0), "2.35 km");
    }

    #[test]
    fn test_segment_length_and_midpoint() {
        let a = DVec3::new(0.0, 0.0, 0.0);
        let b = DVec3::new(3.0, 4.0, 0.0);
        assert_eq!(segment_length(a, b), 5.0);
        assert_eq!(midpoint(a, b), DVec3::new(1.5, 2.0, 0.0));
    }
}
