//! Factory functions for test data: rings, lines, features and a small catalog.

use shared::{BuildingType, Catalog, Feature, FeatureMeta, FeatureType, Geometry, Position, Unit};

pub const HOUSING_TYPE: &str = "type-housing";
pub const OFFICE_TYPE: &str = "type-office";

// ── Geometry ────────────────────────────────────────────────────

/// Closed triangle `[[0,0],[0,0.001],[0.001,0]]` near the equator
pub fn triangle_ring() -> Geometry {
    Geometry::closed_polygon(triangle_vertices().to_vec())
}

pub fn triangle_vertices() -> [Position; 3] {
    [
        Position::new(0.0, 0.0),
        Position::new(0.0, 0.001),
        Position::new(0.001, 0.0),
    ]
}

/// Closed axis-aligned square with its south-west corner at (lon, lat)
pub fn square_ring(lon: f64, lat: f64, size: f64) -> Geometry {
    Geometry::closed_polygon(vec![
        Position::new(lon, lat),
        Position::new(lon + size, lat),
        Position::new(lon + size, lat + size),
        Position::new(lon, lat + size),
    ])
}

/// Three-point road centerline
pub fn short_line() -> Geometry {
    Geometry::line(vec![
        Position::new(0.0, 0.0),
        Position::new(0.0005, 0.0002),
        Position::new(0.001, 0.0),
    ])
}

// ── Features ────────────────────────────────────────────────────

/// Housing polygon with the given geometry and height
pub fn building(id: &str, geometry: Geometry, height: f64) -> Feature {
    Feature {
        id: id.to_string(),
        feature_type: FeatureType::Building(HOUSING_TYPE.to_string()),
        geometry,
        height,
        width: 0.0,
        meta: FeatureMeta {
            name: Some(format!("Building {id}")),
            type_id: Some(HOUSING_TYPE.to_string()),
            ..FeatureMeta::default()
        },
    }
}

/// Road centerline, 5 m wide
pub fn road(id: &str, geometry: Geometry) -> Feature {
    Feature {
        id: id.to_string(),
        feature_type: FeatureType::Road,
        geometry,
        height: 0.0,
        width: 5.0,
        meta: FeatureMeta {
            description: Some(shared::wire::DEFAULT_ROAD_DESCRIPTION.to_string()),
            ..FeatureMeta::default()
        },
    }
}

// ── Catalog ─────────────────────────────────────────────────────

/// Inhabitable, priced per m³
pub fn housing_type() -> BuildingType {
    BuildingType {
        building_type_id: HOUSING_TYPE.to_string(),
        label_name: "Terraced house".to_string(),
        description: "Row of attached houses".to_string(),
        unit: Unit::CubicMeters,
        cost_per_unit: 500.0,
        inhabitable: true,
        residents_per_unit: Some(0.01),
        points: 1.0,
        color: "#34d399".to_string(),
    }
}

/// Not inhabitable, priced per m²
pub fn office_type() -> BuildingType {
    BuildingType {
        building_type_id: OFFICE_TYPE.to_string(),
        label_name: "Office".to_string(),
        description: String::new(),
        unit: Unit::SquareMeters,
        cost_per_unit: 1500.0,
        inhabitable: false,
        residents_per_unit: None,
        points: 2.0,
        color: "#60a5fa".to_string(),
    }
}

pub fn catalog() -> Catalog {
    Catalog::new(vec![housing_type(), office_type()])
}
