use std::fmt;

use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod wire;

pub use catalog::{BuildingType, Catalog, CostEstimate, Unit};

/// Identity of a feature: a local temporary id or a server-assigned permanent one
pub type FeatureId = String;

/// Feature type sentinel used for road centerlines
pub const ROAD_TYPE: &str = "road";

/// Leading `len` characters of an id (used in default names and labels)
pub fn short_id(id: &str, len: usize) -> &str {
    match id.char_indices().nth(len) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Geodetic position: longitude/latitude in degrees, optional height in meters.
///
/// Serialized as a GeoJSON position array (`[lon, lat]` or `[lon, lat, z]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
    pub z: Option<f64>,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat, z: None }
    }

    pub fn with_z(lon: f64, lat: f64, z: f64) -> Self {
        Self {
            lon,
            lat,
            z: Some(z),
        }
    }
}

impl From<[f64; 2]> for Position {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self::new(lon, lat)
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [lon, lat] => Ok(Self::new(*lon, *lat)),
            [lon, lat, z] => Ok(Self::with_z(*lon, *lat, *z)),
            other => Err(format!(
                "position must have 2 or 3 components, got {}",
                other.len()
            )),
        }
    }
}

impl From<Position> for Vec<f64> {
    fn from(p: Position) -> Self {
        match p.z {
            Some(z) => vec![p.lon, p.lat, z],
            None => vec![p.lon, p.lat],
        }
    }
}

/// Feature geometry in GeoJSON layout.
///
/// Polygons carry a single closed outer ring (first and last position coincide);
/// holes are not supported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Vec<Position>>),
    LineString(Vec<Position>),
}

impl Geometry {
    /// Build a polygon from open ring vertices, closing it by repeating the first vertex.
    pub fn closed_polygon(mut vertices: Vec<Position>) -> Self {
        let open = match (vertices.first(), vertices.last()) {
            (Some(first), Some(last)) => first != last,
            _ => false,
        };
        if open {
            let first = vertices[0];
            vertices.push(first);
        }
        Geometry::Polygon(vec![vertices])
    }

    pub fn line(vertices: Vec<Position>) -> Self {
        Geometry::LineString(vertices)
    }

    pub fn is_polygon(&self) -> bool {
        matches!(self, Geometry::Polygon(_))
    }

    /// Vertices of the outer ring (closed) or of the line
    pub fn vertices(&self) -> &[Position] {
        match self {
            Geometry::Polygon(rings) => rings.first().map(Vec::as_slice).unwrap_or(&[]),
            Geometry::LineString(points) => points,
        }
    }

    /// Vertices without the closing duplicate of a polygon ring
    pub fn distinct_vertices(&self) -> &[Position] {
        let v = self.vertices();
        match self {
            Geometry::Polygon(_) if v.len() > 1 && v.first() == v.last() => &v[..v.len() - 1],
            _ => v,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Geometry::Polygon(_) => "Polygon",
            Geometry::LineString(_) => "LineString",
        }
    }
}

/// Either a building-type catalog key or the `road` sentinel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeatureType {
    Road,
    Building(String),
}

impl FeatureType {
    pub fn is_road(&self) -> bool {
        matches!(self, FeatureType::Road)
    }

    pub fn building_type_id(&self) -> Option<&str> {
        match self {
            FeatureType::Road => None,
            FeatureType::Building(id) => Some(id),
        }
    }
}

impl From<String> for FeatureType {
    fn from(s: String) -> Self {
        if s == ROAD_TYPE {
            FeatureType::Road
        } else {
            FeatureType::Building(s)
        }
    }
}

impl From<FeatureType> for String {
    fn from(t: FeatureType) -> Self {
        match t {
            FeatureType::Road => ROAD_TYPE.to_string(),
            FeatureType::Building(id) => id,
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureType::Road => f.write_str(ROAD_TYPE),
            FeatureType::Building(id) => f.write_str(id),
        }
    }
}

/// Free-form feature attributes. Unknown keys are kept in `extra` and passed through.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Catalog cross-reference (building type id or road type id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    /// Display color as CSS hex (`#rrggbb`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Unit of persisted geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: FeatureId,
    pub feature_type: FeatureType,
    pub geometry: Geometry,
    /// Extrusion height in meters (polygons)
    #[serde(default)]
    pub height: f64,
    /// Corridor width in meters (lines)
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub meta: FeatureMeta,
}

impl Feature {
    pub fn is_polygon(&self) -> bool {
        self.geometry.is_polygon()
    }

    /// Height for polygons, width for lines
    pub fn extent(&self) -> f64 {
        if self.is_polygon() {
            self.height
        } else {
            self.width
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_serde_2d_and_3d() {
        let p: Position = serde_json::from_str("[5.1, 52.2]").unwrap();
        assert_eq!(p, Position::new(5.1, 52.2));
        let p: Position = serde_json::from_str("[5.1, 52.2, 3.0]").unwrap();
        assert_eq!(p.z, Some(3.0));
        assert_eq!(serde_json::to_string(&Position::new(1.0, 2.0)).unwrap(), "[1.0,2.0]");
    }

    #[test]
    fn test_position_rejects_wrong_arity() {
        assert!(serde_json::from_str::<Position>("[1.0]").is_err());
        assert!(serde_json::from_str::<Position>("[1.0, 2.0, 3.0, 4.0]").is_err());
    }

    #[test]
    fn test_closed_polygon_repeats_first_vertex() {
        let g = Geometry::closed_polygon(vec![
            Position::new(0.0, 0.0),
            Position::new(0.0, 1.0),
            Position::new(1.0, 0.0),
        ]);
        assert_eq!(g.vertices().len(), 4);
        assert_eq!(g.vertices().first(), g.vertices().last());
        assert_eq!(g.distinct_vertices().len(), 3);
    }

    #[test]
    fn test_closed_polygon_does_not_double_close() {
        let g = Geometry::closed_polygon(vec![
            Position::new(0.0, 0.0),
            Position::new(0.0, 1.0),
            Position::new(1.0, 0.0),
            Position::new(0.0, 0.0),
        ]);
        assert_eq!(g.vertices().len(), 4);
    }

    #[test]
    fn test_geometry_geojson_layout() {
        let g = Geometry::line(vec![Position::new(0.0, 0.0), Position::new(1.0, 1.0)]);
        let v = serde_json::to_value(&g).unwrap();
        assert_eq!(v["type"], "LineString");
        assert_eq!(v["coordinates"][1][0], 1.0);
    }

    #[test]
    fn test_feature_type_road_sentinel() {
        let t: FeatureType = serde_json::from_str("\"road\"").unwrap();
        assert!(t.is_road());
        let t: FeatureType = serde_json::from_str("\"4f1c\"").unwrap();
        assert_eq!(t.building_type_id(), Some("4f1c"));
    }

    #[test]
    fn test_meta_passes_unknown_fields_through() {
        let json = r#"{"name": "A", "typeId": "x", "architect": "B"}"#;
        let meta: FeatureMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.type_id.as_deref(), Some("x"));
        assert_eq!(meta.extra["architect"], "B");
        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["architect"], "B");
    }
}
