//! REST payloads exchanged with the persistence backend.
//!
//! Buildings and roads travel as separate resources; both map onto [`Feature`].

use serde::{Deserialize, Serialize};

use crate::{short_id, Feature, FeatureMeta, FeatureType, Geometry, Position};

pub const DEFAULT_BUILDING_DESCRIPTION: &str = "Drawn building";
pub const DEFAULT_ROAD_DESCRIPTION: &str = "New road";
pub const DEFAULT_ROAD_WIDTH: f64 = 5.0;

/// Planar coordinate: `x` = longitude, `y` = latitude (degrees), `z` = vertex
/// height where one was set, otherwise 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl From<&Position> for Coordinate {
    fn from(p: &Position) -> Self {
        Self {
            x: p.lon,
            y: p.lat,
            z: p.z.unwrap_or(0.0),
        }
    }
}

impl From<&Coordinate> for Position {
    fn from(c: &Coordinate) -> Self {
        Position {
            lon: c.x,
            lat: c.y,
            z: (c.z != 0.0).then_some(c.z),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonDto {
    pub coordinates: Vec<Coordinate>,
}

/// Building-type reference embedded in a building payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingTypeRef {
    pub building_type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingPolygonDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_id: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub building_type: Option<BuildingTypeRef>,
    pub polygon: PolygonDto,
    pub height: f64,
}

impl BuildingPolygonDto {
    /// Payload for a polygon feature. `include_id` is false on create, where the
    /// backend assigns the permanent id.
    pub fn from_feature(feature: &Feature, include_id: bool) -> Self {
        let meta = &feature.meta;
        let type_id = meta
            .type_id
            .clone()
            .or_else(|| feature.feature_type.building_type_id().map(str::to_string))
            .filter(|id| !id.is_empty());
        Self {
            building_id: include_id.then(|| feature.id.clone()),
            name: meta
                .name
                .clone()
                .unwrap_or_else(|| default_building_name(&feature.id)),
            description: meta
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_BUILDING_DESCRIPTION.to_string()),
            building_type: type_id.map(|building_type_id| BuildingTypeRef {
                building_type_id,
                label_name: None,
                color: None,
            }),
            polygon: PolygonDto {
                coordinates: feature.geometry.vertices().iter().map(Coordinate::from).collect(),
            },
            height: feature.height,
        }
    }
}

impl TryFrom<BuildingPolygonDto> for Feature {
    type Error = String;

    fn try_from(dto: BuildingPolygonDto) -> Result<Self, Self::Error> {
        let id = dto
            .building_id
            .ok_or_else(|| "building payload has no buildingId".to_string())?;
        let ring: Vec<Position> = dto.polygon.coordinates.iter().map(Position::from).collect();
        if ring.len() < 3 {
            return Err(format!("building {id} has a degenerate ring ({} points)", ring.len()));
        }
        let type_id = dto.building_type.as_ref().map(|t| t.building_type_id.clone());
        let feature_type = type_id
            .clone()
            .map(FeatureType::Building)
            .unwrap_or_else(|| FeatureType::Building(String::new()));
        Ok(Feature {
            id,
            feature_type,
            geometry: Geometry::closed_polygon(ring),
            height: dto.height,
            width: 0.0,
            meta: FeatureMeta {
                name: Some(dto.name),
                description: Some(dto.description),
                type_id,
                color: dto.building_type.and_then(|t| t.color),
                ..FeatureMeta::default()
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadTypeRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_width: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadDto {
    pub id: String,
    pub road_description: String,
    #[serde(default)]
    pub road_type: Option<RoadTypeRef>,
    pub coordinates: Vec<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

impl RoadDto {
    pub fn from_feature(feature: &Feature) -> Self {
        Self {
            id: feature.id.clone(),
            road_description: feature
                .meta
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_ROAD_DESCRIPTION.to_string()),
            road_type: feature.meta.type_id.clone().map(|id| RoadTypeRef {
                id,
                standard_width: None,
            }),
            coordinates: feature.geometry.vertices().iter().map(Coordinate::from).collect(),
            width: Some(feature.width),
        }
    }
}

impl TryFrom<RoadDto> for Feature {
    type Error = String;

    fn try_from(dto: RoadDto) -> Result<Self, Self::Error> {
        if dto.coordinates.len() < 2 {
            return Err(format!("road {} has fewer than 2 points", dto.id));
        }
        let width = dto
            .width
            .or_else(|| dto.road_type.as_ref().and_then(|t| t.standard_width))
            .unwrap_or(DEFAULT_ROAD_WIDTH);
        Ok(Feature {
            id: dto.id,
            feature_type: FeatureType::Road,
            geometry: Geometry::line(dto.coordinates.iter().map(Position::from).collect()),
            height: 0.0,
            width,
            meta: FeatureMeta {
                description: Some(dto.road_description),
                type_id: dto.road_type.map(|t| t.id),
                ..FeatureMeta::default()
            },
        })
    }
}

/// Request body for deleting a road (the id travels in the body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadDeleteDto {
    pub id: String,
}

pub fn default_building_name(id: &str) -> String {
    format!("Building {}", short_id(id, 4))
}
