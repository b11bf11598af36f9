//! In-memory persistence for buildings, roads and the building-type catalog.

use std::collections::BTreeMap;

use shared::wire::{BuildingPolygonDto, BuildingTypeRef, RoadDto};
use shared::{BuildingType, Unit};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct Storage {
    buildings: RwLock<BTreeMap<String, BuildingPolygonDto>>,
    roads: RwLock<BTreeMap<String, RoadDto>>,
    building_types: Vec<BuildingType>,
}

impl Storage {
    pub fn new(building_types: Vec<BuildingType>) -> Self {
        Self {
            building_types,
            ..Self::default()
        }
    }

    pub fn building_types(&self) -> &[BuildingType] {
        &self.building_types
    }

    /// All buildings. With `embed_types` the type reference carries label and color.
    pub async fn buildings(&self, embed_types: bool) -> Vec<BuildingPolygonDto> {
        let buildings = self.buildings.read().await;
        buildings
            .values()
            .cloned()
            .map(|mut dto| {
                if embed_types {
                    dto.building_type = dto.building_type.map(|r| self.embed(r));
                }
                dto
            })
            .collect()
    }

    /// Store a new building under a fresh id and return it
    pub async fn create_building(&self, mut dto: BuildingPolygonDto) -> BuildingPolygonDto {
        let id = uuid::Uuid::new_v4().to_string();
        dto.building_id = Some(id.clone());
        self.buildings.write().await.insert(id, dto.clone());
        dto
    }

    /// `None` when no building has this id
    pub async fn update_building(
        &self,
        id: &str,
        mut dto: BuildingPolygonDto,
    ) -> Option<BuildingPolygonDto> {
        let mut buildings = self.buildings.write().await;
        let stored = buildings.get_mut(id)?;
        dto.building_id = Some(id.to_string());
        *stored = dto.clone();
        Some(dto)
    }

    pub async fn delete_building(&self, id: &str) -> bool {
        self.buildings.write().await.remove(id).is_some()
    }

    pub async fn roads(&self) -> Vec<RoadDto> {
        self.roads.read().await.values().cloned().collect()
    }

    /// Roads keep the id they were sent with; an empty id gets a fresh one
    pub async fn create_road(&self, mut dto: RoadDto) -> RoadDto {
        if dto.id.is_empty() {
            dto.id = uuid::Uuid::new_v4().to_string();
        }
        self.roads.write().await.insert(dto.id.clone(), dto.clone());
        dto
    }

    pub async fn update_road(&self, dto: RoadDto) -> Option<RoadDto> {
        let mut roads = self.roads.write().await;
        let stored = roads.get_mut(&dto.id)?;
        *stored = dto.clone();
        Some(dto)
    }

    pub async fn delete_road(&self, id: &str) -> bool {
        self.roads.write().await.remove(id).is_some()
    }

    fn embed(&self, reference: BuildingTypeRef) -> BuildingTypeRef {
        match self
            .building_types
            .iter()
            .find(|t| t.building_type_id == reference.building_type_id)
        {
            Some(t) => BuildingTypeRef {
                label_name: Some(t.label_name.clone()),
                color: Some(t.color.clone()),
                ..reference
            },
            None => reference,
        }
    }
}

/// Catalog the server starts with
pub fn seed_building_types() -> Vec<BuildingType> {
    vec![
        BuildingType {
            building_type_id: "detached-house".to_string(),
            label_name: "Detached house".to_string(),
            description: "Free-standing family home".to_string(),
            unit: Unit::CubicMeters,
            cost_per_unit: 450.0,
            inhabitable: true,
            residents_per_unit: Some(0.006),
            points: 1.0,
            color: "#34d399".to_string(),
        },
        BuildingType {
            building_type_id: "apartments".to_string(),
            label_name: "Apartment block".to_string(),
            description: "Stacked dwellings".to_string(),
            unit: Unit::CubicMeters,
            cost_per_unit: 380.0,
            inhabitable: true,
            residents_per_unit: Some(0.01),
            points: 1.5,
            color: "#f59e0b".to_string(),
        },
        BuildingType {
            building_type_id: "office".to_string(),
            label_name: "Office".to_string(),
            description: "Commercial floor space".to_string(),
            unit: Unit::SquareMeters,
            cost_per_unit: 1500.0,
            inhabitable: false,
            residents_per_unit: None,
            points: 2.0,
            color: "#60a5fa".to_string(),
        },
        BuildingType {
            building_type_id: "park".to_string(),
            label_name: "Park".to_string(),
            description: String::new(),
            unit: Unit::SquareMeters,
            cost_per_unit: 60.0,
            inhabitable: false,
            residents_per_unit: None,
            points: 3.0,
            color: "#22c55e".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::wire::{Coordinate, PolygonDto};

    fn building(type_id: &str) -> BuildingPolygonDto {
        BuildingPolygonDto {
            building_id: None,
            name: "Building 1".to_string(),
            description: "Drawn building".to_string(),
            building_type: Some(BuildingTypeRef {
                building_type_id: type_id.to_string(),
                label_name: None,
                color: None,
            }),
            polygon: PolygonDto {
                coordinates: vec![
                    Coordinate { x: 0.0, y: 0.0, z: 0.0 },
                    Coordinate { x: 0.0, y: 0.001, z: 0.0 },
                    Coordinate { x: 0.001, y: 0.0, z: 0.0 },
                    Coordinate { x: 0.0, y: 0.0, z: 0.0 },
                ],
            },
            height: 10.0,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let storage = Storage::new(seed_building_types());
        let created = storage.create_building(building("office")).await;
        let id = created.building_id.clone().unwrap();
        assert!(!id.is_empty());
        assert_eq!(storage.buildings(false).await, vec![created]);
    }

    #[tokio::test]
    async fn test_embed_types() {
        let storage = Storage::new(seed_building_types());
        storage.create_building(building("office")).await;
        storage.create_building(building("unknown")).await;

        let embedded = storage.buildings(true).await;
        let colors: Vec<Option<String>> = embedded
            .iter()
            .map(|b| b.building_type.as_ref().unwrap().color.clone())
            .collect();
        assert_eq!(colors.iter().filter(|c| c.is_some()).count(), 1);
        assert!(colors.contains(&Some("#60a5fa".to_string())));
    }

    #[tokio::test]
    async fn test_update_unknown_building() {
        let storage = Storage::default();
        assert!(storage.update_building("nope", building("office")).await.is_none());
        assert!(!storage.delete_building("nope").await);
    }
}
