//! Building-type catalog records and cost estimation

use serde::{Deserialize, Serialize};

/// Quantity a catalog type is priced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "m2")]
    SquareMeters,
    #[default]
    #[serde(rename = "m3")]
    CubicMeters,
}

impl Unit {
    pub fn abbrev(&self) -> &'static str {
        match self {
            Unit::SquareMeters => "m²",
            Unit::CubicMeters => "m³",
        }
    }
}

/// Externally defined building classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingType {
    pub building_type_id: String,
    pub label_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub cost_per_unit: f64,
    #[serde(default)]
    pub inhabitable: bool,
    #[serde(default)]
    pub residents_per_unit: Option<f64>,
    #[serde(default)]
    pub points: f64,
    /// CSS hex color, e.g. `#34d399`
    pub color: String,
}

/// Derived costing figures for a polygon of a given catalog type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub unit: Unit,
    /// Area (m²) or volume (m³) depending on `unit`
    pub base_quantity: f64,
    pub cost: f64,
    pub residents: Option<u64>,
    pub points: f64,
}

impl CostEstimate {
    pub fn compute(building_type: &BuildingType, area_m2: f64, volume_m3: f64) -> Self {
        let base = match building_type.unit {
            Unit::SquareMeters => area_m2,
            Unit::CubicMeters => volume_m3,
        };
        let residents = if building_type.inhabitable {
            building_type
                .residents_per_unit
                .map(|per_unit| (base * per_unit).round().max(0.0) as u64)
        } else {
            None
        };
        Self {
            unit: building_type.unit,
            base_quantity: base,
            cost: base * building_type.cost_per_unit,
            residents,
            // scaled down to keep scores readable
            points: base * building_type.points / 100.0,
        }
    }
}

/// In-memory lookup over the catalog list
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: Vec<BuildingType>,
}

impl Catalog {
    pub fn new(types: Vec<BuildingType>) -> Self {
        Self { types }
    }

    pub fn get(&self, building_type_id: &str) -> Option<&BuildingType> {
        self.types
            .iter()
            .find(|t| t.building_type_id == building_type_id)
    }

    pub fn by_label(&self, label: &str) -> Option<&BuildingType> {
        self.types.iter().find(|t| t.label_name == label)
    }

    pub fn all(&self) -> &[BuildingType] {
        &self.types
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached_house() -> BuildingType {
        BuildingType {
            building_type_id: "a".into(),
            label_name: "Detached house".into(),
            description: String::new(),
            unit: Unit::CubicMeters,
            cost_per_unit: 500.0,
            inhabitable: true,
            residents_per_unit: Some(0.005),
            points: 4.0,
            color: "#f97316".into(),
        }
    }

    #[test]
    fn test_estimate_by_volume() {
        let e = CostEstimate::compute(&detached_house(), 100.0, 1000.0);
        assert_eq!(e.base_quantity, 1000.0);
        assert_eq!(e.cost, 500_000.0);
        assert_eq!(e.residents, Some(5));
        assert_eq!(e.points, 40.0);
    }

    #[test]
    fn test_estimate_by_area_without_residents() {
        let park = BuildingType {
            unit: Unit::SquareMeters,
            cost_per_unit: 150.0,
            inhabitable: false,
            residents_per_unit: None,
            points: 10.0,
            ..detached_house()
        };
        let e = CostEstimate::compute(&park, 200.0, 0.0);
        assert_eq!(e.base_quantity, 200.0);
        assert_eq!(e.cost, 30_000.0);
        assert_eq!(e.residents, None);
    }

    #[test]
    fn test_unit_wire_names() {
        assert_eq!(serde_json::to_string(&Unit::SquareMeters).unwrap(), "\"m2\"");
        let u: Unit = serde_json::from_str("\"m3\"").unwrap();
        assert_eq!(u, Unit::CubicMeters);
    }

    #[test]
    fn test_catalog_lookup() {
        let c = Catalog::new(vec![detached_house()]);
        assert!(c.get("a").is_some());
        assert!(c.get("b").is_none());
        assert!(c.by_label("Detached house").is_some());
    }
}
