use std::cell::RefCell;
use std::collections::BTreeMap;

use shared::{BuildingType, Feature, FeatureId};

use super::{CatalogApi, FeatureApi};
use crate::error::ApiError;

/// In-memory backend for offline editing. Ids are kept as given.
#[derive(Default)]
pub struct LocalFeatureApi {
    features: RefCell<BTreeMap<FeatureId, Feature>>,
    catalog: Vec<BuildingType>,
}

impl LocalFeatureApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Vec<BuildingType>) -> Self {
        Self {
            features: RefCell::default(),
            catalog,
        }
    }

    pub fn len(&self) -> usize {
        self.features.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.borrow().is_empty()
    }
}

impl FeatureApi for LocalFeatureApi {
    async fn list(&self) -> Result<Vec<Feature>, ApiError> {
        Ok(self.features.borrow().values().cloned().collect())
    }

    async fn create(&self, feature: &Feature) -> Result<Feature, ApiError> {
        self.features
            .borrow_mut()
            .insert(feature.id.clone(), feature.clone());
        Ok(feature.clone())
    }

    async fn update(&self, id: &str, feature: &Feature) -> Result<Feature, ApiError> {
        let mut features = self.features.borrow_mut();
        match features.get_mut(id) {
            Some(stored) => {
                *stored = feature.clone();
                Ok(feature.clone())
            }
            None => Err(ApiError::Rejected(format!("unknown feature {id}"))),
        }
    }

    async fn delete(&self, id: &str, _is_polygon: bool) -> Result<(), ApiError> {
        self.features.borrow_mut().remove(id);
        Ok(())
    }
}

impl CatalogApi for LocalFeatureApi {
    async fn building_types(&self) -> Result<Vec<BuildingType>, ApiError> {
        Ok(self.catalog.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_crud_keeps_ids() {
        let api = LocalFeatureApi::new();
        let feature = fixtures::building("tmp", fixtures::triangle_ring(), 10.0);
        let created = api.create(&feature).await.unwrap();
        assert_eq!(created.id, "tmp");

        let mut changed = feature.clone();
        changed.height = 30.0;
        api.update("tmp", &changed).await.unwrap();
        assert_eq!(api.list().await.unwrap()[0].height, 30.0);

        api.delete("tmp", true).await.unwrap();
        assert!(api.is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_is_rejected() {
        let api = LocalFeatureApi::new();
        let feature = fixtures::road("r", fixtures::short_line());
        assert!(matches!(
            api.update("r", &feature).await,
            Err(ApiError::Rejected(_))
        ));
    }
}
