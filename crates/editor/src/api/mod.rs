//! Remote persistence contract and its implementations.
//!
//! - `http.rs` - REST client against the reference backend
//! - `local.rs` - in-memory store for offline use

mod http;
mod local;

pub use http::HttpFeatureApi;
pub use local::LocalFeatureApi;

use shared::{BuildingType, Feature};

use crate::error::ApiError;

/// CRUD over features. Futures are `!Send`; the editor runs on a single thread.
#[allow(async_fn_in_trait)]
pub trait FeatureApi {
    async fn list(&self) -> Result<Vec<Feature>, ApiError>;

    /// Persist a new feature. The returned record carries the id the backend
    /// assigned, which may differ from the temporary one.
    async fn create(&self, feature: &Feature) -> Result<Feature, ApiError>;

    async fn update(&self, id: &str, feature: &Feature) -> Result<Feature, ApiError>;

    async fn delete(&self, id: &str, is_polygon: bool) -> Result<(), ApiError>;
}

/// Building-type catalog lookup
#[allow(async_fn_in_trait)]
pub trait CatalogApi {
    async fn building_types(&self) -> Result<Vec<BuildingType>, ApiError>;
}

/// Backend chosen at runtime from settings
pub enum Backend {
    Http(HttpFeatureApi),
    Local(LocalFeatureApi),
}

impl Backend {
    pub fn from_settings(settings: &crate::settings::ApiSettings) -> Self {
        if settings.use_local {
            Backend::Local(LocalFeatureApi::new())
        } else {
            Backend::Http(HttpFeatureApi::new(settings.base_url.clone()))
        }
    }
}

impl FeatureApi for Backend {
    async fn list(&self) -> Result<Vec<Feature>, ApiError> {
        match self {
            Backend::Http(api) => api.list().await,
            Backend::Local(api) => api.list().await,
        }
    }

    async fn create(&self, feature: &Feature) -> Result<Feature, ApiError> {
        match self {
            Backend::Http(api) => api.create(feature).await,
            Backend::Local(api) => api.create(feature).await,
        }
    }

    async fn update(&self, id: &str, feature: &Feature) -> Result<Feature, ApiError> {
        match self {
            Backend::Http(api) => api.update(id, feature).await,
            Backend::Local(api) => api.update(id, feature).await,
        }
    }

    async fn delete(&self, id: &str, is_polygon: bool) -> Result<(), ApiError> {
        match self {
            Backend::Http(api) => api.delete(id, is_polygon).await,
            Backend::Local(api) => api.delete(id, is_polygon).await,
        }
    }
}

impl CatalogApi for Backend {
    async fn building_types(&self) -> Result<Vec<BuildingType>, ApiError> {
        match self {
            Backend::Http(api) => api.building_types().await,
            Backend::Local(api) => api.building_types().await,
        }
    }
}
