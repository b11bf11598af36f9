use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::wire::{BuildingPolygonDto, RoadDeleteDto, RoadDto};
use shared::{BuildingType, Feature};
use tracing::{debug, warn};

use super::{CatalogApi, FeatureApi};
use crate::error::ApiError;

/// REST client. Buildings and roads are separate resources on the backend.
pub struct HttpFeatureApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeatureApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.client.get(self.url(path)).send().await?;
        let body = success_body(response).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("GET {path}: {e}")))
    }

    /// Send a JSON body. `None` means the backend answered 2xx without a JSON body.
    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, ApiError> {
        debug!("{method} {path}");
        let response = self
            .client
            .request(method, self.url(path))
            .json(body)
            .send()
            .await?;
        let text = success_body(response).await?;
        Ok(decode_echo(&text))
    }
}

async fn success_body(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Non-JSON (or differently shaped) success bodies are treated as an echo of
/// the request payload
fn decode_echo<T: DeserializeOwned>(body: &str) -> Option<T> {
    serde_json::from_str(body).ok()
}

/// The request feature, with the id the backend reported if any
fn with_reported_id(feature: &Feature, reported: Option<String>) -> Feature {
    let mut echoed = feature.clone();
    if let Some(id) = reported.filter(|id| !id.is_empty()) {
        echoed.id = id;
    }
    echoed
}

impl FeatureApi for HttpFeatureApi {
    async fn list(&self) -> Result<Vec<Feature>, ApiError> {
        let buildings: Vec<BuildingPolygonDto> =
            self.get("/api/buildings/list?embedTypes=true").await?;
        let roads: Vec<RoadDto> = self.get("/api/roads/list").await?;

        let mut features = Vec::with_capacity(buildings.len() + roads.len());
        for dto in buildings {
            match Feature::try_from(dto) {
                Ok(feature) => features.push(feature),
                Err(e) => warn!("Skipping building: {e}"),
            }
        }
        for dto in roads {
            match Feature::try_from(dto) {
                Ok(feature) => features.push(feature),
                Err(e) => warn!("Skipping road: {e}"),
            }
        }
        Ok(features)
    }

    async fn create(&self, feature: &Feature) -> Result<Feature, ApiError> {
        if feature.is_polygon() {
            let dto = BuildingPolygonDto::from_feature(feature, false);
            let reply: Option<BuildingPolygonDto> = self
                .send(reqwest::Method::POST, "/api/buildings/building", &dto)
                .await?;
            Ok(with_reported_id(feature, reply.and_then(|r| r.building_id)))
        } else {
            let dto = RoadDto::from_feature(feature);
            let reply: Option<RoadDto> = self.send(reqwest::Method::POST, "/api/roads", &dto).await?;
            Ok(with_reported_id(feature, reply.map(|r| r.id)))
        }
    }

    async fn update(&self, id: &str, feature: &Feature) -> Result<Feature, ApiError> {
        if feature.is_polygon() {
            let dto = BuildingPolygonDto::from_feature(feature, true);
            let path = format!("/api/buildings/building/{id}");
            let _: Option<serde_json::Value> = self.send(reqwest::Method::PUT, &path, &dto).await?;
        } else {
            let dto = RoadDto::from_feature(feature);
            let _: Option<serde_json::Value> =
                self.send(reqwest::Method::PUT, "/api/roads", &dto).await?;
        }
        Ok(feature.clone())
    }

    async fn delete(&self, id: &str, is_polygon: bool) -> Result<(), ApiError> {
        if is_polygon {
            let path = format!("/api/buildings/building/{id}");
            let response = self.client.delete(self.url(&path)).send().await?;
            success_body(response).await?;
        } else {
            let body = RoadDeleteDto { id: id.to_string() };
            let _: Option<serde_json::Value> =
                self.send(reqwest::Method::DELETE, "/api/roads", &body).await?;
        }
        Ok(())
    }
}

impl CatalogApi for HttpFeatureApi {
    async fn building_types(&self) -> Result<Vec<BuildingType>, ApiError> {
        self.get("/api/building/types/list").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_url_join_strips_trailing_slash() {
        let api = HttpFeatureApi::new("http://localhost:8080/");
        assert_eq!(api.url("/api/roads"), "http://localhost:8080/api/roads");
    }

    #[test]
    fn test_non_json_success_is_echo() {
        assert!(decode_echo::<RoadDto>("Road updated").is_none());
        assert!(decode_echo::<serde_json::Value>("").is_none());
        let v: Option<serde_json::Value> = decode_echo(r#"{"ok": true}"#);
        assert_eq!(v.unwrap()["ok"], true);
    }

    #[test]
    fn test_reported_id_replaces_temporary() {
        let feature = fixtures::building("tmp", fixtures::triangle_ring(), 10.0);
        assert_eq!(with_reported_id(&feature, Some("srv".into())).id, "srv");
        assert_eq!(with_reported_id(&feature, None).id, "tmp");
        assert_eq!(with_reported_id(&feature, Some(String::new())).id, "tmp");
    }
}
