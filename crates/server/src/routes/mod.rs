use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::AppState;
use shared::wire::{BuildingPolygonDto, RoadDeleteDto, RoadDto};
use shared::BuildingType;

/// Health check
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub embed_types: bool,
}

// ── Buildings ───────────────────────────────────────────────────

pub async fn list_buildings(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<BuildingPolygonDto>> {
    Json(state.storage.buildings(query.embed_types).await)
}

pub async fn create_building(
    State(state): State<AppState>,
    Json(dto): Json<BuildingPolygonDto>,
) -> Result<(StatusCode, Json<BuildingPolygonDto>), StatusCode> {
    if dto.polygon.coordinates.len() < 3 {
        tracing::warn!("Rejecting building with {} points", dto.polygon.coordinates.len());
        return Err(StatusCode::BAD_REQUEST);
    }
    let created = state.storage.create_building(dto).await;
    tracing::info!("Created building {:?}", created.building_id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_building(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(dto): Json<BuildingPolygonDto>,
) -> Result<Json<BuildingPolygonDto>, StatusCode> {
    state
        .storage
        .update_building(&id, dto)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn delete_building(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.storage.delete_building(&id).await {
        tracing::info!("Deleted building {id}");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// ── Roads ───────────────────────────────────────────────────────

pub async fn list_roads(State(state): State<AppState>) -> Json<Vec<RoadDto>> {
    Json(state.storage.roads().await)
}

pub async fn create_road(
    State(state): State<AppState>,
    Json(dto): Json<RoadDto>,
) -> Result<(StatusCode, Json<RoadDto>), StatusCode> {
    if dto.coordinates.len() < 2 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let created = state.storage.create_road(dto).await;
    tracing::info!("Created road {}", created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_road(
    State(state): State<AppState>,
    Json(dto): Json<RoadDto>,
) -> Result<Json<RoadDto>, StatusCode> {
    state
        .storage
        .update_road(dto)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// The road id travels in the body
pub async fn delete_road(
    State(state): State<AppState>,
    Json(body): Json<RoadDeleteDto>,
) -> StatusCode {
    if state.storage.delete_road(&body.id).await {
        tracing::info!("Deleted road {}", body.id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// ── Catalog ─────────────────────────────────────────────────────

pub async fn list_building_types(State(state): State<AppState>) -> Json<Vec<BuildingType>> {
    Json(state.storage.building_types().to_vec())
}
