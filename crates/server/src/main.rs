use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

mod routes;
mod storage;

use storage::{seed_building_types, Storage};

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/buildings/list", get(routes::list_buildings))
        .route("/api/buildings/building", post(routes::create_building))
        .route(
            "/api/buildings/building/{id}",
            put(routes::update_building).delete(routes::delete_building),
        )
        .route("/api/roads/list", get(routes::list_roads))
        .route(
            "/api/roads",
            post(routes::create_road)
                .put(routes::update_road)
                .delete(routes::delete_road),
        )
        .route("/api/building/types/list", get(routes::list_building_types))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=info".into()),
        )
        .init();

    let state = AppState {
        storage: Arc::new(Storage::new(seed_building_types())),
    };

    let addr = std::env::var("FOOTPRINT_SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {addr}: {e}");
            return;
        }
    };
    tracing::info!("Server running on http://{addr}");
    if let Err(e) = axum::serve(listener, app(state)).await {
        tracing::error!("Server error: {e}");
    }
}
