use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::response::{success, Success};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/registry", get(registry_health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is running", body = HealthResponse)),
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistryHealth {
    /// `up` or `down`.
    pub registry: String,
}

#[utoipa::path(
    get,
    path = "/health/registry",
    tag = "Health",
    responses((status = 200, description = "Registry reachability", body = Success<RegistryHealth>)),
)]
pub async fn registry_health(State(state): State<AppState>) -> Json<Success<RegistryHealth>> {
    let up = state.registry.is_available().await;
    success(RegistryHealth {
        registry: if up { "up" } else { "down" }.to_string(),
    })
}
