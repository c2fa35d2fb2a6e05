use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Success envelope: `{ "status": "success", "data": ... }`.
#[derive(Debug, Serialize, ToSchema)]
pub struct Success<T> {
    pub status: String,
    pub data: T,
}

pub fn success<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        status: "success".to_string(),
        data,
    })
}
