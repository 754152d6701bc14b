use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use super::{ApiQuery, AppState};
use crate::error::ApiError;
use crate::filter::SensorsQuery;
use crate::models::Sensor;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/sensores", get(list_sensors))
        .route("/sensores/{id}", get(get_sensor))
}

#[derive(Serialize)]
struct SensorList {
    total: usize,
    data: Vec<Sensor>,
}

/// Active sensors, ordered by name.
async fn list_sensors(
    ApiQuery(params): ApiQuery<SensorsQuery>,
    State(state): State<AppState>,
) -> Result<Json<SensorList>, ApiError> {
    // ---
    let filter = params.resolve()?;
    let sensors = state.store.find_sensors(&filter).await?;

    info!("GET /sensores - returning {} sensors", sensors.len());
    Ok(Json(SensorList {
        total: sensors.len(),
        data: sensors,
    }))
}

async fn get_sensor(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Sensor>, ApiError> {
    state
        .store
        .find_sensor(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Sensor not found".to_string()))
}
