use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use super::AppState;
use crate::chain::{self, ChainReport};
use crate::error::ApiError;
use crate::filter::SensorFilter;
use crate::models::{Sensor, Vehicle};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/vehiculos", get(list_vehicles))
        .route("/vehiculos/{id}", get(get_vehicle))
        .route("/vehiculos/{id}/estado-cadena", get(chain_state))
}

#[derive(Serialize)]
struct VehicleList {
    total: usize,
    data: Vec<Vehicle>,
}

/// Vehicles ordered by plate.
async fn list_vehicles(State(state): State<AppState>) -> Result<Json<VehicleList>, ApiError> {
    // ---
    let vehicles = state.store.find_vehicles().await?;
    info!("GET /vehiculos - returning {} vehicles", vehicles.len());
    Ok(Json(VehicleList {
        total: vehicles.len(),
        data: vehicles,
    }))
}

#[derive(Serialize)]
struct VehicleDetail {
    #[serde(flatten)]
    vehicle: Vehicle,
    sensores: Vec<Sensor>,
}

/// One vehicle and its active sensors.
async fn get_vehicle(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<VehicleDetail>, ApiError> {
    // ---
    let vehicle = state
        .store
        .find_vehicle(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Vehicle not found".to_string()))?;
    let sensores = state
        .store
        .find_sensors(&SensorFilter::active_in(&vehicle.id))
        .await?;

    Ok(Json(VehicleDetail { vehicle, sensores }))
}

async fn chain_state(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ChainReport>, ApiError> {
    chain::vehicle_chain_state(&state.store, &id).await.map(Json)
}
