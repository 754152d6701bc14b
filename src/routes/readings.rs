use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, info};

use super::{ApiQuery, AppState};
use crate::error::ApiError;
use crate::filter::{ReadingFilter, ReadingsQuery, TrackingQuery};
use crate::models::Reading;
use crate::stats::{self, LocationStats, MapPosition, SummaryStats, TrackingPoint};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/lecturas", get(list_readings))
        .route("/lecturas/alertas", get(active_alerts))
        .route("/lecturas/cadena-rota", get(broken_chains))
        .route("/lecturas/estadisticas/{ubicacion_id}", get(location_stats))
        .route("/lecturas/tracking/{ubicacion_id}", get(tracking))
        .route("/lecturas/mapa", get(fleet_map))
}

#[derive(Serialize)]
struct ReadingPage {
    total: usize,
    limit: u32,
    estadisticas: SummaryStats,
    data: Vec<Reading>,
}

/// Filtered readings, newest first, with a statistics block.
async fn list_readings(
    ApiQuery(params): ApiQuery<ReadingsQuery>,
    State(state): State<AppState>,
) -> Result<Json<ReadingPage>, ApiError> {
    // ---
    debug!("GET /lecturas - params {:?}", params);
    let filter = params.resolve()?;
    let readings = state.store.find_readings(&filter).await?;
    let estadisticas = stats::summary_stats(&readings);

    info!("GET /lecturas - returning {} readings", readings.len());
    Ok(Json(ReadingPage {
        total: estadisticas.total,
        limit: filter.limit.unwrap_or_default(),
        estadisticas,
        data: readings,
    }))
}

#[derive(Serialize)]
struct ReadingList {
    total: usize,
    data: Vec<Reading>,
}

async fn active_alerts(State(state): State<AppState>) -> Result<Json<ReadingList>, ApiError> {
    // ---
    let readings = state
        .store
        .find_readings(&ReadingFilter::active_alerts())
        .await?;

    info!("GET /lecturas/alertas - {} active alerts", readings.len());
    Ok(Json(ReadingList {
        total: readings.len(),
        data: readings,
    }))
}

#[derive(Serialize)]
struct BrokenChains {
    total: usize,
    sensores_afectados: usize,
    por_sensor: BTreeMap<String, Vec<Reading>>,
    data: Vec<Reading>,
}

async fn broken_chains(State(state): State<AppState>) -> Result<Json<BrokenChains>, ApiError> {
    // ---
    let readings = state
        .store
        .find_readings(&ReadingFilter::chain_broken())
        .await?;
    let por_sensor = stats::group_by_sensor(&readings);

    info!(
        "GET /lecturas/cadena-rota - {} readings over {} sensors",
        readings.len(),
        por_sensor.len()
    );
    Ok(Json(BrokenChains {
        total: readings.len(),
        sensores_afectados: por_sensor.len(),
        por_sensor,
        data: readings,
    }))
}

async fn location_stats(
    Path(ubicacion_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LocationStats>, ApiError> {
    // ---
    let readings = state
        .store
        .find_readings(&ReadingFilter::location(&ubicacion_id))
        .await?;
    stats::location_stats(&ubicacion_id, &readings).map(Json)
}

#[derive(Serialize)]
struct TrackingRoute {
    #[serde(rename = "ubicacionId")]
    ubicacion_id: String,
    total_puntos: usize,
    puntos: Vec<TrackingPoint>,
}

/// GPS route of one location, oldest point first.
async fn tracking(
    Path(ubicacion_id): Path<String>,
    ApiQuery(params): ApiQuery<TrackingQuery>,
    State(state): State<AppState>,
) -> Result<Json<TrackingRoute>, ApiError> {
    // ---
    let filter = params.resolve(&ubicacion_id)?;
    let readings = state.store.find_readings(&filter).await?;
    let puntos = stats::tracking_points(&ubicacion_id, &readings)?;

    Ok(Json(TrackingRoute {
        ubicacion_id,
        total_puntos: puntos.len(),
        puntos,
    }))
}

#[derive(Serialize)]
struct FleetMap {
    total_ubicaciones: usize,
    ubicaciones: Vec<MapPosition>,
}

/// Latest reading of every location.
async fn fleet_map(State(state): State<AppState>) -> Result<Json<FleetMap>, ApiError> {
    // ---
    let latest = state.store.latest_reading_per_location().await?;
    let ubicaciones: Vec<MapPosition> = latest.iter().map(MapPosition::from).collect();

    Ok(Json(FleetMap {
        total_ubicaciones: ubicaciones.len(),
        ubicaciones,
    }))
}
