use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use tracing::info;

use super::AppState;
use crate::error::ApiError;
use crate::filter::{ReadingFilter, SensorFilter};
use crate::stats::{self, DashboardSummary, FleetTotals};

// ---

/// Trailing window covered by the dashboard, in hours.
const WINDOW_HOURS: i64 = 24;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard/resumen", get(summary))
}

async fn summary(State(state): State<AppState>) -> Result<Json<DashboardSummary>, ApiError> {
    // ---
    let now = Utc::now();
    let store = &state.store;
    let active_sensors = SensorFilter {
        only_active: true,
        ..Default::default()
    };
    let window = ReadingFilter::trailing_hours(now, WINDOW_HOURS);
    let alerts = ReadingFilter::active_alerts();
    let broken = ReadingFilter::chain_broken();

    let (sensors, last_24h, vehicles, active_alerts, chain_broken) = tokio::try_join!(
        store.find_sensors(&active_sensors),
        store.find_readings(&window),
        store.count_vehicles(),
        store.count_readings(&alerts),
        store.count_readings(&broken),
    )?;

    let totals = FleetTotals {
        vehicles,
        active_alerts,
        chain_broken,
    };
    let summary = stats::dashboard_summary(&sensors, &last_24h, totals, now);

    info!(
        "GET /dashboard/resumen - {} readings in window, {}% healthy",
        summary.total_lecturas_24h, summary.porcentaje_salud
    );
    Ok(Json(summary))
}
