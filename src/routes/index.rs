//! `GET /` service descriptor.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::collections::BTreeMap;

use super::AppState;
use crate::models::FoodCategory;

/// Handling rules of one food category.
#[derive(Serialize)]
struct CategoryProfile {
    rango_optimo: &'static str,
    umbral_alerta: &'static str,
    umbral_critico: &'static str,
    tiempo_maximo_fuera_rango: &'static str,
}

fn profile(category: FoodCategory) -> CategoryProfile {
    match category {
        FoodCategory::Congelado => CategoryProfile {
            rango_optimo: "-22°C - -18°C",
            umbral_alerta: "> -15°C",
            umbral_critico: "> -12°C",
            tiempo_maximo_fuera_rango: "15 minutos",
        },
        FoodCategory::Refrigerado => CategoryProfile {
            rango_optimo: "0°C - 4°C",
            umbral_alerta: "> 4°C",
            umbral_critico: "> 7°C",
            tiempo_maximo_fuera_rango: "30 minutos",
        },
        FoodCategory::Delicado => CategoryProfile {
            rango_optimo: "0°C - 2°C",
            umbral_alerta: "> 2°C",
            umbral_critico: "> 3°C",
            tiempo_maximo_fuera_rango: "15 minutos",
        },
    }
}

#[derive(Serialize)]
struct ServiceInfo {
    servicio: &'static str,
    version: &'static str,
    backend: &'static str,
    categorias_alimentos: BTreeMap<&'static str, CategoryProfile>,
    endpoints: &'static [&'static str],
}

const ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /sensores",
    "GET /sensores/{id}",
    "GET /lecturas",
    "GET /lecturas/alertas",
    "GET /lecturas/cadena-rota",
    "GET /lecturas/estadisticas/{ubicacionId}",
    "GET /lecturas/tracking/{ubicacionId}",
    "GET /lecturas/mapa",
    "GET /vehiculos",
    "GET /vehiculos/{id}",
    "GET /vehiculos/{id}/estado-cadena",
    "GET /dashboard/resumen",
];

async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        servicio: "Cold-chain monitor",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.config.backend_name(),
        categorias_alimentos: FoodCategory::ALL
            .into_iter()
            .map(|c| (c.as_str(), profile(c)))
            .collect(),
        endpoints: ENDPOINTS,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(service_info))
}
