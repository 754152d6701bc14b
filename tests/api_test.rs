//! HTTP-level tests for the monitoring API.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot` over a
//! fixture-backed store, so no database or running server is required.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use coldchain_monitor::{
    config,
    routes,
    store::{JsonStore, Store},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// ---

fn sensor(id: &str, nombre: &str, tipo: &str, ubicacion: &str, activo: bool) -> Value {
    json!({
        "id": id,
        "nombre": nombre,
        "tipoAlimento": tipo,
        "rangoMin": if tipo == "congelado" { -22.0 } else { 0.0 },
        "rangoMax": if tipo == "congelado" { -18.0 } else { 4.0 },
        "ubicacionId": ubicacion,
        "activo": activo
    })
}

#[allow(clippy::too_many_arguments)]
fn lectura(
    id: &str,
    sensor: &str,
    ubicacion: &str,
    ts: &str,
    temp: f64,
    estado: &str,
    tiempo: i32,
    cadena_rota: bool,
) -> Value {
    json!({
        "id": id,
        "sensorId": sensor,
        "ubicacionId": ubicacion,
        "timestamp": ts,
        "temperatura": temp,
        "gps": { "latitud": 40.4168, "longitud": -3.7038 },
        "estado": estado,
        "alertaActiva": estado != "normal",
        "tiempoFueraRango": tiempo,
        "cadenaRota": cadena_rota
    })
}

fn fleet() -> JsonStore {
    // ---
    let recent = (Utc::now() - chrono::Duration::hours(1)).to_rfc3339();
    let mut with_altitude = lectura(
        "L-002", "S-002", "V-001", "2025-03-21T08:05:00Z", 3.0, "normal", 0, false,
    );
    with_altitude["gps"]["altitud"] = json!(650.0);

    JsonStore::from_values(
        vec![
            sensor("S-001", "Camara congelados", "congelado", "V-001", true),
            sensor("S-002", "Camara refrigerados", "refrigerado", "V-001", true),
            sensor("S-003", "Camara delicados", "delicado", "V-002", true),
            sensor("S-004", "Sonda retirada", "refrigerado", "V-001", false),
        ],
        vec![
            lectura("L-001", "S-001", "V-001", "2025-03-21T08:00:00Z", -20.5, "normal", 0, false),
            with_altitude,
            lectura("L-003", "S-001", "V-001", "2025-03-21T09:00:00Z", -11.0, "critico", 20, false),
            lectura("L-004", "S-002", "V-001", "2025-03-21T09:05:00Z", 5.5, "alerta", 10, false),
            lectura("L-005", "S-003", "V-002", "2025-03-21T09:30:00Z", 1.5, "normal", 0, true),
            lectura("L-006", "S-004", "V-001", "2025-03-21T07:00:00Z", 2.0, "normal", 0, false),
            lectura("L-007", "S-003", "V-002", &recent, 1.0, "normal", 0, false),
        ],
        vec![
            json!({ "id": "V-002", "matricula": "5678-DEF" }),
            json!({ "id": "V-001", "matricula": "1234-ABC" }),
            json!({ "id": "V-003", "matricula": "0000-XYZ" }),
        ],
    )
}

fn app(store: JsonStore) -> Router {
    // ---
    let cfg = config::load_from(|name| (name == "STORE_BACKEND").then(|| "json".to_string()))
        .expect("json config");
    let state = AppState {
        store: Store::new(Arc::new(store), Duration::from_secs(2)),
        config: Arc::new(cfg),
    };
    routes::router(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    // ---
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn ids(items: &Value) -> Vec<&str> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect()
}

// ---

#[tokio::test]
async fn health_reports_connected_store() {
    let (status, body) = get(app(fleet()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn service_descriptor_lists_categories() {
    let (status, body) = get(app(fleet()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categorias_alimentos"]["refrigerado"]["umbral_critico"], "> 7°C");
    assert_eq!(body["backend"], "json");
}

#[tokio::test]
async fn sensors_are_active_and_ordered_by_name() {
    // ---
    let (status, body) = get(app(fleet()), "/sensores").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(ids(&body["data"]), ["S-001", "S-003", "S-002"]);

    let (_, body) = get(app(fleet()), "/sensores?ubicacionId=V-001&tipoAlimento=congelado").await;
    assert_eq!(ids(&body["data"]), ["S-001"]);

    let (status, body) = get(app(fleet()), "/sensores/S-404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["statusCode"], 404);
    assert_eq!(body["error"]["path"], "/sensores/S-404");
}

#[tokio::test]
async fn unknown_food_category_is_a_bad_request() {
    let (status, body) = get(app(fleet()), "/sensores?tipoAlimento=seco").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], "tipoAlimento");
}

#[tokio::test]
async fn readings_listing_with_statistics() {
    // ---
    let (status, body) = get(app(fleet()), "/lecturas").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 7);
    assert_eq!(body["limit"], 100);
    assert_eq!(body["estadisticas"]["alertas"], 2);
    assert_eq!(body["estadisticas"]["criticas"], 1);
    assert_eq!(body["estadisticas"]["cadenas_rotas"], 1);
    assert_eq!(body["estadisticas"]["porcentaje_normal"], 71.43);
    assert_eq!(body["data"][0]["id"], "L-007");
}

#[tokio::test]
async fn readings_date_range_is_inclusive_and_newest_first() {
    // ---
    let uri = "/lecturas?from=2025-03-21T08:00:00Z&to=2025-03-21T09:00:00Z";
    let (status, body) = get(app(fleet()), uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["data"]), ["L-003", "L-002", "L-001"]);
}

#[tokio::test]
async fn readings_combine_filters_with_and() {
    // ---
    let (_, body) = get(app(fleet()), "/lecturas?ubicacionId=V-001&estado=normal&limit=2").await;
    assert_eq!(ids(&body["data"]), ["L-002", "L-001"]);
    assert_eq!(body["limit"], 2);

    let (_, body) = get(app(fleet()), "/lecturas?cadenaRota=true").await;
    assert_eq!(ids(&body["data"]), ["L-005"]);
}

#[tokio::test]
async fn empty_listing_reports_zero_percent_normal() {
    let (status, body) = get(app(fleet()), "/lecturas?sensorId=S-999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["estadisticas"]["porcentaje_normal"], 0.0);
}

#[tokio::test]
async fn invalid_parameters_are_rejected_with_envelope() {
    // ---
    let (status, body) = get(app(fleet()), "/lecturas?from=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = &body["error"];
    assert_eq!(error["statusCode"], 400);
    assert_eq!(error["method"], "GET");
    assert_eq!(error["path"], "/lecturas");
    assert_eq!(error["details"]["field"], "from");
    assert!(error["timestamp"].is_string());

    let (status, body) = get(app(fleet()), "/lecturas?from=2025-03-22&to=2025-03-21").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("'from'"));

    let (status, _) = get(app(fleet()), "/lecturas?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(fleet()), "/lecturas?limit=1001").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(fleet()), "/lecturas/tracking/V-001?limit=501").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_query_string_uses_error_envelope() {
    // ---
    let (status, body) = get(app(fleet()), "/lecturas?limit=5&limit=6").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = &body["error"];
    assert_eq!(error["statusCode"], 400);
    assert_eq!(error["path"], "/lecturas");
    assert_eq!(error["method"], "GET");
    assert!(error["message"].as_str().unwrap().contains("limit"));

    let (status, body) = get(app(fleet()), "/sensores?tipoAlimento=a&tipoAlimento=b").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["path"], "/sensores");
}

#[tokio::test]
async fn chain_flag_and_empty_dates_are_lenient() {
    // ---
    let (status, body) = get(app(fleet()), "/lecturas?cadenaRota=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["data"]), ["L-005"]);

    let (_, body) = get(app(fleet()), "/lecturas?cadenaRota=No").await;
    assert_eq!(body["total"], 6);

    let (status, body) = get(app(fleet()), "/lecturas?from=&to=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 7);
}

#[tokio::test]
async fn active_alerts_and_broken_chains() {
    // ---
    let (_, body) = get(app(fleet()), "/lecturas/alertas").await;
    assert_eq!(body["total"], 2);
    assert_eq!(ids(&body["data"]), ["L-004", "L-003"]);

    let (_, body) = get(app(fleet()), "/lecturas/cadena-rota").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["sensores_afectados"], 1);
    assert_eq!(ids(&body["por_sensor"]["S-003"]), ["L-005"]);
}

#[tokio::test]
async fn location_statistics() {
    // ---
    let (status, body) = get(app(fleet()), "/lecturas/estadisticas/V-001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ubicacionId"], "V-001");
    assert_eq!(body["total_lecturas"], 5);
    assert_eq!(body["temperatura_minima"], -20.5);
    assert_eq!(body["temperatura_maxima"], 5.5);
    assert_eq!(body["lecturas_criticas"], 1);
    assert_eq!(body["cadena_rota"], false);
    assert_eq!(body["tiempo_max_fuera_rango"], 20);

    let (status, body) = get(app(fleet()), "/lecturas/estadisticas/V-404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["statusCode"], 404);
}

#[tokio::test]
async fn tracking_is_ascending_and_keeps_missing_altitude() {
    // ---
    let (status, body) = get(app(fleet()), "/lecturas/tracking/V-001?limit=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_puntos"], 3);

    let puntos = body["puntos"].as_array().unwrap();
    assert_eq!(puntos[0]["timestamp"], "2025-03-21T07:00:00Z");
    assert_eq!(puntos[1]["temperatura"], -20.5);
    assert!(puntos[1]["altitud"].is_null());
    assert_eq!(puntos[2]["altitud"], 650.0);

    let (status, _) = get(app(fleet()), "/lecturas/tracking/V-404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn map_has_one_position_per_location() {
    // ---
    let (_, body) = get(app(fleet()), "/lecturas/mapa").await;
    assert_eq!(body["total_ubicaciones"], 2);
    let positions = body["ubicaciones"].as_array().unwrap();
    assert_eq!(positions[0]["ubicacionId"], "V-001");
    assert_eq!(positions[0]["sensorId"], "S-002");
    assert_eq!(positions[1]["ubicacionId"], "V-002");
}

#[tokio::test]
async fn vehicles_and_chain_state() {
    // ---
    let (_, body) = get(app(fleet()), "/vehiculos").await;
    assert_eq!(ids(&body["data"]), ["V-003", "V-001", "V-002"]);

    let (_, body) = get(app(fleet()), "/vehiculos/V-001").await;
    assert_eq!(body["matricula"], "1234-ABC");
    assert_eq!(ids(&body["sensores"]), ["S-001", "S-002"]);

    let (status, body) = get(app(fleet()), "/vehiculos/V-001/estado-cadena").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["estado_general"], "critico");
    assert_eq!(body["zonas_normal"], 0);
    assert_eq!(body["zonas_alerta"], 1);
    assert_eq!(body["zonas_criticas"], 1);
    assert_eq!(body["cadenas_rotas"], 0);
    assert_eq!(body["zonas"][0]["rangoOptimo"], "-22°C - -18°C");

    let (_, body) = get(app(fleet()), "/vehiculos/V-003/estado-cadena").await;
    assert_eq!(body["estado_general"], "sin_sensores");

    let (status, _) = get(app(fleet()), "/vehiculos/V-404/estado-cadena").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_rollup() {
    // ---
    let (status, body) = get(app(fleet()), "/dashboard/resumen").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_sensores"], 3);
    assert_eq!(body["sensores_por_tipo_alimento"]["congelado"], 1);
    assert_eq!(body["total_lecturas_24h"], 1);
    assert_eq!(body["lecturas_por_estado"]["normal"], 1);
    assert_eq!(body["total_vehiculos"], 3);
    assert_eq!(body["alertas_activas"], 2);
    assert_eq!(body["cadenas_rotas"], 1);
    assert_eq!(body["porcentaje_salud"], 100.0);
}

#[tokio::test]
async fn dashboard_without_recent_readings_is_fully_healthy() {
    // ---
    let store = JsonStore::from_values(
        vec![],
        vec![lectura("L-1", "S-1", "V-1", "2025-01-01T00:00:00Z", 9.0, "critico", 60, true)],
        vec![],
    );
    let (_, body) = get(app(store), "/dashboard/resumen").await;
    assert_eq!(body["total_lecturas_24h"], 0);
    assert_eq!(body["porcentaje_salud"], 100.0);
    assert_eq!(body["cadenas_rotas"], 1);
}

#[tokio::test]
async fn corrupt_record_is_a_server_error_without_detail_leak() {
    // ---
    let store = JsonStore::from_values(
        vec![sensor("S-bad", "Sonda", "seco", "V-001", true)],
        vec![],
        vec![],
    );
    let (status, body) = get(app(store), "/sensores").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["details"]["entity"], "sensor");
    assert!(!body["error"]["message"].as_str().unwrap().contains("seco"));
}

#[tokio::test]
async fn unknown_route_uses_error_envelope() {
    let (status, body) = get(app(fleet()), "/camiones").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["path"], "/camiones");
}

#[tokio::test]
async fn repeated_query_returns_identical_results() {
    // ---
    let store = Arc::new(fleet());
    let uri = "/lecturas?ubicacionId=V-001";
    let mut bodies = Vec::new();
    for _ in 0..2 {
        let cfg = config::load_from(|name| (name == "STORE_BACKEND").then(|| "json".to_string()))
            .unwrap();
        let state = AppState {
            store: Store::new(store.clone(), Duration::from_secs(2)),
            config: Arc::new(cfg),
        };
        let (_, body) = get(routes::router(state), uri).await;
        bodies.push(body["data"].clone());
    }
    assert_eq!(bodies[0], bodies[1]);
}
