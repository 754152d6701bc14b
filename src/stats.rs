//! Reading classification and aggregation.
//!
//! Pure functions over reading sets that have already been fetched. Two
//! empty-set conventions coexist on purpose:
//! - [`summary_stats`] reports `porcentaje_normal = 0` for no readings: with
//!   no data the listing cannot claim the fleet is healthy.
//! - [`dashboard_summary`] reports `porcentaje_salud = 100` when the trailing
//!   window is empty.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiError;
use crate::models::{FoodCategory, Reading, ReadingState, Sensor};

// ---

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Statistics block attached to reading listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    #[serde(skip)]
    pub total: usize,
    /// `alerta` plus `critico`.
    pub alertas: usize,
    pub criticas: usize,
    pub cadenas_rotas: usize,
    pub porcentaje_normal: f64,
}

pub fn summary_stats(readings: &[Reading]) -> SummaryStats {
    // ---
    let total = readings.len();
    let alertas = readings.iter().filter(|r| r.estado.is_alert()).count();
    let criticas = readings
        .iter()
        .filter(|r| r.estado == ReadingState::Critico)
        .count();
    let cadenas_rotas = readings.iter().filter(|r| r.cadena_rota).count();

    let porcentaje_normal = if total == 0 {
        0.0
    } else {
        round2((total - alertas) as f64 / total as f64 * 100.0)
    };

    SummaryStats {
        total,
        alertas,
        criticas,
        cadenas_rotas,
        porcentaje_normal,
    }
}

/// Temperature and state rollup for one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationStats {
    #[serde(rename = "ubicacionId")]
    pub ubicacion_id: String,
    pub total_lecturas: usize,
    /// Rounded to two decimals. `None` when no reading carries a temperature.
    pub temperatura_promedio: Option<f64>,
    pub temperatura_minima: Option<f64>,
    pub temperatura_maxima: Option<f64>,
    pub lecturas_normales: usize,
    pub lecturas_alerta: usize,
    pub lecturas_criticas: usize,
    pub cadena_rota: bool,
    pub tiempo_max_fuera_rango: i32,
}

/// Fails with `NotFound` for an empty reading set.
pub fn location_stats(ubicacion_id: &str, readings: &[Reading]) -> Result<LocationStats, ApiError> {
    // ---
    if readings.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No readings for location {ubicacion_id}"
        )));
    }

    let temperatures: Vec<f64> = readings.iter().filter_map(|r| r.temperatura).collect();
    let (promedio, minima, maxima) = if temperatures.is_empty() {
        (None, None, None)
    } else {
        let sum: f64 = temperatures.iter().sum();
        (
            Some(round2(sum / temperatures.len() as f64)),
            temperatures.iter().copied().reduce(f64::min),
            temperatures.iter().copied().reduce(f64::max),
        )
    };

    let count = |estado: ReadingState| readings.iter().filter(|r| r.estado == estado).count();

    Ok(LocationStats {
        ubicacion_id: ubicacion_id.to_string(),
        total_lecturas: readings.len(),
        temperatura_promedio: promedio,
        temperatura_minima: minima,
        temperatura_maxima: maxima,
        lecturas_normales: count(ReadingState::Normal),
        lecturas_alerta: count(ReadingState::Alerta),
        lecturas_criticas: count(ReadingState::Critico),
        cadena_rota: readings.iter().any(|r| r.cadena_rota),
        tiempo_max_fuera_rango: readings
            .iter()
            .map(|r| r.tiempo_fuera_rango)
            .max()
            .unwrap_or_default(),
    })
}

/// Partition readings by sensor id, keeping input order inside each group.
pub fn group_by_sensor(readings: &[Reading]) -> BTreeMap<String, Vec<Reading>> {
    // ---
    let mut groups: BTreeMap<String, Vec<Reading>> = BTreeMap::new();
    for reading in readings {
        groups
            .entry(reading.sensor_id.clone())
            .or_default()
            .push(reading.clone());
    }
    groups
}

// ---

/// One point of a reconstructed route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingPoint {
    pub timestamp: DateTime<Utc>,
    pub latitud: Option<f64>,
    pub longitud: Option<f64>,
    pub altitud: Option<f64>,
    pub temperatura: Option<f64>,
    pub estado: ReadingState,
}

impl From<&Reading> for TrackingPoint {
    fn from(r: &Reading) -> Self {
        TrackingPoint {
            timestamp: r.timestamp,
            latitud: r.gps.latitud,
            longitud: r.gps.longitud,
            altitud: r.gps.altitud,
            temperatura: r.temperatura,
            estado: r.estado,
        }
    }
}

/// Fails with `NotFound` when the route has no points.
pub fn tracking_points(ubicacion_id: &str, readings: &[Reading]) -> Result<Vec<TrackingPoint>, ApiError> {
    if readings.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No readings for location {ubicacion_id}"
        )));
    }
    Ok(readings.iter().map(TrackingPoint::from).collect())
}

/// Latest known position of a location, for the fleet map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPosition {
    pub ubicacion_id: String,
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub latitud: Option<f64>,
    pub longitud: Option<f64>,
    pub altitud: Option<f64>,
    pub temperatura: Option<f64>,
    pub estado: ReadingState,
    pub alerta_activa: bool,
    pub cadena_rota: bool,
}

impl From<&Reading> for MapPosition {
    fn from(r: &Reading) -> Self {
        MapPosition {
            ubicacion_id: r.ubicacion_id.clone(),
            sensor_id: r.sensor_id.clone(),
            timestamp: r.timestamp,
            latitud: r.gps.latitud,
            longitud: r.gps.longitud,
            altitud: r.gps.altitud,
            temperatura: r.temperatura,
            estado: r.estado,
            alerta_activa: r.alerta_activa,
            cadena_rota: r.cadena_rota,
        }
    }
}

// ---

/// Whole-store counters fetched alongside the dashboard window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetTotals {
    pub vehicles: u64,
    pub active_alerts: u64,
    pub chain_broken: u64,
}

/// Fleet-wide overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub timestamp_consulta: DateTime<Utc>,
    pub total_sensores: usize,
    pub sensores_por_tipo_alimento: BTreeMap<&'static str, usize>,
    pub total_lecturas_24h: usize,
    pub lecturas_por_estado: BTreeMap<&'static str, usize>,
    pub total_vehiculos: u64,
    pub alertas_activas: u64,
    pub cadenas_rotas: u64,
    pub porcentaje_salud: f64,
}

pub fn dashboard_summary(
    sensors: &[Sensor],
    last_24h: &[Reading],
    totals: FleetTotals,
    now: DateTime<Utc>,
) -> DashboardSummary {
    // ---
    let sensores_por_tipo_alimento = FoodCategory::ALL
        .into_iter()
        .map(|t| {
            let n = sensors.iter().filter(|s| s.tipo_alimento == t).count();
            (t.as_str(), n)
        })
        .collect();

    let lecturas_por_estado: BTreeMap<&'static str, usize> = ReadingState::ALL
        .into_iter()
        .map(|e| (e.as_str(), last_24h.iter().filter(|r| r.estado == e).count()))
        .collect();

    let total = last_24h.len();
    let normales = lecturas_por_estado
        .get(ReadingState::Normal.as_str())
        .copied()
        .unwrap_or_default();
    let porcentaje_salud = if total == 0 {
        100.0
    } else {
        round2(normales as f64 / total as f64 * 100.0)
    };

    DashboardSummary {
        timestamp_consulta: now,
        total_sensores: sensors.len(),
        sensores_por_tipo_alimento,
        total_lecturas_24h: total,
        lecturas_por_estado,
        total_vehiculos: totals.vehicles,
        alertas_activas: totals.active_alerts,
        cadenas_rotas: totals.chain_broken,
        porcentaje_salud,
    }
}
