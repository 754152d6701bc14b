//! Vehicle chain-of-custody state.
//!
//! A vehicle's overall state is folded over the latest reading of each of
//! its active sensors, in sensor order. Escalation is monotonic:
//! `normal → alerta → critico → cadena_rota`, and a broken chain is
//! terminal. A vehicle with no active sensors reports `sin_sensores`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiError;
use crate::filter::SensorFilter;
use crate::models::{FoodCategory, Reading, ReadingState, Sensor, Vehicle};
use crate::store::Store;

// ---

/// Overall chain state of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainState {
    Normal,
    Alerta,
    Critico,
    CadenaRota,
    SinSensores,
}

impl ChainState {
    /// Apply one sensor's latest reading to the running state.
    pub fn escalate(self, reading: &Reading) -> ChainState {
        // ---
        if reading.cadena_rota {
            return ChainState::CadenaRota;
        }
        match (reading.estado, self) {
            (_, ChainState::CadenaRota) => ChainState::CadenaRota,
            (ReadingState::Critico, _) => ChainState::Critico,
            (ReadingState::Alerta, ChainState::Normal) => ChainState::Alerta,
            (_, current) => current,
        }
    }
}

/// Latest state of one temperature zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub sensor_id: String,
    pub nombre: String,
    pub tipo_alimento: FoodCategory,
    pub rango_optimo: String,
    pub temperatura_actual: Option<f64>,
    pub estado: ReadingState,
    pub alerta_activa: bool,
    pub tiempo_fuera_rango: i32,
    pub cadena_rota: bool,
    pub ultima_actualizacion: DateTime<Utc>,
}

impl Zone {
    fn new(sensor: &Sensor, reading: &Reading) -> Self {
        Zone {
            sensor_id: sensor.id.clone(),
            nombre: sensor.nombre.clone(),
            tipo_alimento: sensor.tipo_alimento,
            rango_optimo: sensor.optimal_range(),
            temperatura_actual: reading.temperatura,
            estado: reading.estado,
            alerta_activa: reading.alerta_activa,
            tiempo_fuera_rango: reading.tiempo_fuera_rango,
            cadena_rota: reading.cadena_rota,
            ultima_actualizacion: reading.timestamp,
        }
    }
}

/// Chain-of-custody report for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainReport {
    #[serde(rename = "vehiculoId")]
    pub vehiculo_id: String,
    pub matricula: String,
    pub estado_general: ChainState,
    pub total_zonas: usize,
    pub zonas_normal: usize,
    pub zonas_alerta: usize,
    pub zonas_criticas: usize,
    pub cadenas_rotas: usize,
    pub zonas: Vec<Zone>,
}

/// Fold each active sensor's latest reading into a report.
///
/// Sensors that have never reported contribute no zone.
pub fn compose(vehicle: &Vehicle, sensors: &[(Sensor, Option<Reading>)]) -> ChainReport {
    // ---
    let mut state = if sensors.is_empty() {
        ChainState::SinSensores
    } else {
        ChainState::Normal
    };

    let mut zonas = Vec::with_capacity(sensors.len());
    for (sensor, latest) in sensors {
        if let Some(reading) = latest {
            state = state.escalate(reading);
            zonas.push(Zone::new(sensor, reading));
        }
    }

    let count = |estado: ReadingState| zonas.iter().filter(|z| z.estado == estado).count();

    ChainReport {
        vehiculo_id: vehicle.id.clone(),
        matricula: vehicle.matricula.clone(),
        estado_general: state,
        total_zonas: zonas.len(),
        zonas_normal: count(ReadingState::Normal),
        zonas_alerta: count(ReadingState::Alerta),
        zonas_criticas: count(ReadingState::Critico),
        cadenas_rotas: zonas.iter().filter(|z| z.cadena_rota).count(),
        zonas,
    }
}

/// Load a vehicle, its active sensors and their latest readings, then
/// compose the report. Fails with `NotFound` for an unknown vehicle.
pub async fn vehicle_chain_state(store: &Store, vehicle_id: &str) -> Result<ChainReport, ApiError> {
    // ---
    let vehicle = store
        .find_vehicle(vehicle_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Vehicle not found".to_string()))?;

    let sensors = store
        .find_sensors(&SensorFilter::active_in(&vehicle.id))
        .await?;

    let mut joined = Vec::with_capacity(sensors.len());
    for sensor in sensors {
        let latest = store.latest_reading(&sensor.id).await?;
        joined.push((sensor, latest));
    }

    let report = compose(&vehicle, &joined);
    tracing::debug!(
        "vehicle {} chain state {:?} over {} zones",
        vehicle.id,
        report.estado_general,
        report.total_zonas
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::GpsPosition;
    use chrono::TimeZone;

    fn vehicle() -> Vehicle {
        Vehicle {
            id: "V-001".to_string(),
            matricula: "1234-ABC".to_string(),
        }
    }

    fn sensor(id: &str) -> Sensor {
        Sensor {
            id: id.to_string(),
            nombre: format!("Zona {id}"),
            tipo_alimento: FoodCategory::Congelado,
            rango_min: -22.0,
            rango_max: -18.0,
            ubicacion_id: "V-001".to_string(),
            activo: true,
        }
    }

    fn latest(sensor_id: &str, estado: ReadingState, cadena_rota: bool) -> Reading {
        // ---
        Reading {
            id: format!("L-{sensor_id}"),
            sensor_id: sensor_id.to_string(),
            ubicacion_id: "V-001".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 26, 18, 0, 0).unwrap(),
            temperatura: Some(-19.0),
            gps: GpsPosition::default(),
            estado,
            alerta_activa: estado.is_alert(),
            tiempo_fuera_rango: 0,
            cadena_rota,
        }
    }

    #[test]
    fn test_broken_chain_overrides_normal_reading() {
        // ---
        let sensors = vec![(sensor("S1"), Some(latest("S1", ReadingState::Normal, true)))];
        let report = compose(&vehicle(), &sensors);

        assert_eq!(report.estado_general, ChainState::CadenaRota);
        assert_eq!(report.zonas_normal, 1);
        assert_eq!(report.cadenas_rotas, 1);
    }

    #[test]
    fn test_critical_then_alert() {
        // ---
        let sensors = vec![
            (sensor("S1"), Some(latest("S1", ReadingState::Critico, false))),
            (sensor("S2"), Some(latest("S2", ReadingState::Alerta, false))),
        ];
        let report = compose(&vehicle(), &sensors);

        assert_eq!(report.estado_general, ChainState::Critico);
        assert_eq!(report.zonas_normal, 0);
        assert_eq!(report.zonas_alerta, 1);
        assert_eq!(report.zonas_criticas, 1);
        assert_eq!(report.cadenas_rotas, 0);
        assert_eq!(report.total_zonas, 2);
    }

    #[test]
    fn test_broken_chain_is_terminal() {
        // ---
        let sensors = vec![
            (sensor("S1"), Some(latest("S1", ReadingState::Alerta, true))),
            (sensor("S2"), Some(latest("S2", ReadingState::Critico, false))),
            (sensor("S3"), Some(latest("S3", ReadingState::Normal, false))),
        ];
        assert_eq!(
            compose(&vehicle(), &sensors).estado_general,
            ChainState::CadenaRota
        );
    }

    #[test]
    fn test_no_sensors_is_distinct_from_normal() {
        // ---
        let report = compose(&vehicle(), &[]);
        assert_eq!(report.estado_general, ChainState::SinSensores);
        assert!(report.zonas.is_empty());

        let silent = vec![(sensor("S1"), None)];
        let report = compose(&vehicle(), &silent);
        assert_eq!(report.estado_general, ChainState::Normal);
        assert_eq!(report.total_zonas, 0);
    }

    #[test]
    fn test_zone_detail_serialization() {
        // ---
        let sensors = vec![(sensor("S1"), Some(latest("S1", ReadingState::Alerta, false)))];
        let value = serde_json::to_value(compose(&vehicle(), &sensors)).unwrap();

        assert_eq!(value["estado_general"], "alerta");
        assert_eq!(value["vehiculoId"], "V-001");
        let zone = &value["zonas"][0];
        assert_eq!(zone["rangoOptimo"], "-22°C - -18°C");
        assert_eq!(zone["tipoAlimento"], "congelado");
        assert_eq!(zone["ultimaActualizacion"], "2025-03-26T18:00:00Z");
    }

    #[test]
    fn test_sentinel_serialization() {
        assert_eq!(
            serde_json::to_value(ChainState::SinSensores).unwrap(),
            "sin_sensores"
        );
        assert_eq!(
            serde_json::to_value(ChainState::CadenaRota).unwrap(),
            "cadena_rota"
        );
    }
}
