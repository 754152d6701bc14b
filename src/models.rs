//! Domain records for the cold-chain monitor.
//!
//! Every entity has exactly one mapping from its stored row shape (the
//! `*Row` types read by the PostgreSQL adapter) into the domain record, and
//! the domain record serializes directly into the API shape. Field renames,
//! enum decoding and the structural checks live here and nowhere else.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---

/// A stored record that failed decoding or a structural rule.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{entity} '{id}' does not conform to the schema: {reason}")]
pub struct RecordError {
    pub entity: &'static str,
    pub id: String,
    pub reason: String,
}

impl RecordError {
    pub fn new(entity: &'static str, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Structural rules shared by every backend.
pub trait Record {
    /// Entity name used in error reports.
    const ENTITY: &'static str;

    fn id(&self) -> &str;

    /// Returns the first violated rule, if any.
    fn violation(&self) -> Option<String>;

    fn check(&self) -> Result<(), RecordError> {
        // ---
        if self.id().trim().is_empty() {
            return Err(RecordError::new(Self::ENTITY, "", "empty identifier"));
        }
        match self.violation() {
            Some(reason) => Err(RecordError::new(Self::ENTITY, self.id(), reason)),
            None => Ok(()),
        }
    }
}

// ---

/// Food category carried by a sensor's zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodCategory {
    Congelado,
    Refrigerado,
    Delicado,
}

impl FoodCategory {
    pub const ALL: [FoodCategory; 3] = [
        FoodCategory::Congelado,
        FoodCategory::Refrigerado,
        FoodCategory::Delicado,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FoodCategory::Congelado => "congelado",
            FoodCategory::Refrigerado => "refrigerado",
            FoodCategory::Delicado => "delicado",
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FoodCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FoodCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown food category '{s}'"))
    }
}

/// Severity of a reading, ordered `normal < alerta < critico`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingState {
    Normal,
    Alerta,
    Critico,
}

impl ReadingState {
    pub const ALL: [ReadingState; 3] = [
        ReadingState::Normal,
        ReadingState::Alerta,
        ReadingState::Critico,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReadingState::Normal => "normal",
            ReadingState::Alerta => "alerta",
            ReadingState::Critico => "critico",
        }
    }

    /// `alerta` and `critico` both count as alerts.
    pub fn is_alert(self) -> bool {
        self != ReadingState::Normal
    }
}

impl fmt::Display for ReadingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReadingState::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown estado '{s}'"))
    }
}

// ---

/// Temperature sensor installed in a location (usually a vehicle zone).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    // ---
    pub id: String,
    pub nombre: String,
    pub tipo_alimento: FoodCategory,
    pub rango_min: f64,
    pub rango_max: f64,
    pub ubicacion_id: String,
    pub activo: bool,
}

impl Sensor {
    /// Optimal range rendered as `"{min}°C - {max}°C"`.
    pub fn optimal_range(&self) -> String {
        format!("{}°C - {}°C", self.rango_min, self.rango_max)
    }
}

impl Record for Sensor {
    const ENTITY: &'static str = "sensor";

    fn id(&self) -> &str {
        &self.id
    }

    fn violation(&self) -> Option<String> {
        if self.ubicacion_id.trim().is_empty() {
            return Some("empty ubicacionId".into());
        }
        if !(self.rango_min <= self.rango_max) {
            return Some(format!(
                "rangoMin {} is above rangoMax {}",
                self.rango_min, self.rango_max
            ));
        }
        None
    }
}

/// GPS fix attached to a reading. Every coordinate may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsPosition {
    pub latitud: Option<f64>,
    pub longitud: Option<f64>,
    pub altitud: Option<f64>,
}

/// Time-stamped temperature reading.
///
/// `estado`, `alertaActiva`, `tiempoFueraRango` and `cadenaRota` are
/// computed upstream at ingestion time; this service only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    // ---
    pub id: String,
    pub sensor_id: String,
    pub ubicacion_id: String,
    pub timestamp: DateTime<Utc>,
    pub temperatura: Option<f64>,
    #[serde(default)]
    pub gps: GpsPosition,
    pub estado: ReadingState,
    #[serde(default)]
    pub alerta_activa: bool,
    /// Minutes spent outside the sensor's optimal range.
    #[serde(default)]
    pub tiempo_fuera_rango: i32,
    #[serde(default)]
    pub cadena_rota: bool,
}

impl Record for Reading {
    const ENTITY: &'static str = "lectura";

    fn id(&self) -> &str {
        &self.id
    }

    fn violation(&self) -> Option<String> {
        if self.sensor_id.trim().is_empty() {
            return Some("empty sensorId".into());
        }
        if self.ubicacion_id.trim().is_empty() {
            return Some("empty ubicacionId".into());
        }
        if let Some(lat) = self.gps.latitud {
            if !(-90.0..=90.0).contains(&lat) {
                return Some(format!("latitud {lat} out of range"));
            }
        }
        if let Some(lon) = self.gps.longitud {
            if !(-180.0..=180.0).contains(&lon) {
                return Some(format!("longitud {lon} out of range"));
            }
        }
        if self.tiempo_fuera_rango < 0 {
            return Some("negative tiempoFueraRango".into());
        }
        None
    }
}

/// Refrigerated vehicle. Its sensors are those whose `ubicacionId` is the
/// vehicle id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub matricula: String,
}

impl Record for Vehicle {
    const ENTITY: &'static str = "vehiculo";

    fn id(&self) -> &str {
        &self.id
    }

    fn violation(&self) -> Option<String> {
        self.matricula
            .trim()
            .is_empty()
            .then(|| "empty matricula".to_string())
    }
}

// ---

/// `sensores` row as stored in PostgreSQL.
#[derive(Debug, sqlx::FromRow)]
pub struct SensorRow {
    pub id: String,
    pub nombre: String,
    pub tipo_alimento: String,
    pub rango_min: f64,
    pub rango_max: f64,
    pub ubicacion_id: String,
    pub activo: bool,
}

/// `lecturas` row as stored in PostgreSQL.
#[derive(Debug, sqlx::FromRow)]
pub struct ReadingRow {
    pub id: String,
    pub sensor_id: String,
    pub ubicacion_id: String,
    pub timestamp: DateTime<Utc>,
    pub temperatura: Option<f64>,
    pub latitud: Option<f64>,
    pub longitud: Option<f64>,
    pub altitud: Option<f64>,
    pub estado: String,
    pub alerta_activa: bool,
    pub tiempo_fuera_rango: i32,
    pub cadena_rota: bool,
}

/// `vehiculos` row as stored in PostgreSQL.
#[derive(Debug, sqlx::FromRow)]
pub struct VehicleRow {
    pub id: String,
    pub matricula: String,
}

impl TryFrom<SensorRow> for Sensor {
    type Error = RecordError;

    fn try_from(row: SensorRow) -> Result<Self, Self::Error> {
        // ---
        let tipo_alimento = row
            .tipo_alimento
            .parse()
            .map_err(|reason| RecordError::new(Sensor::ENTITY, &row.id, reason))?;

        let sensor = Sensor {
            id: row.id,
            nombre: row.nombre,
            tipo_alimento,
            rango_min: row.rango_min,
            rango_max: row.rango_max,
            ubicacion_id: row.ubicacion_id,
            activo: row.activo,
        };
        sensor.check()?;
        Ok(sensor)
    }
}

impl TryFrom<ReadingRow> for Reading {
    type Error = RecordError;

    fn try_from(row: ReadingRow) -> Result<Self, Self::Error> {
        // ---
        let estado = row
            .estado
            .parse()
            .map_err(|reason| RecordError::new(Reading::ENTITY, &row.id, reason))?;

        let reading = Reading {
            id: row.id,
            sensor_id: row.sensor_id,
            ubicacion_id: row.ubicacion_id,
            timestamp: row.timestamp,
            temperatura: row.temperatura,
            gps: GpsPosition {
                latitud: row.latitud,
                longitud: row.longitud,
                altitud: row.altitud,
            },
            estado,
            alerta_activa: row.alerta_activa,
            tiempo_fuera_rango: row.tiempo_fuera_rango,
            cadena_rota: row.cadena_rota,
        };
        reading.check()?;
        Ok(reading)
    }
}

impl TryFrom<VehicleRow> for Vehicle {
    type Error = RecordError;

    fn try_from(row: VehicleRow) -> Result<Self, Self::Error> {
        let vehicle = Vehicle {
            id: row.id,
            matricula: row.matricula,
        };
        vehicle.check()?;
        Ok(vehicle)
    }
}
