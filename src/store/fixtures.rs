//! In-memory [`RecordStore`] over JSON fixture files.
//!
//! The fixture directory holds `sensores.json`, `lecturas.json` and
//! `vehiculos.json`, each a JSON array of records in the API shape
//! (camelCase keys). Files are read once; records are kept as raw JSON and
//! decoded on every query, so a corrupt record surfaces as a schema
//! violation on the request that touches it instead of aborting startup.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{RecordStore, StoreResult};
use crate::error::StoreError;
use crate::filter::{ReadingFilter, SensorFilter, TimeOrder};
use crate::models::{Reading, Record, RecordError, Sensor, Vehicle};

// ---

pub struct JsonStore {
    sensors: Vec<Value>,
    readings: Vec<Value>,
    vehicles: Vec<Value>,
}

impl JsonStore {
    pub fn from_values(sensors: Vec<Value>, readings: Vec<Value>, vehicles: Vec<Value>) -> Self {
        Self {
            sensors,
            readings,
            vehicles,
        }
    }

    /// Load the three fixture files from `dir`.
    pub async fn load(dir: &Path) -> StoreResult<Self> {
        // ---
        let sensors = read_array(&dir.join("sensores.json")).await?;
        let readings = read_array(&dir.join("lecturas.json")).await?;
        let vehicles = read_array(&dir.join("vehiculos.json")).await?;

        tracing::info!(
            "Loaded fixtures from {}: {} sensores, {} lecturas, {} vehiculos",
            dir.display(),
            sensors.len(),
            readings.len(),
            vehicles.len()
        );
        Ok(Self::from_values(sensors, readings, vehicles))
    }

    fn all<T>(values: &[Value]) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned + Record,
    {
        values
            .iter()
            .map(|v| decode::<T>(v).map_err(StoreError::from))
            .collect()
    }

    fn by_id<T>(values: &[Value], id: &str) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Record,
    {
        values
            .iter()
            .find(|v| v.get("id").and_then(Value::as_str) == Some(id))
            .map(decode::<T>)
            .transpose()
            .map_err(StoreError::from)
    }

    fn matching_readings(&self, filter: &ReadingFilter) -> StoreResult<Vec<Reading>> {
        // ---
        let mut readings: Vec<Reading> = Self::all::<Reading>(&self.readings)?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();

        readings.sort_by(|a, b| match filter.order {
            TimeOrder::NewestFirst => b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)),
            TimeOrder::OldestFirst => a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)),
        });
        Ok(readings)
    }
}

/// Decode and structurally check one raw record.
fn decode<T>(value: &Value) -> Result<T, RecordError>
where
    T: DeserializeOwned + Record,
{
    // ---
    let record: T = serde_json::from_value(value.clone()).map_err(|e| {
        let id = value.get("id").and_then(Value::as_str).unwrap_or_default();
        RecordError::new(T::ENTITY, id, e.to_string())
    })?;
    record.check()?;
    Ok(record)
}

async fn read_array(path: &Path) -> StoreResult<Vec<Value>> {
    // ---
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;

    // Fixtures exported from spreadsheet tools may carry a UTF-8 BOM
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    match serde_json::from_str(text) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(StoreError::Unavailable(format!(
            "{}: expected a JSON array",
            path.display()
        ))),
        Err(e) => Err(StoreError::Unavailable(format!("{}: {e}", path.display()))),
    }
}

#[async_trait]
impl RecordStore for JsonStore {
    async fn find_sensors(&self, filter: &SensorFilter) -> StoreResult<Vec<Sensor>> {
        // ---
        let mut sensors: Vec<Sensor> = Self::all::<Sensor>(&self.sensors)?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();
        sensors.sort_by(|a, b| a.nombre.cmp(&b.nombre).then_with(|| a.id.cmp(&b.id)));
        Ok(sensors)
    }

    async fn find_sensor(&self, id: &str) -> StoreResult<Option<Sensor>> {
        Self::by_id(&self.sensors, id)
    }

    async fn find_readings(&self, filter: &ReadingFilter) -> StoreResult<Vec<Reading>> {
        // ---
        let mut readings = self.matching_readings(filter)?;
        if let Some(limit) = filter.limit {
            readings.truncate(limit as usize);
        }
        Ok(readings)
    }

    async fn count_readings(&self, filter: &ReadingFilter) -> StoreResult<u64> {
        Ok(self.matching_readings(filter)?.len() as u64)
    }

    async fn latest_reading(&self, sensor_id: &str) -> StoreResult<Option<Reading>> {
        // ---
        let filter = ReadingFilter {
            sensor_id: Some(sensor_id.to_string()),
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.find_readings(&filter).await?.into_iter().next())
    }

    async fn latest_reading_per_location(&self) -> StoreResult<Vec<Reading>> {
        // ---
        let mut latest: BTreeMap<String, Reading> = BTreeMap::new();
        for reading in Self::all::<Reading>(&self.readings)? {
            let newer = latest
                .get(&reading.ubicacion_id)
                .map_or(true, |current| reading.timestamp > current.timestamp);
            if newer {
                latest.insert(reading.ubicacion_id.clone(), reading);
            }
        }
        Ok(latest.into_values().collect())
    }

    async fn find_vehicles(&self) -> StoreResult<Vec<Vehicle>> {
        let mut vehicles = Self::all::<Vehicle>(&self.vehicles)?;
        vehicles.sort_by(|a, b| a.matricula.cmp(&b.matricula).then_with(|| a.id.cmp(&b.id)));
        Ok(vehicles)
    }

    async fn find_vehicle(&self, id: &str) -> StoreResult<Option<Vehicle>> {
        Self::by_id(&self.vehicles, id)
    }

    async fn count_vehicles(&self) -> StoreResult<u64> {
        Ok(self.vehicles.len() as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
