//! Read-only access to sensors, readings and vehicles.
//!
//! [`RecordStore`] is the seam between the query layer and the backing
//! store. Two implementations exist: [`PgStore`] over a PostgreSQL pool and
//! [`JsonStore`] over fixture files held in memory. Handlers never see
//! either directly; they go through [`Store`], which bounds every call by
//! the configured timeout.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::filter::{ReadingFilter, SensorFilter};
use crate::models::{Reading, Sensor, Vehicle};

mod fixtures;
mod postgres;
mod schema;

pub use fixtures::JsonStore;
pub use postgres::PgStore;
pub use schema::create_schema;

// ---

pub type StoreResult<T> = Result<T, StoreError>;

/// Read operations required by the monitor. Implementations must be safe
/// to call from many concurrent requests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Sensors matching `filter`, ordered by name.
    async fn find_sensors(&self, filter: &SensorFilter) -> StoreResult<Vec<Sensor>>;

    async fn find_sensor(&self, id: &str) -> StoreResult<Option<Sensor>>;

    /// Readings matching `filter`, in `filter.order`, at most `filter.limit`.
    async fn find_readings(&self, filter: &ReadingFilter) -> StoreResult<Vec<Reading>>;

    /// Number of readings matching `filter`, ignoring its limit.
    async fn count_readings(&self, filter: &ReadingFilter) -> StoreResult<u64>;

    /// Most recent reading of one sensor.
    async fn latest_reading(&self, sensor_id: &str) -> StoreResult<Option<Reading>>;

    /// One reading per distinct location: the one with the greatest timestamp.
    async fn latest_reading_per_location(&self) -> StoreResult<Vec<Reading>>;

    /// Vehicles ordered by `matricula`.
    async fn find_vehicles(&self) -> StoreResult<Vec<Vehicle>>;

    async fn find_vehicle(&self, id: &str) -> StoreResult<Option<Vehicle>>;

    async fn count_vehicles(&self) -> StoreResult<u64>;

    /// Reachability probe.
    async fn ping(&self) -> StoreResult<()>;
}

/// Shared handle to the configured store. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    inner: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl Store {
    pub fn new(inner: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        // ---
        let timeout_ms = self.timeout.as_millis() as u64;
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Err(StoreError::Timeout { .. })) | Err(_) => {
                tracing::warn!("store call exceeded {}ms", timeout_ms);
                Err(StoreError::Timeout { timeout_ms })
            }
            Ok(result) => result,
        }
    }

    pub async fn find_sensors(&self, filter: &SensorFilter) -> StoreResult<Vec<Sensor>> {
        self.bounded(self.inner.find_sensors(filter)).await
    }

    pub async fn find_sensor(&self, id: &str) -> StoreResult<Option<Sensor>> {
        self.bounded(self.inner.find_sensor(id)).await
    }

    pub async fn find_readings(&self, filter: &ReadingFilter) -> StoreResult<Vec<Reading>> {
        self.bounded(self.inner.find_readings(filter)).await
    }

    pub async fn count_readings(&self, filter: &ReadingFilter) -> StoreResult<u64> {
        self.bounded(self.inner.count_readings(filter)).await
    }

    pub async fn latest_reading(&self, sensor_id: &str) -> StoreResult<Option<Reading>> {
        self.bounded(self.inner.latest_reading(sensor_id)).await
    }

    pub async fn latest_reading_per_location(&self) -> StoreResult<Vec<Reading>> {
        self.bounded(self.inner.latest_reading_per_location()).await
    }

    pub async fn find_vehicles(&self) -> StoreResult<Vec<Vehicle>> {
        self.bounded(self.inner.find_vehicles()).await
    }

    pub async fn find_vehicle(&self, id: &str) -> StoreResult<Option<Vehicle>> {
        self.bounded(self.inner.find_vehicle(id)).await
    }

    pub async fn count_vehicles(&self) -> StoreResult<u64> {
        self.bounded(self.inner.count_vehicles()).await
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.bounded(self.inner.ping()).await
    }
}
