//! PostgreSQL-backed [`RecordStore`].

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{RecordStore, StoreResult};
use crate::error::StoreError;
use crate::filter::{ReadingFilter, SensorFilter, TimeOrder};
use crate::models::{Reading, ReadingRow, Sensor, SensorRow, Vehicle, VehicleRow};

// ---

const SENSOR_COLUMNS: &str =
    "SELECT id, nombre, tipo_alimento, rango_min, rango_max, ubicacion_id, activo FROM sensores";

const READING_COLUMNS: &str = "id, sensor_id, ubicacion_id, timestamp, temperatura, \
     latitud, longitud, altitud, estado, alerta_activa, tiempo_fuera_rango, cadena_rota";

/// Store over a shared connection pool. The pool is built and sized by the
/// caller; this type only borrows connections per query.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the `WHERE` conditions of a reading filter.
fn push_reading_conditions<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a ReadingFilter) {
    // ---
    qb.push(" WHERE TRUE");
    if let Some(sensor_id) = &filter.sensor_id {
        qb.push(" AND sensor_id = ").push_bind(sensor_id.as_str());
    }
    if let Some(ubicacion_id) = &filter.ubicacion_id {
        qb.push(" AND ubicacion_id = ").push_bind(ubicacion_id.as_str());
    }
    if let Some(estado) = filter.estado {
        qb.push(" AND estado = ").push_bind(estado.as_str());
    }
    if let Some(cadena_rota) = filter.cadena_rota {
        qb.push(" AND cadena_rota = ").push_bind(cadena_rota);
    }
    if let Some(alerta_activa) = filter.alerta_activa {
        qb.push(" AND alerta_activa = ").push_bind(alerta_activa);
    }
    if let Some(from) = filter.range.from {
        qb.push(" AND timestamp >= ").push_bind(from);
    }
    if let Some(to) = filter.range.to {
        qb.push(" AND timestamp <= ").push_bind(to);
    }
}

fn into_records<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = crate::models::RecordError>,
{
    rows.into_iter()
        .map(|row| T::try_from(row).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find_sensors(&self, filter: &SensorFilter) -> StoreResult<Vec<Sensor>> {
        // ---
        let mut qb = QueryBuilder::<Postgres>::new(SENSOR_COLUMNS);
        qb.push(" WHERE TRUE");
        if filter.only_active {
            qb.push(" AND activo = TRUE");
        }
        if let Some(ubicacion_id) = &filter.ubicacion_id {
            qb.push(" AND ubicacion_id = ").push_bind(ubicacion_id.as_str());
        }
        if let Some(tipo) = filter.tipo_alimento {
            qb.push(" AND tipo_alimento = ").push_bind(tipo.as_str());
        }
        qb.push(" ORDER BY nombre, id");

        let rows: Vec<SensorRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        into_records(rows)
    }

    async fn find_sensor(&self, id: &str) -> StoreResult<Option<Sensor>> {
        // ---
        let sql = format!("{SENSOR_COLUMNS} WHERE id = $1");
        let row: Option<SensorRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Sensor::try_from).transpose()?)
    }

    async fn find_readings(&self, filter: &ReadingFilter) -> StoreResult<Vec<Reading>> {
        // ---
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {READING_COLUMNS} FROM lecturas"));
        push_reading_conditions(&mut qb, filter);
        qb.push(match filter.order {
            TimeOrder::NewestFirst => " ORDER BY timestamp DESC, id",
            TimeOrder::OldestFirst => " ORDER BY timestamp ASC, id",
        });
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        tracing::debug!("find_readings: {}", qb.sql());
        let rows: Vec<ReadingRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        into_records(rows)
    }

    async fn count_readings(&self, filter: &ReadingFilter) -> StoreResult<u64> {
        // ---
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM lecturas");
        push_reading_conditions(&mut qb, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn latest_reading(&self, sensor_id: &str) -> StoreResult<Option<Reading>> {
        // ---
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM lecturas WHERE sensor_id = $1 \
             ORDER BY timestamp DESC LIMIT 1"
        );
        let row: Option<ReadingRow> = sqlx::query_as(&sql)
            .bind(sensor_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Reading::try_from).transpose()?)
    }

    async fn latest_reading_per_location(&self) -> StoreResult<Vec<Reading>> {
        // ---
        let sql = format!(
            "SELECT DISTINCT ON (ubicacion_id) {READING_COLUMNS} FROM lecturas \
             ORDER BY ubicacion_id, timestamp DESC"
        );
        let rows: Vec<ReadingRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        into_records(rows)
    }

    async fn find_vehicles(&self) -> StoreResult<Vec<Vehicle>> {
        let rows: Vec<VehicleRow> =
            sqlx::query_as("SELECT id, matricula FROM vehiculos ORDER BY matricula, id")
                .fetch_all(&self.pool)
                .await?;
        into_records(rows)
    }

    async fn find_vehicle(&self, id: &str) -> StoreResult<Option<Vehicle>> {
        let row: Option<VehicleRow> =
            sqlx::query_as("SELECT id, matricula FROM vehiculos WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Vehicle::try_from).transpose()?)
    }

    async fn count_vehicles(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vehiculos")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
