//! Database schema for the PostgreSQL store.
//!
//! Ensures the tables and indexes the monitor reads from exist before
//! serving requests. Applied once on startup from `main.rs` when
//! `DB_APPLY_SCHEMA` is enabled. The monitor itself never writes rows;
//! ingestion fills these tables.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the schema if missing (idempotent).
///
/// Safe to call on every startup; a no-op when the objects already exist.
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vehiculos (
            id        TEXT PRIMARY KEY,
            matricula TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // ubicacion_id names a vehicle or a fixed site: no foreign key
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensores (
            id            TEXT PRIMARY KEY,
            nombre        TEXT             NOT NULL,
            tipo_alimento TEXT             NOT NULL,
            rango_min     DOUBLE PRECISION NOT NULL,
            rango_max     DOUBLE PRECISION NOT NULL,
            ubicacion_id  TEXT             NOT NULL,
            activo        BOOLEAN          NOT NULL DEFAULT TRUE
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lecturas (
            id                 TEXT PRIMARY KEY,
            sensor_id          TEXT             NOT NULL REFERENCES sensores (id),
            ubicacion_id       TEXT             NOT NULL,
            timestamp          TIMESTAMPTZ      NOT NULL,
            temperatura        DOUBLE PRECISION,
            latitud            DOUBLE PRECISION,
            longitud           DOUBLE PRECISION,
            altitud            DOUBLE PRECISION,
            estado             TEXT             NOT NULL,
            alerta_activa      BOOLEAN          NOT NULL DEFAULT FALSE,
            tiempo_fuera_rango INTEGER          NOT NULL DEFAULT 0,
            cadena_rota        BOOLEAN          NOT NULL DEFAULT FALSE
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Range scans per sensor and per location, newest first
    for ddl in [
        "CREATE INDEX IF NOT EXISTS idx_lecturas_sensor_ts
            ON lecturas (sensor_id, timestamp DESC)",
        "CREATE INDEX IF NOT EXISTS idx_lecturas_ubicacion_ts
            ON lecturas (ubicacion_id, timestamp DESC)",
        "CREATE INDEX IF NOT EXISTS idx_lecturas_ts
            ON lecturas (timestamp DESC)",
        "CREATE INDEX IF NOT EXISTS idx_sensores_ubicacion
            ON sensores (ubicacion_id)",
    ] {
        sqlx::query(ddl).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    tracing::info!("Database schema verified");
    Ok(())
}
