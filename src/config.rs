//! Configuration loader for the `coldchain-monitor` service.
//!
//! This module centralizes all runtime configuration values and their
//! defaults, loading from environment variables (with optional `.env` file
//! support provided by the caller). Values are read through a lookup
//! function so the parsing rules can be exercised without touching the
//! process environment.
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{anyhow, bail, Result};

/// Parse an optional numeric variable with a default value.
macro_rules! parse_var {
    ($lookup:expr, $ty:ty, $var_name:expr, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string variable.
macro_rules! require_var {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name)
            .ok_or_else(|| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Which backing store serves the records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL, reached through a bounded pool.
    Postgres { db_url: String, apply_schema: bool },
    /// JSON fixture files loaded into memory.
    Json { dir: PathBuf },
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent
/// configuration snapshot for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    pub backend: StoreBackend,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Upper bound for any single store call.
    pub store_timeout: Duration,

    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string (postgres backend only)
///
/// Optional:
/// - `STORE_BACKEND` – `postgres` or `json` (default: postgres)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `DB_APPLY_SCHEMA` – create missing tables on startup (default: true)
/// - `FIXTURES_DIR` – fixture directory for the json backend (default: `data`)
/// - `STORE_TIMEOUT_MS` – per-call store timeout (default: 5000)
/// - `BIND_ADDR` / `PORT` – listen address (default: 0.0.0.0:8001)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    load_from(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let backend = match lookup("STORE_BACKEND").as_deref().map(str::trim) {
        None | Some("") | Some("postgres") => StoreBackend::Postgres {
            db_url: require_var!(lookup, "DATABASE_URL"),
            apply_schema: parse_var!(lookup, bool, "DB_APPLY_SCHEMA", true),
        },
        Some("json") => StoreBackend::Json {
            dir: lookup("FIXTURES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
        },
        Some(other) => bail!("Invalid STORE_BACKEND: '{other}' (expected postgres or json)"),
    };

    let db_pool_max = parse_var!(lookup, u32, "DB_POOL_MAX", 5);
    if db_pool_max == 0 {
        bail!("Invalid DB_POOL_MAX: must be at least 1");
    }

    let timeout_ms = parse_var!(lookup, u64, "STORE_TIMEOUT_MS", 5000);
    if timeout_ms == 0 {
        bail!("Invalid STORE_TIMEOUT_MS: must be at least 1");
    }

    let host = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
    let port = parse_var!(lookup, u16, "PORT", 8001);
    let bind_addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| anyhow!("Invalid BIND_ADDR/PORT '{host}:{port}': {e}"))?;

    Ok(Config {
        backend,
        db_pool_max,
        store_timeout: Duration::from_millis(timeout_ms),
        bind_addr,
    })
}

/// Hide the password component of a connection string.
fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // scheme separator "postgres://" is not a password
            if !db_url[colon_pos..].starts_with("://") {
                return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
            }
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password while showing every other value.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        match &self.backend {
            StoreBackend::Postgres {
                db_url,
                apply_schema,
            } => {
                tracing::info!("  STORE_BACKEND    : postgres");
                tracing::info!("  DATABASE_URL     : {}", mask_db_url(db_url));
                tracing::info!("  DB_APPLY_SCHEMA  : {}", apply_schema);
                tracing::info!("  DB_POOL_MAX      : {}", self.db_pool_max);
            }
            StoreBackend::Json { dir } => {
                tracing::info!("  STORE_BACKEND    : json");
                tracing::info!("  FIXTURES_DIR     : {}", dir.display());
            }
        }
        tracing::info!("  STORE_TIMEOUT_MS : {}", self.store_timeout.as_millis());
        tracing::info!("  BIND_ADDR        : {}", self.bind_addr);
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            StoreBackend::Postgres { .. } => "postgres",
            StoreBackend::Json { .. } => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_from(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_postgres_defaults() {
        // ---
        let cfg = load(&[("DATABASE_URL", "postgres://u:p@localhost/freshgo")]).unwrap();

        assert_eq!(
            cfg.backend,
            StoreBackend::Postgres {
                db_url: "postgres://u:p@localhost/freshgo".to_string(),
                apply_schema: true,
            }
        );
        assert_eq!(cfg.db_pool_max, 5);
        assert_eq!(cfg.store_timeout, Duration::from_millis(5000));
        assert_eq!(cfg.bind_addr.port(), 8001);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_json_backend_and_overrides() {
        // ---
        let cfg = load(&[
            ("STORE_BACKEND", "json"),
            ("FIXTURES_DIR", "/srv/fixtures"),
            ("STORE_TIMEOUT_MS", "250"),
            ("BIND_ADDR", "127.0.0.1"),
            ("PORT", "9000"),
        ])
        .unwrap();

        assert_eq!(
            cfg.backend,
            StoreBackend::Json {
                dir: PathBuf::from("/srv/fixtures")
            }
        );
        assert_eq!(cfg.store_timeout, Duration::from_millis(250));
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.backend_name(), "json");
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        // ---
        let err = load(&[("STORE_BACKEND", "json"), ("DB_POOL_MAX", "many")]).unwrap_err();
        assert!(err.to_string().contains("DB_POOL_MAX"));

        let err = load(&[("STORE_BACKEND", "mongo")]).unwrap_err();
        assert!(err.to_string().contains("STORE_BACKEND"));

        let err = load(&[("STORE_BACKEND", "json"), ("STORE_TIMEOUT_MS", "0")]).unwrap_err();
        assert!(err.to_string().contains("STORE_TIMEOUT_MS"));
    }

    #[test]
    fn test_password_is_masked() {
        // ---
        assert_eq!(
            mask_db_url("postgres://monitor:s3cret@db:5432/freshgo"),
            "postgres://monitor:****@db:5432/freshgo"
        );
        assert_eq!(
            mask_db_url("postgres://monitor@db/freshgo"),
            "postgres://monitor@db/freshgo"
        );
    }
}
