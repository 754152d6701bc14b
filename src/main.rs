//! Application entry point for the `coldchain-monitor` service.
//!
//! This binary orchestrates the startup sequence for the monitoring API:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Building the record store (PostgreSQL pool or JSON fixtures)
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving until Ctrl-C
//!
//! # Environment Variables
//! - `STORE_BACKEND` (optional) – `postgres` (default) or `json`
//! - `DATABASE_URL` (**required** for postgres) – PostgreSQL connection string
//! - `DB_POOL_MAX` (optional) – maximum number of DB connections (default: 5)
//! - `COLDCHAIN_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `COLDCHAIN_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the full list.
use std::{env, io::IsTerminal, sync::Arc};

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use coldchain_monitor::config::{self, StoreBackend};
use coldchain_monitor::store::{self, JsonStore, PgStore, RecordStore, Store};
use coldchain_monitor::{routes, AppState, Config};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let backend = build_store(&cfg).await?;
    let state = AppState {
        store: Store::new(backend, cfg.store_timeout),
        config: Arc::new(cfg.clone()),
    };

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(state);

    tracing::info!("Listening on {}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Construct the configured store backend.
///
/// The pool (or fixture set) is created here and owned by the returned
/// store for the lifetime of the process.
async fn build_store(cfg: &Config) -> Result<Arc<dyn RecordStore>> {
    // ---
    match &cfg.backend {
        StoreBackend::Postgres {
            db_url,
            apply_schema,
        } => {
            tracing::info!("Connecting to PostgreSQL (pool max {})", cfg.db_pool_max);

            let pool = PgPoolOptions::new()
                .max_connections(cfg.db_pool_max)
                .acquire_timeout(cfg.store_timeout)
                .connect(db_url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

            tracing::info!("Successfully connected to database");

            if *apply_schema {
                store::create_schema(&pool).await?;
            }
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Json { dir } => {
            let fixtures = JsonStore::load(dir)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to load fixtures: {}", e))?;
            Ok(Arc::new(fixtures))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `COLDCHAIN_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, else `COLDCHAIN_LOG_LEVEL`
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("COLDCHAIN_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("COLDCHAIN_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,tower_http=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
