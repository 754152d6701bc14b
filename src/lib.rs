//! Read-only monitoring API for a cold-chain logistics fleet.
//!
//! Layout follows the Explicit Module Boundary Pattern (EMBP): each module
//! owns one concern and exposes a narrow surface.
//! - `filter`  – query parameter resolution (date ranges, limits, filters)
//! - `store`   – read access to sensors, readings and vehicles
//! - `stats`   – reading classification and aggregation
//! - `chain`   – vehicle chain-of-custody state
//! - `routes`  – HTTP gateway
//!
//! The binary in `main.rs` only wires configuration, logging and the store
//! into [`routes::router`].

pub mod chain;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod routes;
pub mod stats;
pub mod store;

pub use config::Config;
pub use error::{ApiError, StoreError};
pub use routes::AppState;
