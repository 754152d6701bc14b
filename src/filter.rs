//! Query parameter resolution.
//!
//! Raw query strings are turned into validated filter descriptors before any
//! store call is made. Every value arrives as an optional string so that a
//! malformed value surfaces as a typed [`ApiError`] instead of an extractor
//! rejection.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::{FoodCategory, Reading, ReadingState, Sensor};

// ---

/// Bounds and default for a `limit` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    pub default: u32,
    pub max: u32,
}

/// `GET /lecturas`
pub const READINGS_LIMIT: LimitPolicy = LimitPolicy {
    default: 100,
    max: 1000,
};

/// `GET /lecturas/tracking/{ubicacionId}`
pub const TRACKING_LIMIT: LimitPolicy = LimitPolicy {
    default: 50,
    max: 500,
};

impl LimitPolicy {
    /// Out-of-range values are rejected, not clamped.
    pub fn resolve(&self, raw: Option<&str>) -> Result<u32, ApiError> {
        // ---
        let Some(raw) = raw else {
            return Ok(self.default);
        };
        let invalid = || ApiError::InvalidLimit {
            value: raw.to_string(),
            min: 1,
            max: self.max,
        };
        let limit: u32 = raw.trim().parse().map_err(|_| invalid())?;
        if limit == 0 || limit > self.max {
            return Err(invalid());
        }
        Ok(limit)
    }
}

/// Result ordering by reading timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Inclusive timestamp window. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Parse both bounds and enforce `from <= to`.
    pub fn resolve(from: Option<&str>, to: Option<&str>) -> Result<Self, ApiError> {
        // ---
        let from = from.map(|raw| parse_timestamp("from", raw)).transpose()?;
        let to = to.map(|raw| parse_timestamp("to", raw)).transpose()?;

        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ApiError::InvalidDateRange);
            }
        }
        Ok(DateRange { from, to })
    }

    /// Window covering the `hours` preceding `now`.
    pub fn trailing_hours(now: DateTime<Utc>, hours: i64) -> Self {
        DateRange {
            from: Some(now - chrono::Duration::hours(hours)),
            to: None,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

/// Parse an ISO 8601 timestamp.
///
/// Accepts RFC 3339 with offset, a naive date-time (taken as UTC) or a bare
/// date (midnight UTC).
pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    // ---
    let value = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(ApiError::InvalidDateFormat {
        field,
        value: raw.to_string(),
    })
}

fn parse_param<T, E>(name: &'static str, raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr<Err = E>,
{
    raw.map(|value| {
        value.parse().map_err(|_| ApiError::InvalidParameter {
            name,
            value: value.to_string(),
        })
    })
    .transpose()
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no` and
/// `on/off` in any letter case.
fn parse_flag(name: &'static str, raw: Option<&str>) -> Result<Option<bool>, ApiError> {
    // ---
    raw.map(|value| match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ApiError::InvalidParameter {
            name,
            value: value.to_string(),
        }),
    })
    .transpose()
}

// ---

/// Validated reading query. All present conditions combine with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingFilter {
    pub sensor_id: Option<String>,
    pub ubicacion_id: Option<String>,
    pub estado: Option<ReadingState>,
    pub cadena_rota: Option<bool>,
    pub alerta_activa: Option<bool>,
    pub range: DateRange,
    pub order: TimeOrder,
    /// `None` returns every match.
    pub limit: Option<u32>,
}

impl ReadingFilter {
    pub fn matches(&self, reading: &Reading) -> bool {
        // ---
        self.sensor_id.as_ref().map_or(true, |id| &reading.sensor_id == id)
            && self
                .ubicacion_id
                .as_ref()
                .map_or(true, |id| &reading.ubicacion_id == id)
            && self.estado.map_or(true, |e| reading.estado == e)
            && self.cadena_rota.map_or(true, |c| reading.cadena_rota == c)
            && self.alerta_activa.map_or(true, |a| reading.alerta_activa == a)
            && self.range.contains(reading.timestamp)
    }

    /// `GET /lecturas/alertas`
    pub fn active_alerts() -> Self {
        ReadingFilter {
            alerta_activa: Some(true),
            ..Default::default()
        }
    }

    /// `GET /lecturas/cadena-rota`
    pub fn chain_broken() -> Self {
        ReadingFilter {
            cadena_rota: Some(true),
            ..Default::default()
        }
    }

    /// Every reading of one location, newest first.
    pub fn location(ubicacion_id: &str) -> Self {
        ReadingFilter {
            ubicacion_id: Some(ubicacion_id.to_string()),
            ..Default::default()
        }
    }

    /// Readings of the trailing window ending at `now`.
    pub fn trailing_hours(now: DateTime<Utc>, hours: i64) -> Self {
        ReadingFilter {
            range: DateRange::trailing_hours(now, hours),
            ..Default::default()
        }
    }
}

/// Validated sensor query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorFilter {
    pub ubicacion_id: Option<String>,
    pub tipo_alimento: Option<FoodCategory>,
    pub only_active: bool,
}

impl SensorFilter {
    pub fn matches(&self, sensor: &Sensor) -> bool {
        (!self.only_active || sensor.activo)
            && self
                .ubicacion_id
                .as_ref()
                .map_or(true, |id| &sensor.ubicacion_id == id)
            && self.tipo_alimento.map_or(true, |t| sensor.tipo_alimento == t)
    }

    /// Active sensors mounted in one location.
    pub fn active_in(ubicacion_id: &str) -> Self {
        SensorFilter {
            ubicacion_id: Some(ubicacion_id.to_string()),
            tipo_alimento: None,
            only_active: true,
        }
    }
}

// ---

/// Raw parameters of `GET /lecturas`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingsQuery {
    pub sensor_id: Option<String>,
    pub ubicacion_id: Option<String>,
    pub estado: Option<String>,
    pub cadena_rota: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<String>,
}

impl ReadingsQuery {
    pub fn resolve(&self) -> Result<ReadingFilter, ApiError> {
        // ---
        let range = DateRange::resolve(blank(&self.from), blank(&self.to))?;
        let limit = READINGS_LIMIT.resolve(self.limit.as_deref())?;

        Ok(ReadingFilter {
            sensor_id: non_empty(&self.sensor_id),
            ubicacion_id: non_empty(&self.ubicacion_id),
            estado: parse_param("estado", self.estado.as_deref())?,
            cadena_rota: parse_flag("cadenaRota", self.cadena_rota.as_deref())?,
            alerta_activa: None,
            range,
            order: TimeOrder::NewestFirst,
            limit: Some(limit),
        })
    }
}

/// Raw parameters of `GET /lecturas/tracking/{ubicacionId}`.
#[derive(Debug, Default, Deserialize)]
pub struct TrackingQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<String>,
}

impl TrackingQuery {
    pub fn resolve(&self, ubicacion_id: &str) -> Result<ReadingFilter, ApiError> {
        // ---
        let range = DateRange::resolve(blank(&self.from), blank(&self.to))?;
        let limit = TRACKING_LIMIT.resolve(self.limit.as_deref())?;

        Ok(ReadingFilter {
            ubicacion_id: Some(ubicacion_id.to_string()),
            range,
            order: TimeOrder::OldestFirst,
            limit: Some(limit),
            ..Default::default()
        })
    }
}

/// Raw parameters of `GET /sensores`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorsQuery {
    pub ubicacion_id: Option<String>,
    pub tipo_alimento: Option<String>,
}

impl SensorsQuery {
    pub fn resolve(&self) -> Result<SensorFilter, ApiError> {
        Ok(SensorFilter {
            ubicacion_id: non_empty(&self.ubicacion_id),
            tipo_alimento: parse_param("tipoAlimento", self.tipo_alimento.as_deref())?,
            only_active: true,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    blank(value).map(str::to_string)
}

/// Treat an empty parameter (`?from=`) as absent.
fn blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
