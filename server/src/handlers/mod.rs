use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::utils::error::AppError;
use crate::utils::response::success;
use crate::utils::validate::{parse_date_time, parse_uuid};

pub mod attendance;
pub mod context;
pub mod events;
pub mod profiles;
pub mod ratings;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "crowdvibe-api",
    };

    success(payload, "Health check successful")
}

/// Parses an id taken from a path segment or query string.
pub(crate) fn id_param(value: &str) -> Result<Uuid, AppError> {
    Ok(parse_uuid(value)?)
}

/// Query-string timestamps: epoch milliseconds or `YYYY-MM-DD HH:MM:SS`.
pub(crate) fn date_param(value: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(millis) = value.trim().parse::<i64>() {
        return Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| AppError::ValidationError("timestamp is out of range".to_string()));
    }
    Ok(parse_date_time(value)?)
}

/// Returns the value of a JSON field the request cannot do without.
pub(crate) fn required<T>(value: Option<T>, message: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::ValidationError(message.to_string()))
}
