use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{bounded_count, optional_text, required_text, ModelError};
use crate::utils::validate::{require_v4, sanitize_text, truncate_to_micros};

pub const MAX_DETAIL_LEN: usize = 500;
pub const MAX_NAME_LEN: usize = 64;
pub const MAX_IMAGE_LEN: usize = 255;
pub const MAX_ATTENDEE_LIMIT: i32 = 500;
/// Longest textual form a price may take, e.g. `9999.99`.
pub const MAX_PRICE_CHARS: usize = 7;

const COLUMNS: &str = "id, profile_id, attendee_limit, detail, end_date_time, image, lat, long, \
                       name, price, start_date_time";

/// Raw event columns, as read from a row or assembled from a request.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct EventFields {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub attendee_limit: Option<i32>,
    pub detail: String,
    pub end_date_time: DateTime<Utc>,
    pub image: Option<String>,
    pub lat: f64,
    pub long: f64,
    pub name: String,
    pub price: Decimal,
    pub start_date_time: DateTime<Utc>,
}

/// Something happening somewhere, created by a profile for others to join.
///
/// Start and end are validated independently; an end before the start is
/// accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "eventId")]
    id: Uuid,
    #[serde(rename = "eventProfileId")]
    profile_id: Uuid,
    #[serde(rename = "eventAttendeeLimit")]
    attendee_limit: Option<i32>,
    #[serde(rename = "eventDetail")]
    detail: String,
    #[serde(rename = "eventEndDateTime", with = "chrono::serde::ts_milliseconds")]
    end_date_time: DateTime<Utc>,
    #[serde(rename = "eventImage")]
    image: Option<String>,
    #[serde(rename = "eventLat")]
    lat: f64,
    #[serde(rename = "eventLong")]
    long: f64,
    #[serde(rename = "eventName")]
    name: String,
    #[serde(rename = "eventPrice", with = "rust_decimal::serde::float")]
    price: Decimal,
    #[serde(rename = "eventStartDateTime", with = "chrono::serde::ts_milliseconds")]
    start_date_time: DateTime<Utc>,
}

impl Event {
    pub fn new(fields: EventFields) -> Result<Self, ModelError> {
        Ok(Self {
            id: require_v4(fields.id)?,
            profile_id: require_v4(fields.profile_id)?,
            attendee_limit: validate_attendee_limit(fields.attendee_limit)?,
            detail: validate_detail(&fields.detail)?,
            end_date_time: truncate_to_micros(fields.end_date_time),
            image: validate_image(fields.image.as_deref())?,
            lat: validate_lat(fields.lat)?,
            long: validate_long(fields.long)?,
            name: validate_name(&fields.name)?,
            price: validate_price(fields.price)?,
            start_date_time: truncate_to_micros(fields.start_date_time),
        })
    }

    fn from_row(fields: EventFields) -> Result<Self, ModelError> {
        Self::new(fields).map_err(ModelError::into_row_error)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn profile_id(&self) -> Uuid {
        self.profile_id
    }

    pub fn attendee_limit(&self) -> Option<i32> {
        self.attendee_limit
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn end_date_time(&self) -> DateTime<Utc> {
        self.end_date_time
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn long(&self) -> f64 {
        self.long
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn start_date_time(&self) -> DateTime<Utc> {
        self.start_date_time
    }

    pub fn set_id(&mut self, id: Uuid) -> Result<(), ModelError> {
        self.id = require_v4(id)?;
        Ok(())
    }

    pub fn set_profile_id(&mut self, profile_id: Uuid) -> Result<(), ModelError> {
        self.profile_id = require_v4(profile_id)?;
        Ok(())
    }

    pub fn set_attendee_limit(&mut self, limit: Option<i32>) -> Result<(), ModelError> {
        self.attendee_limit = validate_attendee_limit(limit)?;
        Ok(())
    }

    pub fn set_detail(&mut self, detail: &str) -> Result<(), ModelError> {
        self.detail = validate_detail(detail)?;
        Ok(())
    }

    pub fn set_end_date_time(&mut self, end: DateTime<Utc>) {
        self.end_date_time = truncate_to_micros(end);
    }

    pub fn set_image(&mut self, image: Option<&str>) -> Result<(), ModelError> {
        self.image = validate_image(image)?;
        Ok(())
    }

    pub fn set_lat(&mut self, lat: f64) -> Result<(), ModelError> {
        self.lat = validate_lat(lat)?;
        Ok(())
    }

    pub fn set_long(&mut self, long: f64) -> Result<(), ModelError> {
        self.long = validate_long(long)?;
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), ModelError> {
        self.name = validate_name(name)?;
        Ok(())
    }

    pub fn set_price(&mut self, price: Decimal) -> Result<(), ModelError> {
        self.price = validate_price(price)?;
        Ok(())
    }

    pub fn set_start_date_time(&mut self, start: DateTime<Utc>) {
        self.start_date_time = truncate_to_micros(start);
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query(&format!(
            "INSERT INTO event ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            COLUMNS
        ))
        .bind(self.id)
        .bind(self.profile_id)
        .bind(self.attendee_limit)
        .bind(&self.detail)
        .bind(self.end_date_time)
        .bind(&self.image)
        .bind(self.lat)
        .bind(self.long)
        .bind(&self.name)
        .bind(self.price)
        .bind(self.start_date_time)
        .execute(pool)
        .await?;

        tracing::debug!(event_id = %self.id, "Inserted event");
        Ok(())
    }

    pub async fn update(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query(
            "UPDATE event SET profile_id = $2, attendee_limit = $3, detail = $4, \
             end_date_time = $5, image = $6, lat = $7, long = $8, name = $9, price = $10, \
             start_date_time = $11 WHERE id = $1",
        )
        .bind(self.id)
        .bind(self.profile_id)
        .bind(self.attendee_limit)
        .bind(&self.detail)
        .bind(self.end_date_time)
        .bind(&self.image)
        .bind(self.lat)
        .bind(self.long)
        .bind(&self.name)
        .bind(self.price)
        .bind(self.start_date_time)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query("DELETE FROM event WHERE id = $1")
            .bind(self.id)
            .execute(pool)
            .await?;

        tracing::debug!(event_id = %self.id, "Deleted event");
        Ok(())
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Event>, ModelError> {
        let row: Option<EventFields> =
            sqlx::query_as(&format!("SELECT {} FROM event WHERE id = $1", COLUMNS))
                .bind(id)
                .fetch_optional(pool)
                .await?;
        row.map(Event::from_row).transpose()
    }

    pub async fn get_by_profile_id(
        pool: &PgPool,
        profile_id: Uuid,
    ) -> Result<Vec<Event>, ModelError> {
        let rows: Vec<EventFields> = sqlx::query_as(&format!(
            "SELECT {} FROM event WHERE profile_id = $1 ORDER BY start_date_time",
            COLUMNS
        ))
        .bind(profile_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Event::from_row).collect()
    }

    /// Events starting between `sunrise` and `sunset`, both inclusive.
    pub async fn get_by_start_date_time(
        pool: &PgPool,
        sunrise: DateTime<Utc>,
        sunset: DateTime<Utc>,
    ) -> Result<Vec<Event>, ModelError> {
        let rows: Vec<EventFields> = sqlx::query_as(&format!(
            "SELECT {} FROM event WHERE start_date_time >= $1 AND start_date_time <= $2 \
             ORDER BY start_date_time",
            COLUMNS
        ))
        .bind(truncate_to_micros(sunrise))
        .bind(truncate_to_micros(sunset))
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Event::from_row).collect()
    }

    /// Case-insensitive substring match on the event name.
    pub async fn get_by_name(pool: &PgPool, name: &str) -> Result<Vec<Event>, ModelError> {
        let name = sanitize_text(name);
        if name.is_empty() {
            return Err(ModelError::InvalidArgument(
                "not a valid event name".to_string(),
            ));
        }

        let rows: Vec<EventFields> = sqlx::query_as(&format!(
            "SELECT {} FROM event WHERE name ILIKE $1 ORDER BY start_date_time",
            COLUMNS
        ))
        .bind(format!("%{}%", escape_like(&name)))
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Event::from_row).collect()
    }

    pub async fn get_all(pool: &PgPool) -> Result<Vec<Event>, ModelError> {
        let rows: Vec<EventFields> = sqlx::query_as(&format!(
            "SELECT {} FROM event ORDER BY start_date_time",
            COLUMNS
        ))
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Event::from_row).collect()
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn validate_detail(detail: &str) -> Result<String, ModelError> {
    required_text(detail, "event detail", MAX_DETAIL_LEN)
}

fn validate_name(name: &str) -> Result<String, ModelError> {
    required_text(name, "event name", MAX_NAME_LEN)
}

fn validate_image(image: Option<&str>) -> Result<Option<String>, ModelError> {
    optional_text(image, "event image", MAX_IMAGE_LEN)
}

fn validate_attendee_limit(limit: Option<i32>) -> Result<Option<i32>, ModelError> {
    match limit {
        None | Some(0) => Ok(None),
        Some(value) => bounded_count(value, "event attendee limit", MAX_ATTENDEE_LIMIT).map(Some),
    }
}

fn validate_lat(lat: f64) -> Result<f64, ModelError> {
    if !lat.is_finite() {
        return Err(ModelError::InvalidArgument(
            "latitude is not a number".to_string(),
        ));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ModelError::OutOfRange(
            "latitude is out of range".to_string(),
        ));
    }
    Ok(lat)
}

fn validate_long(long: f64) -> Result<f64, ModelError> {
    if !long.is_finite() {
        return Err(ModelError::InvalidArgument(
            "longitude is not a number".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&long) {
        return Err(ModelError::OutOfRange(
            "longitude is out of range".to_string(),
        ));
    }
    Ok(long)
}

fn validate_price(price: Decimal) -> Result<Decimal, ModelError> {
    if price < Decimal::ZERO {
        return Err(ModelError::OutOfRange(
            "event price cannot be negative".to_string(),
        ));
    }
    let normalized = price.normalize();
    if normalized.to_string().len() > MAX_PRICE_CHARS {
        return Err(ModelError::OutOfRange("event price is too much".to_string()));
    }
    Ok(normalized)
}
