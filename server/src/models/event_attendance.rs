use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{bounded_count, ModelError};
use crate::utils::validate::require_v4;

pub const MAX_NUMBER_ATTENDING: i32 = 500;

const COLUMNS: &str = "id, event_id, profile_id, check_in, number_attending";

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct EventAttendanceFields {
    pub id: Uuid,
    pub event_id: Uuid,
    pub profile_id: Uuid,
    pub check_in: bool,
    pub number_attending: i32,
}

/// A profile's intent to attend an event, optionally for a group.
///
/// `check_in` flips once the profile shows up; only checked-in attendees are
/// allowed to rate others at that event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventAttendance {
    #[serde(rename = "eventAttendanceId")]
    id: Uuid,
    #[serde(rename = "eventAttendanceEventId")]
    event_id: Uuid,
    #[serde(rename = "eventAttendanceProfileId")]
    profile_id: Uuid,
    #[serde(rename = "eventAttendanceCheckIn")]
    check_in: bool,
    #[serde(rename = "eventAttendanceNumberAttending")]
    number_attending: i32,
}

impl EventAttendance {
    pub fn new(fields: EventAttendanceFields) -> Result<Self, ModelError> {
        Ok(Self {
            id: require_v4(fields.id)?,
            event_id: require_v4(fields.event_id)?,
            profile_id: require_v4(fields.profile_id)?,
            check_in: fields.check_in,
            number_attending: validate_number_attending(fields.number_attending)?,
        })
    }

    fn from_row(fields: EventAttendanceFields) -> Result<Self, ModelError> {
        Self::new(fields).map_err(ModelError::into_row_error)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn profile_id(&self) -> Uuid {
        self.profile_id
    }

    pub fn check_in(&self) -> bool {
        self.check_in
    }

    pub fn number_attending(&self) -> i32 {
        self.number_attending
    }

    pub fn set_event_id(&mut self, event_id: Uuid) -> Result<(), ModelError> {
        self.event_id = require_v4(event_id)?;
        Ok(())
    }

    pub fn set_profile_id(&mut self, profile_id: Uuid) -> Result<(), ModelError> {
        self.profile_id = require_v4(profile_id)?;
        Ok(())
    }

    pub fn set_check_in(&mut self, check_in: bool) {
        self.check_in = check_in;
    }

    pub fn set_number_attending(&mut self, number_attending: i32) -> Result<(), ModelError> {
        self.number_attending = validate_number_attending(number_attending)?;
        Ok(())
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query(&format!(
            "INSERT INTO event_attendance ({}) VALUES ($1, $2, $3, $4, $5)",
            COLUMNS
        ))
        .bind(self.id)
        .bind(self.event_id)
        .bind(self.profile_id)
        .bind(self.check_in)
        .bind(self.number_attending)
        .execute(pool)
        .await?;

        tracing::debug!(
            event_attendance_id = %self.id,
            event_id = %self.event_id,
            "Inserted event attendance"
        );
        Ok(())
    }

    pub async fn update(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query(
            "UPDATE event_attendance SET event_id = $2, profile_id = $3, check_in = $4, \
             number_attending = $5 WHERE id = $1",
        )
        .bind(self.id)
        .bind(self.event_id)
        .bind(self.profile_id)
        .bind(self.check_in)
        .bind(self.number_attending)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query("DELETE FROM event_attendance WHERE id = $1")
            .bind(self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, ModelError> {
        let row: Option<EventAttendanceFields> = sqlx::query_as(&format!(
            "SELECT {} FROM event_attendance WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        row.map(Self::from_row).transpose()
    }

    pub async fn get_by_event_id(pool: &PgPool, event_id: Uuid) -> Result<Vec<Self>, ModelError> {
        let rows: Vec<EventAttendanceFields> = sqlx::query_as(&format!(
            "SELECT {} FROM event_attendance WHERE event_id = $1",
            COLUMNS
        ))
        .bind(event_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Self::from_row).collect()
    }

    pub async fn get_by_profile_id(
        pool: &PgPool,
        profile_id: Uuid,
    ) -> Result<Vec<Self>, ModelError> {
        let rows: Vec<EventAttendanceFields> = sqlx::query_as(&format!(
            "SELECT {} FROM event_attendance WHERE profile_id = $1",
            COLUMNS
        ))
        .bind(profile_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Self::from_row).collect()
    }

    /// First attendance the profile has checked in to, if any.
    pub async fn get_checked_in_by_profile_id(
        pool: &PgPool,
        profile_id: Uuid,
    ) -> Result<Option<Self>, ModelError> {
        let row: Option<EventAttendanceFields> = sqlx::query_as(&format!(
            "SELECT {} FROM event_attendance WHERE check_in = TRUE AND profile_id = $1 LIMIT 1",
            COLUMNS
        ))
        .bind(profile_id)
        .fetch_optional(pool)
        .await?;
        row.map(Self::from_row).transpose()
    }

    /// Whether `profile_id` has checked in to `event_id`, which is what
    /// earns the right to rate other attendees there.
    pub async fn should_rate(
        pool: &PgPool,
        event_id: Uuid,
        profile_id: Uuid,
    ) -> Result<bool, ModelError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(id) FROM event_attendance \
             WHERE check_in = TRUE AND event_id = $1 AND profile_id = $2",
        )
        .bind(event_id)
        .bind(profile_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    /// Head count across every attendance row of an event.
    pub async fn total_attending(pool: &PgPool, event_id: Uuid) -> Result<i64, ModelError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(number_attending), 0)::BIGINT FROM event_attendance \
             WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_one(pool)
        .await?;
        Ok(total)
    }
}

fn validate_number_attending(number: i32) -> Result<i32, ModelError> {
    bounded_count(number, "event attendance", MAX_NUMBER_ATTENDING)
}
