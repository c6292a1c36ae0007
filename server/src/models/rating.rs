use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::ModelError;
use crate::utils::validate::require_v4;

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 100;

const COLUMNS: &str = "id, event_attendance_id, ratee_profile_id, rater_profile_id, score";

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RatingFields {
    pub id: Uuid,
    pub event_attendance_id: Uuid,
    pub ratee_profile_id: Uuid,
    pub rater_profile_id: Uuid,
    pub score: i32,
}

/// One attendee's score for another, tied to an attendance record.
///
/// Whether the rater is allowed to rate at all is decided by
/// [`EventAttendance::should_rate`](super::EventAttendance::should_rate)
/// before a rating is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rating {
    #[serde(rename = "ratingId")]
    id: Uuid,
    #[serde(rename = "ratingEventAttendanceId")]
    event_attendance_id: Uuid,
    #[serde(rename = "ratingRateeProfileId")]
    ratee_profile_id: Uuid,
    #[serde(rename = "ratingRaterProfileId")]
    rater_profile_id: Uuid,
    #[serde(rename = "ratingScore")]
    score: i32,
}

impl Rating {
    pub fn new(fields: RatingFields) -> Result<Self, ModelError> {
        Ok(Self {
            id: require_v4(fields.id)?,
            event_attendance_id: require_v4(fields.event_attendance_id)?,
            ratee_profile_id: require_v4(fields.ratee_profile_id)?,
            rater_profile_id: require_v4(fields.rater_profile_id)?,
            score: validate_score(fields.score)?,
        })
    }

    fn from_row(fields: RatingFields) -> Result<Self, ModelError> {
        Self::new(fields).map_err(ModelError::into_row_error)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn event_attendance_id(&self) -> Uuid {
        self.event_attendance_id
    }

    pub fn ratee_profile_id(&self) -> Uuid {
        self.ratee_profile_id
    }

    pub fn rater_profile_id(&self) -> Uuid {
        self.rater_profile_id
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn set_score(&mut self, score: i32) -> Result<(), ModelError> {
        self.score = validate_score(score)?;
        Ok(())
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query(&format!(
            "INSERT INTO rating ({}) VALUES ($1, $2, $3, $4, $5)",
            COLUMNS
        ))
        .bind(self.id)
        .bind(self.event_attendance_id)
        .bind(self.ratee_profile_id)
        .bind(self.rater_profile_id)
        .bind(self.score)
        .execute(pool)
        .await?;

        tracing::debug!(rating_id = %self.id, "Inserted rating");
        Ok(())
    }

    pub async fn update(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query(
            "UPDATE rating SET event_attendance_id = $2, ratee_profile_id = $3, \
             rater_profile_id = $4, score = $5 WHERE id = $1",
        )
        .bind(self.id)
        .bind(self.event_attendance_id)
        .bind(self.ratee_profile_id)
        .bind(self.rater_profile_id)
        .bind(self.score)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query("DELETE FROM rating WHERE id = $1")
            .bind(self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, ModelError> {
        let row: Option<RatingFields> =
            sqlx::query_as(&format!("SELECT {} FROM rating WHERE id = $1", COLUMNS))
                .bind(id)
                .fetch_optional(pool)
                .await?;
        row.map(Self::from_row).transpose()
    }

    pub async fn get_by_event_attendance_id(
        pool: &PgPool,
        event_attendance_id: Uuid,
    ) -> Result<Vec<Self>, ModelError> {
        Self::get_where(pool, "event_attendance_id", event_attendance_id).await
    }

    pub async fn get_by_ratee_profile_id(
        pool: &PgPool,
        ratee_profile_id: Uuid,
    ) -> Result<Vec<Self>, ModelError> {
        Self::get_where(pool, "ratee_profile_id", ratee_profile_id).await
    }

    pub async fn get_by_rater_profile_id(
        pool: &PgPool,
        rater_profile_id: Uuid,
    ) -> Result<Vec<Self>, ModelError> {
        Self::get_where(pool, "rater_profile_id", rater_profile_id).await
    }

    // `column` is always one of the literals above, never user input.
    async fn get_where(pool: &PgPool, column: &str, id: Uuid) -> Result<Vec<Self>, ModelError> {
        let rows: Vec<RatingFields> = sqlx::query_as(&format!(
            "SELECT {} FROM rating WHERE {} = $1",
            COLUMNS, column
        ))
        .bind(id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Self::from_row).collect()
    }

    /// Whether `rater_profile_id` already rated this attendance record.
    pub async fn has_rated(
        pool: &PgPool,
        event_attendance_id: Uuid,
        rater_profile_id: Uuid,
    ) -> Result<bool, ModelError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(id) FROM rating WHERE event_attendance_id = $1 AND rater_profile_id = $2",
        )
        .bind(event_attendance_id)
        .bind(rater_profile_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }
}

fn validate_score(score: i32) -> Result<i32, ModelError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(ModelError::OutOfRange(format!(
            "rating score must be between {} and {}",
            MIN_SCORE, MAX_SCORE
        )));
    }
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorKind;

    fn fields() -> RatingFields {
        RatingFields {
            id: Uuid::new_v4(),
            event_attendance_id: Uuid::new_v4(),
            ratee_profile_id: Uuid::new_v4(),
            rater_profile_id: Uuid::new_v4(),
            score: 70,
        }
    }

    #[test]
    fn test_valid_rating() {
        let input = fields();
        let rating = Rating::new(input.clone()).unwrap();
        assert_eq!(rating.id(), input.id);
        assert_eq!(rating.event_attendance_id(), input.event_attendance_id);
        assert_eq!(rating.ratee_profile_id(), input.ratee_profile_id);
        assert_eq!(rating.rater_profile_id(), input.rater_profile_id);
        assert_eq!(rating.score(), 70);
    }

    #[test]
    fn test_score_bounds() {
        for score in [MIN_SCORE, MAX_SCORE] {
            let mut input = fields();
            input.score = score;
            assert!(Rating::new(input).is_ok());
        }
        for score in [0, -5, MAX_SCORE + 1] {
            let mut input = fields();
            input.score = score;
            assert_eq!(Rating::new(input).unwrap_err().kind(), ErrorKind::Range);
        }
    }

    #[test]
    fn test_set_score_is_atomic() {
        let mut rating = Rating::new(fields()).unwrap();
        assert!(rating.set_score(101).is_err());
        assert_eq!(rating.score(), 70);
    }
}
