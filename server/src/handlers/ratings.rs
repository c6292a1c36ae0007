use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::context::CurrentProfile;
use super::id_param;
use crate::models::{EventAttendance, Rating, RatingFields};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{data, empty_success, success};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingQuery {
    pub event_attendance_id: Option<String>,
    pub ratee_profile_id: Option<String>,
    pub rater_profile_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPayload {
    pub rating_score: Option<i32>,
    pub rating_ratee_profile_id: Option<String>,
    pub rating_event_attendance_id: Option<String>,
}

impl RatingPayload {
    /// The three mandatory fields, checked in the order the front end
    /// reports them.
    fn required_fields(self) -> Result<(i32, String, String), AppError> {
        let score = match self.rating_score {
            Some(score) if score != 0 => score,
            _ => return Err(AppError::ValidationError("No score for Rating.".to_string())),
        };
        let ratee = match self.rating_ratee_profile_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(AppError::ValidationError("No Profile ID.".to_string())),
        };
        let attendance = match self.rating_event_attendance_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                return Err(AppError::ValidationError(
                    "No Event Attendance Id.".to_string(),
                ))
            }
        };
        Ok((score, ratee, attendance))
    }
}

/// A rating is about the profile that owns the rated attendance, and never
/// about the rater.
fn ensure_ratee(attendance: &EventAttendance, ratee: Uuid, rater: Uuid) -> Result<(), AppError> {
    if ratee == rater {
        return Err(AppError::ValidationError(
            "you cannot rate yourself".to_string(),
        ));
    }
    if ratee != attendance.profile_id() {
        return Err(AppError::ValidationError(
            "rated profile does not match the event attendance".to_string(),
        ));
    }
    Ok(())
}

pub async fn list_ratings(
    State(state): State<AppState>,
    query: Result<Query<RatingQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;

    let ratings = if let Some(id) = query.event_attendance_id.as_deref() {
        Rating::get_by_event_attendance_id(&state.pool, id_param(id)?).await?
    } else if let Some(id) = query.ratee_profile_id.as_deref() {
        Rating::get_by_ratee_profile_id(&state.pool, id_param(id)?).await?
    } else if let Some(id) = query.rater_profile_id.as_deref() {
        Rating::get_by_rater_profile_id(&state.pool, id_param(id)?).await?
    } else {
        return Err(AppError::ValidationError(
            "an eventAttendanceId, rateeProfileId or raterProfileId is required".to_string(),
        ));
    };

    Ok(data(ratings))
}

pub async fn get_rating(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = id_param(&id)?;
    let rating = Rating::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rating '{}' was not found", id)))?;

    Ok(data(rating))
}

/// Submits a rating on behalf of the signed-in profile.
///
/// The rater must have checked in to the event the rated attendance belongs
/// to, and may rate each attendance record once.
pub async fn create_rating(
    State(state): State<AppState>,
    current: Option<CurrentProfile>,
    payload: Result<Json<RatingPayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let (score, ratee, attendance_id) = payload.required_fields()?;

    let Some(rater) = current else {
        return Err(AppError::AuthError(
            "you must be logged in to make a rating".to_string(),
        ));
    };

    let ratee_profile_id = id_param(&ratee)?;
    let event_attendance_id = id_param(&attendance_id)?;

    let rating = Rating::new(RatingFields {
        id: Uuid::new_v4(),
        event_attendance_id,
        ratee_profile_id,
        rater_profile_id: rater.id(),
        score,
    })?;

    let attendance = EventAttendance::get_by_id(&state.pool, event_attendance_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "event attendance '{}' was not found",
                event_attendance_id
            ))
        })?;
    ensure_ratee(&attendance, ratee_profile_id, rater.id())?;

    if !EventAttendance::should_rate(&state.pool, attendance.event_id(), rater.id()).await? {
        return Err(AppError::Forbidden(
            "you must check in to this event before rating".to_string(),
        ));
    }
    if Rating::has_rated(&state.pool, event_attendance_id, rater.id()).await? {
        return Err(AppError::Conflict(
            "you have already rated this attendance".to_string(),
        ));
    }

    rating.insert(&state.pool).await?;

    tracing::info!(
        rating_id = %rating.id(),
        event_attendance_id = %event_attendance_id,
        "Rating submitted"
    );
    Ok(success(rating, "Rating was submitted successfully."))
}

pub async fn delete_rating(
    State(state): State<AppState>,
    current: CurrentProfile,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = id_param(&id)?;

    let rating = Rating::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rating '{}' was not found", id)))?;
    current.ensure_owns(rating.rater_profile_id(), "rating")?;

    rating
        .delete(&state.pool)
        .await
        .map_err(AppError::from_delete)?;
    Ok(empty_success("Rating deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: serde_json::Value) -> RatingPayload {
        serde_json::from_value(json).unwrap()
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::ValidationError(msg) => msg,
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_required_fields_in_order() {
        let err = payload(serde_json::json!({})).required_fields().unwrap_err();
        assert_eq!(message(err), "No score for Rating.");

        let err = payload(serde_json::json!({ "ratingScore": 0 }))
            .required_fields()
            .unwrap_err();
        assert_eq!(message(err), "No score for Rating.");

        let err = payload(serde_json::json!({ "ratingScore": 3 }))
            .required_fields()
            .unwrap_err();
        assert_eq!(message(err), "No Profile ID.");

        let err = payload(serde_json::json!({
            "ratingScore": 3,
            "ratingRateeProfileId": "e2b1b2c2-6c1c-4a33-9a55-0d1f5a9d2b7e",
            "ratingEventAttendanceId": "  ",
        }))
        .required_fields()
        .unwrap_err();
        assert_eq!(message(err), "No Event Attendance Id.");
    }

    fn attendance(profile_id: Uuid) -> EventAttendance {
        EventAttendance::new(crate::models::EventAttendanceFields {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            profile_id,
            check_in: true,
            number_attending: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_ratee_must_own_the_attendance() {
        let attendee = Uuid::new_v4();
        let rater = Uuid::new_v4();
        let record = attendance(attendee);

        assert!(ensure_ratee(&record, attendee, rater).is_ok());

        let err = ensure_ratee(&record, Uuid::new_v4(), rater).unwrap_err();
        assert_eq!(
            message(err),
            "rated profile does not match the event attendance"
        );
    }

    #[test]
    fn test_rater_cannot_rate_themselves() {
        let rater = Uuid::new_v4();
        let err = ensure_ratee(&attendance(rater), rater, rater).unwrap_err();
        assert_eq!(message(err), "you cannot rate yourself");
    }

    #[test]
    fn test_required_fields_present() {
        let (score, ratee, attendance) = payload(serde_json::json!({
            "ratingScore": 70,
            "ratingRateeProfileId": "e2b1b2c2-6c1c-4a33-9a55-0d1f5a9d2b7e",
            "ratingEventAttendanceId": "5b4f1f0e-9d1b-4c61-8f0e-2a6f0f2d9c11",
        }))
        .required_fields()
        .unwrap();
        assert_eq!(score, 70);
        assert_eq!(ratee, "e2b1b2c2-6c1c-4a33-9a55-0d1f5a9d2b7e");
        assert_eq!(attendance, "5b4f1f0e-9d1b-4c61-8f0e-2a6f0f2d9c11");
    }
}
