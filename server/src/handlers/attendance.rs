use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::context::CurrentProfile;
use super::{id_param, required};
use crate::models::{Event, EventAttendance, EventAttendanceFields};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{data, empty_success, success};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceQuery {
    pub event_id: Option<String>,
    pub profile_id: Option<String>,
}

/// The front end sends the check-in flag as either a boolean or 0/1.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CheckInValue {
    Flag(bool),
    Number(i64),
}

impl CheckInValue {
    fn into_bool(self) -> Result<bool, AppError> {
        match self {
            CheckInValue::Flag(flag) => Ok(flag),
            CheckInValue::Number(0) => Ok(false),
            CheckInValue::Number(1) => Ok(true),
            CheckInValue::Number(_) => Err(AppError::ValidationError(
                "event attendance check in must be 0 or 1".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePayload {
    pub event_attendance_event_id: Option<String>,
    pub event_attendance_check_in: Option<CheckInValue>,
    pub event_attendance_number_attending: Option<i32>,
}

/// Rejects a head count that would push the event past its attendee limit.
pub(crate) async fn ensure_capacity(
    pool: &PgPool,
    event: &Event,
    released: i32,
    requested: i32,
) -> Result<(), AppError> {
    let Some(limit) = event.attendee_limit() else {
        return Ok(());
    };
    let taken = EventAttendance::total_attending(pool, event.id()).await?;
    if taken - i64::from(released) + i64::from(requested) > i64::from(limit) {
        return Err(AppError::Conflict(format!(
            "event is full: {} of {} places taken",
            taken, limit
        )));
    }
    Ok(())
}

pub async fn list_attendances(
    State(state): State<AppState>,
    query: Result<Query<AttendanceQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;

    let attendances = match (query.event_id.as_deref(), query.profile_id.as_deref()) {
        (Some(event_id), _) => {
            EventAttendance::get_by_event_id(&state.pool, id_param(event_id)?).await?
        }
        (None, Some(profile_id)) => {
            EventAttendance::get_by_profile_id(&state.pool, id_param(profile_id)?).await?
        }
        (None, None) => {
            return Err(AppError::ValidationError(
                "an eventId or profileId is required".to_string(),
            ))
        }
    };

    Ok(data(attendances))
}

pub async fn get_checked_in(
    State(state): State<AppState>,
    query: Result<Query<AttendanceQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let profile_id = id_param(required(query.profile_id.as_deref(), "a profileId is required")?)?;

    let attendance = EventAttendance::get_checked_in_by_profile_id(&state.pool, profile_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "profile '{}' has not checked in to any event",
                profile_id
            ))
        })?;

    Ok(data(attendance))
}

pub async fn get_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = id_param(&id)?;
    let attendance = EventAttendance::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event attendance '{}' was not found", id)))?;

    Ok(data(attendance))
}

pub async fn create_attendance(
    State(state): State<AppState>,
    current: CurrentProfile,
    payload: Result<Json<AttendancePayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;

    let event_id = id_param(&required(
        payload.event_attendance_event_id,
        "event attendance event id is required",
    )?)?;
    let number_attending = required(
        payload.event_attendance_number_attending,
        "event attendance number attending is required",
    )?;
    let check_in = match payload.event_attendance_check_in {
        Some(value) => value.into_bool()?,
        None => false,
    };

    let attendance = EventAttendance::new(EventAttendanceFields {
        id: Uuid::new_v4(),
        event_id,
        profile_id: current.id(),
        check_in,
        number_attending,
    })?;

    let event = Event::get_by_id(&state.pool, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event '{}' was not found", event_id)))?;
    ensure_capacity(&state.pool, &event, 0, number_attending).await?;

    attendance.insert(&state.pool).await?;

    tracing::info!(
        event_attendance_id = %attendance.id(),
        event_id = %event_id,
        "Attendance recorded"
    );
    Ok(success(attendance, "Attendance recorded"))
}

pub async fn update_attendance(
    State(state): State<AppState>,
    current: CurrentProfile,
    Path(id): Path<String>,
    payload: Result<Json<AttendancePayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = id_param(&id)?;
    let Json(payload) = payload?;

    let existing = EventAttendance::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event attendance '{}' was not found", id)))?;
    current.ensure_owns(existing.profile_id(), "event attendance")?;

    let mut attendance = existing.clone();
    if let Some(value) = payload.event_attendance_check_in {
        attendance.set_check_in(value.into_bool()?);
    }
    if let Some(number) = payload.event_attendance_number_attending {
        attendance.set_number_attending(number)?;
    }

    if attendance.number_attending() > existing.number_attending() {
        if let Some(event) = Event::get_by_id(&state.pool, attendance.event_id()).await? {
            ensure_capacity(
                &state.pool,
                &event,
                existing.number_attending(),
                attendance.number_attending(),
            )
            .await?;
        }
    }

    attendance.update(&state.pool).await?;
    Ok(success(attendance, "Attendance updated"))
}

pub async fn delete_attendance(
    State(state): State<AppState>,
    current: CurrentProfile,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = id_param(&id)?;

    let attendance = EventAttendance::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event attendance '{}' was not found", id)))?;
    current.ensure_owns(attendance.profile_id(), "event attendance")?;

    attendance
        .delete(&state.pool)
        .await
        .map_err(AppError::from_delete)?;
    Ok(empty_success("Attendance removed"))
}
