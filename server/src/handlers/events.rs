use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::attendance::ensure_capacity;
use super::context::CurrentProfile;
use super::{date_param, id_param, required};
use crate::models::{Event, EventFields};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{data, empty_success, success};
use crate::utils::validate::DateTimeValue;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    pub profile_id: Option<String>,
    pub name: Option<String>,
    pub start_from: Option<String>,
    pub start_to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub event_attendee_limit: Option<i32>,
    pub event_detail: Option<String>,
    pub event_end_date_time: Option<DateTimeValue>,
    pub event_image: Option<String>,
    pub event_lat: Option<f64>,
    pub event_long: Option<f64>,
    pub event_name: Option<String>,
    pub event_price: Option<Decimal>,
    pub event_start_date_time: Option<DateTimeValue>,
}

impl EventPayload {
    fn into_fields(self, id: Uuid, profile_id: Uuid) -> Result<EventFields, AppError> {
        let start = required(self.event_start_date_time, "event start date is required")?;
        let end = required(self.event_end_date_time, "event end date is required")?;

        Ok(EventFields {
            id,
            profile_id,
            attendee_limit: self.event_attendee_limit,
            detail: required(self.event_detail, "event detail is required")?,
            end_date_time: end.into_date_time()?,
            image: self.event_image,
            lat: required(self.event_lat, "event latitude is required")?,
            long: required(self.event_long, "event longitude is required")?,
            name: required(self.event_name, "event name is required")?,
            price: self.event_price.unwrap_or(Decimal::ZERO),
            start_date_time: start.into_date_time()?,
        })
    }
}

pub async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<EventQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;

    let events = if let Some(profile_id) = query.profile_id.as_deref() {
        Event::get_by_profile_id(&state.pool, id_param(profile_id)?).await?
    } else if let Some(name) = query.name.as_deref() {
        Event::get_by_name(&state.pool, name).await?
    } else if query.start_from.is_some() || query.start_to.is_some() {
        let (Some(from), Some(to)) = (query.start_from.as_deref(), query.start_to.as_deref())
        else {
            return Err(AppError::ValidationError(
                "both startFrom and startTo are required".to_string(),
            ));
        };
        Event::get_by_start_date_time(&state.pool, date_param(from)?, date_param(to)?).await?
    } else {
        Event::get_all(&state.pool).await?
    };

    Ok(data(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = id_param(&id)?;
    let event = Event::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event '{}' was not found", id)))?;

    Ok(data(event))
}

pub async fn create_event(
    State(state): State<AppState>,
    current: CurrentProfile,
    payload: Result<Json<EventPayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;

    let event = Event::new(payload.into_fields(Uuid::new_v4(), current.id())?)?;
    event.insert(&state.pool).await?;

    tracing::info!(event_id = %event.id(), profile_id = %current.id(), "Event created");
    Ok(success(event, "Event created OK"))
}

pub async fn update_event(
    State(state): State<AppState>,
    current: CurrentProfile,
    Path(id): Path<String>,
    payload: Result<Json<EventPayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = id_param(&id)?;
    let Json(payload) = payload?;

    let existing = Event::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event '{}' was not found", id)))?;
    current.ensure_owns(existing.profile_id(), "event")?;

    let event = Event::new(payload.into_fields(id, existing.profile_id())?)?;
    if event.attendee_limit() != existing.attendee_limit() {
        ensure_capacity(&state.pool, &event, 0, 0).await?;
    }
    event.update(&state.pool).await?;

    tracing::info!(event_id = %id, "Event updated");
    Ok(success(event, "Event updated OK"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    current: CurrentProfile,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = id_param(&id)?;

    let event = Event::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event '{}' was not found", id)))?;
    current.ensure_owns(event.profile_id(), "event")?;

    event
        .delete(&state.pool)
        .await
        .map_err(AppError::from_delete)?;

    tracing::info!(event_id = %id, "Event deleted");
    Ok(empty_success("Event deleted OK"))
}
