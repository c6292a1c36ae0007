use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use super::context::CurrentProfile;
use super::id_param;
use crate::models::{ModelError, Profile};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{data, success};

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub email: Option<String>,
    pub username: Option<String>,
}

/// Public profile fields a user may change; absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    pub profile_bio: Option<String>,
    pub profile_email: Option<String>,
    pub profile_first_name: Option<String>,
    pub profile_image: Option<String>,
    pub profile_last_name: Option<String>,
    pub profile_username: Option<String>,
}

impl ProfilePayload {
    fn apply(self, profile: &mut Profile) -> Result<(), ModelError> {
        if let Some(bio) = self.profile_bio.as_deref() {
            profile.set_bio(Some(bio))?;
        }
        if let Some(email) = self.profile_email.as_deref() {
            profile.set_email(email)?;
        }
        if let Some(first_name) = self.profile_first_name.as_deref() {
            profile.set_first_name(first_name)?;
        }
        if let Some(image) = self.profile_image.as_deref() {
            profile.set_image(Some(image))?;
        }
        if let Some(last_name) = self.profile_last_name.as_deref() {
            profile.set_last_name(last_name)?;
        }
        if let Some(username) = self.profile_username.as_deref() {
            profile.set_username(username)?;
        }
        Ok(())
    }
}

pub async fn find_profile(
    State(state): State<AppState>,
    query: Result<Query<ProfileQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;

    let profile = match (query.email.as_deref(), query.username.as_deref()) {
        (Some(email), _) => Profile::get_by_email(&state.pool, email).await?,
        (None, Some(username)) => Profile::get_by_username(&state.pool, username).await?,
        (None, None) => {
            return Err(AppError::ValidationError(
                "an email or username is required".to_string(),
            ))
        }
    };

    let profile = profile.ok_or_else(|| AppError::NotFound("profile was not found".to_string()))?;
    Ok(data(profile))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = id_param(&id)?;
    let profile = Profile::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("profile '{}' was not found", id)))?;

    Ok(data(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentProfile,
    Path(id): Path<String>,
    payload: Result<Json<ProfilePayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = id_param(&id)?;
    let Json(payload) = payload?;
    current.ensure_owns(id, "profile")?;

    let mut profile = Profile::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("profile '{}' was not found", id)))?;
    payload.apply(&mut profile)?;
    profile.update(&state.pool).await?;

    tracing::info!(profile_id = %id, "Profile updated");
    Ok(success(profile, "Profile updated OK"))
}
