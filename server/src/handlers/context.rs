//! The signed-in profile, as vouched for by the upstream auth gateway.
//!
//! Sessions are not managed here. Whatever authenticates the caller puts the
//! profile id in [`PROFILE_ID_HEADER`]; handlers that act on behalf of a user
//! take a [`CurrentProfile`] argument instead of reaching for global state.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::utils::error::AppError;
use crate::utils::validate::parse_uuid;

pub const PROFILE_ID_HEADER: &str = "x-profile-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentProfile(pub Uuid);

impl CurrentProfile {
    pub fn id(&self) -> Uuid {
        self.0
    }

    /// Fails with 403 unless this profile is `owner`.
    pub fn ensure_owns(&self, owner: Uuid, what: &str) -> Result<(), AppError> {
        if self.0 != owner {
            return Err(AppError::Forbidden(format!(
                "you are not allowed to modify this {}",
                what
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentProfile
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(PROFILE_ID_HEADER)
            .ok_or_else(|| AppError::AuthError("you must be logged in".to_string()))?;

        let text = value
            .to_str()
            .map_err(|_| AppError::AuthError("profile id header is not readable".to_string()))?;

        let id = parse_uuid(text)
            .map_err(|_| AppError::AuthError("profile id header is not a valid id".to_string()))?;

        Ok(CurrentProfile(id))
    }
}
