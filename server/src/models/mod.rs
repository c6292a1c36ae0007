//! Self-validating entities backed by PostgreSQL.
//!
//! Every entity is built from a `*Fields` value, which is what both the API
//! layer and `sqlx::FromRow` produce. Construction routes each field through
//! the same rule its setter uses, so an entity in memory is always valid.

mod error;

pub mod event;
pub mod event_attendance;
pub mod profile;
pub mod rating;

pub use error::{ErrorKind, ModelError};
pub use event::{Event, EventFields};
pub use event_attendance::{EventAttendance, EventAttendanceFields};
pub use profile::{Profile, ProfileFields};
pub use rating::{Rating, RatingFields};

use crate::utils::validate::sanitize_text;

/// Sanitizes `input` and enforces that it is non-empty and at most `max` chars.
pub(crate) fn required_text(input: &str, what: &str, max: usize) -> Result<String, ModelError> {
    let clean = sanitize_text(input);
    if clean.is_empty() {
        return Err(ModelError::InvalidArgument(format!(
            "{} is empty or insecure",
            what
        )));
    }
    if clean.chars().count() > max {
        return Err(ModelError::OutOfRange(format!("{} is too long", what)));
    }
    Ok(clean)
}

/// Like [`required_text`], but absent or blank input clears the field.
pub(crate) fn optional_text(
    input: Option<&str>,
    what: &str,
    max: usize,
) -> Result<Option<String>, ModelError> {
    let Some(raw) = input else {
        return Ok(None);
    };
    let clean = sanitize_text(raw);
    if clean.is_empty() {
        return Ok(None);
    }
    if clean.chars().count() > max {
        return Err(ModelError::OutOfRange(format!("{} is too long", what)));
    }
    Ok(Some(clean))
}

/// Counts of people: never negative, never above `max`.
pub(crate) fn bounded_count(value: i32, what: &str, max: i32) -> Result<i32, ModelError> {
    if value < 0 {
        return Err(ModelError::OutOfRange(format!("{} cannot be negative", what)));
    }
    if value > max {
        return Err(ModelError::OutOfRange(format!("{} is too large", what)));
    }
    Ok(value)
}
