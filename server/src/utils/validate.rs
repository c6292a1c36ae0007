//! Boundary parsing shared by every entity.
//!
//! Identifiers and timestamps arrive as loosely typed text (path segments,
//! query strings, JSON fields). Everything is parsed here once into a
//! canonical [`Uuid`] or [`DateTime<Utc>`], so entity code only ever deals
//! with typed values.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use uuid::{Uuid, Version};

use crate::models::ModelError;

/// Textual timestamp layout used for parsing and display.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]*>?").expect("static tag pattern is valid"))
}

fn date_pattern() -> &'static Regex {
    static DATE: OnceLock<Regex> = OnceLock::new();
    DATE.get_or_init(|| {
        Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("static date pattern is valid")
    })
}

fn time_pattern() -> &'static Regex {
    static TIME: OnceLock<Regex> = OnceLock::new();
    TIME.get_or_init(|| {
        Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(?:\.(\d{1,6}))?$")
            .expect("static time pattern is valid")
    })
}

/// Parses a hyphenated identifier string into a version 4 [`Uuid`].
pub fn parse_uuid(input: &str) -> Result<Uuid, ModelError> {
    let trimmed = input.trim();
    if trimmed.len() != 36 {
        return Err(ModelError::InvalidArgument("invalid uuid".to_string()));
    }
    let uuid = Uuid::try_parse(trimmed)
        .map_err(|_| ModelError::InvalidArgument("invalid uuid".to_string()))?;
    require_v4(uuid)
}

/// Builds a [`Uuid`] from its 16 byte storage form.
pub fn uuid_from_bytes(bytes: &[u8]) -> Result<Uuid, ModelError> {
    let uuid = Uuid::from_slice(bytes)
        .map_err(|_| ModelError::InvalidArgument("invalid uuid".to_string()))?;
    require_v4(uuid)
}

pub fn require_v4(uuid: Uuid) -> Result<Uuid, ModelError> {
    match uuid.get_version() {
        Some(Version::Random) => Ok(uuid),
        _ => Err(ModelError::OutOfRange("uuid is not version 4".to_string())),
    }
}

/// Parses `YYYY-MM-DD HH:MM:SS[.ffffff]` as a UTC timestamp.
///
/// A string that does not have the expected shape is an argument error. A
/// well-formed string naming a day or time that does not exist (February 30,
/// hour 24) is a range error.
pub fn parse_date_time(input: &str) -> Result<DateTime<Utc>, ModelError> {
    let trimmed = input.trim();
    let (date_part, time_part) = trimmed
        .split_once(' ')
        .ok_or_else(|| ModelError::InvalidArgument("date is not a valid date".to_string()))?;

    let date = parse_date(date_part)?;
    let time = parse_time(time_part.trim())?;

    Ok(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
}

fn parse_date(input: &str) -> Result<NaiveDate, ModelError> {
    let captures = date_pattern()
        .captures(input)
        .ok_or_else(|| ModelError::InvalidArgument("date is not a valid date".to_string()))?;

    // the pattern guarantees digits, so these only fail on overflow
    let year: i32 = captures[1].parse().unwrap_or(0);
    let month: u32 = captures[2].parse().unwrap_or(0);
    let day: u32 = captures[3].parse().unwrap_or(0);

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ModelError::OutOfRange("date is not a Gregorian date".to_string()))
}

fn parse_time(input: &str) -> Result<NaiveTime, ModelError> {
    let captures = time_pattern()
        .captures(input)
        .ok_or_else(|| ModelError::InvalidArgument("time is not a valid time".to_string()))?;

    let hour: u32 = captures[1].parse().unwrap_or(u32::MAX);
    let minute: u32 = captures[2].parse().unwrap_or(u32::MAX);
    let second: u32 = captures[3].parse().unwrap_or(u32::MAX);
    let micros: u32 = match captures.get(4) {
        Some(fraction) => {
            // right-pad so ".5" means 500000 microseconds
            let padded = format!("{:0<6}", fraction.as_str());
            padded.parse().unwrap_or(u32::MAX)
        }
        None => 0,
    };

    if hour > 23 {
        return Err(ModelError::OutOfRange("hour is out of range".to_string()));
    }
    if minute > 59 {
        return Err(ModelError::OutOfRange("minute is out of range".to_string()));
    }
    if second > 59 {
        return Err(ModelError::OutOfRange("second is out of range".to_string()));
    }

    NaiveTime::from_hms_micro_opt(hour, minute, second, micros)
        .ok_or_else(|| ModelError::OutOfRange("time is not a valid time".to_string()))
}

/// Like [`parse_date_time`], but an absent value means "now".
pub fn date_time_or_now(input: Option<&str>) -> Result<DateTime<Utc>, ModelError> {
    match input {
        Some(text) => parse_date_time(text),
        None => Ok(truncate_to_micros(Utc::now())),
    }
}

/// PostgreSQL keeps microseconds; anything finer would not survive a round trip.
pub fn truncate_to_micros(value: DateTime<Utc>) -> DateTime<Utc> {
    value.trunc_subsecs(6)
}

pub fn format_date_time(value: &DateTime<Utc>) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

/// Trims, strips markup tags and drops control characters other than
/// newlines and tabs.
pub fn sanitize_text(input: &str) -> String {
    let stripped = tag_pattern().replace_all(input.trim(), "");
    stripped
        .chars()
        .filter(|ch| !ch.is_control() || matches!(ch, '\n' | '\r' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// A timestamp as the front end sends it: epoch milliseconds or text.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DateTimeValue {
    Millis(i64),
    Text(String),
}

impl DateTimeValue {
    pub fn into_date_time(self) -> Result<DateTime<Utc>, ModelError> {
        match self {
            DateTimeValue::Millis(millis) => Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| ModelError::OutOfRange("timestamp is out of range".to_string())),
            DateTimeValue::Text(text) => parse_date_time(&text),
        }
    }
}
