use std::sync::Arc;

use thiserror::Error;
use time::{Date, Duration, PrimitiveDateTime, Time};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeWindowError {
    #[error("Invalid time of day: {0}")]
    InvalidTimeFormat(Arc<str>),
}

/// Parse a 24-hour `HH:MM` time of day. The hour may be written with one or
/// two digits, the minute always has two. Seconds are zeroed.
pub fn parse_time_of_day(raw: &str) -> Result<Time, TimeWindowError> {
    let invalid = || TimeWindowError::InvalidTimeFormat(raw.into());

    let (hour_part, minute_part) = raw.split_once(':').ok_or_else(invalid)?;
    if hour_part.is_empty() || hour_part.len() > 2 || minute_part.len() != 2 {
        return Err(invalid());
    }
    if !hour_part.bytes().all(|b| b.is_ascii_digit())
        || !minute_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }
    let hour: u8 = hour_part.parse().map_err(|_| invalid())?;
    let minute: u8 = minute_part.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Time::from_hms(hour, minute, 0).map_err(|_| invalid())
}

/// Combine a calendar date, a typed time of day and a duration into the
/// half-open window `[start, end)`.
pub fn window_from_parts(
    date: Date,
    time_of_day: Time,
    duration_minutes: u32,
) -> (PrimitiveDateTime, PrimitiveDateTime) {
    let start = PrimitiveDateTime::new(date, time_of_day);
    let end = start + Duration::minutes(i64::from(duration_minutes));
    (start, end)
}

/// Combine a calendar date, an `HH:MM` string and a duration into the
/// half-open window `[start, end)`.
pub fn resolve_window(
    date: Date,
    time_of_day: &str,
    duration_minutes: u32,
) -> Result<(PrimitiveDateTime, PrimitiveDateTime), TimeWindowError> {
    Ok(window_from_parts(
        date,
        parse_time_of_day(time_of_day)?,
        duration_minutes,
    ))
}

/// Half-open interval overlap. Windows that merely touch do not overlap.
pub fn windows_overlap(
    a: (PrimitiveDateTime, PrimitiveDateTime),
    b: (PrimitiveDateTime, PrimitiveDateTime),
) -> bool {
    a.0 < b.1 && b.0 < a.1
}
