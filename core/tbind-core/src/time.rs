//! Time column encoding.
//!
//! Time columns are stored and sent to the store as float seconds since the
//! Unix epoch, with no timezone attached. Timezones only matter when a value
//! is read back for display: [`decode`] renders it in the given offset, or in
//! the local timezone when none is given.

use crate::error::{TbError, TbResult};
use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use serde_json::Value;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Accepted inputs for a time column setter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeInput {
    /// A wall-clock instant in any offset.
    Instant(DateTime<FixedOffset>),
    /// Whole seconds since the epoch.
    Seconds(i64),
    /// Fractional seconds since the epoch.
    FloatSeconds(f64),
}

impl<Tz: TimeZone> From<DateTime<Tz>> for TimeInput {
    fn from(dt: DateTime<Tz>) -> Self {
        TimeInput::Instant(dt.fixed_offset())
    }
}

impl From<i64> for TimeInput {
    fn from(secs: i64) -> Self {
        TimeInput::Seconds(secs)
    }
}

impl From<i32> for TimeInput {
    fn from(secs: i32) -> Self {
        TimeInput::Seconds(i64::from(secs))
    }
}

impl From<f64> for TimeInput {
    fn from(secs: f64) -> Self {
        TimeInput::FloatSeconds(secs)
    }
}

impl TimeInput {
    /// Interpret a dynamic attribute value as a time input.
    ///
    /// Integers and floats are accepted; every other JSON kind is a
    /// [`TbError::TypeMismatch`] naming `column`.
    pub fn from_value(column: &str, value: &Value) -> TbResult<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(TimeInput::Seconds(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(TimeInput::FloatSeconds(f))
                } else {
                    Err(mismatch(column, "number out of range"))
                }
            }
            other => Err(mismatch(column, value_kind(other))),
        }
    }
}

/// Normalize a time input to float seconds since the epoch.
pub fn encode(column: &str, input: TimeInput) -> TbResult<f64> {
    match input {
        TimeInput::Instant(dt) => {
            Ok(dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / NANOS_PER_SEC)
        }
        TimeInput::Seconds(secs) => Ok(secs as f64),
        TimeInput::FloatSeconds(secs) if secs.is_finite() => Ok(secs),
        TimeInput::FloatSeconds(_) => Err(mismatch(column, "non-finite float")),
    }
}

/// Convert stored float seconds back to an instant.
///
/// With `offset` the instant is expressed in that offset; without it the
/// local timezone's offset at that instant is used. Returns `None` when the
/// value is outside chrono's representable range.
pub fn decode(secs: f64, offset: Option<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    if !secs.is_finite() {
        return None;
    }
    let mut whole = secs.floor();
    let mut nanos = ((secs - whole) * NANOS_PER_SEC).round();
    if nanos >= NANOS_PER_SEC {
        whole += 1.0;
        nanos = 0.0;
    }
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let utc: DateTime<Utc> = DateTime::from_timestamp(whole as i64, nanos as u32)?;
    Some(match offset {
        Some(offset) => utc.with_timezone(&offset),
        None => utc.with_timezone(&Local).fixed_offset(),
    })
}

/// Current instant as float seconds.
pub fn now_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / NANOS_PER_SEC
}

/// Parse a UTC offset such as `+09:00`, `-0530`, `+09` or `Z`.
pub fn parse_offset(text: &str) -> TbResult<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| bad_offset(text));
    }

    let (sign, rest) = match text.as_bytes().first() {
        Some(b'+') => (1, &text[1..]),
        Some(b'-') => (-1, &text[1..]),
        _ => return Err(bad_offset(text)),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad_offset(text));
    }
    let (hours, minutes) = match digits.len() {
        2 => (&digits[..2], "0"),
        4 => (&digits[..2], &digits[2..]),
        _ => return Err(bad_offset(text)),
    };
    let hours: i32 = hours.parse().map_err(|_| bad_offset(text))?;
    let minutes: i32 = minutes.parse().map_err(|_| bad_offset(text))?;
    if minutes >= 60 {
        return Err(bad_offset(text));
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(|| bad_offset(text))
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(column: &str, actual: &str) -> TbError {
    TbError::TypeMismatch {
        column: column.to_string(),
        expected: "instant, integer or float seconds".to_string(),
        actual: actual.to_string(),
    }
}

fn bad_offset(text: &str) -> TbError {
    TbError::Config(format!("invalid UTC offset '{text}'"))
}
