//! Runtime Value System - Tagged Attribute Values
//!
//! Every value crossing the model boundary is carried as a tagged variant,
//! so classification is structural instead of reflective.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// ISO-8601 calendar date, e.g. `2024-01-15`.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// ISO-8601 datetime with optional fractional seconds, e.g. `2024-01-15T08:30:00`.
pub const ISO_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A value held by (or offered to) a model attribute.
///
/// Property kinds accept a subset of these variants and normalize them into
/// the canonical in-memory form before storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Calendar date with no time-of-day component.
    Date(NaiveDate),
    /// Naive instant: calendar date plus time-of-day.
    Datetime(NaiveDateTime),
    /// Elapsed span of time.
    Duration(TimeDelta),
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    /// Convert a JSON value into a [`Value`], or `None` for shapes the model
    /// layer cannot carry (null, arrays, objects).
    ///
    /// Strings stay strings here; ISO promotion happens in the property
    /// kind's transform step.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i))
                } else {
                    n.as_f64().map(Self::Float)
                }
            }
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }

    /// Render the natural JSON form of this value.
    ///
    /// Dates render as ISO-8601 date strings, datetimes as ISO-8601 datetime
    /// strings, and durations as whole milliseconds. This is the
    /// introspection dump, not the browser wire encoding.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Date(d) => serde_json::Value::String(d.format(ISO_DATE_FORMAT).to_string()),
            Self::Datetime(dt) => {
                serde_json::Value::String(dt.format(ISO_DATETIME_FORMAT).to_string())
            }
            Self::Duration(td) => serde_json::Value::Number(td.num_milliseconds().into()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Int(i) => serde_json::Value::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

/// True iff the value is a datetime.
pub fn is_datetime_type(value: &Value) -> bool {
    matches!(value, Value::Datetime(_))
}

/// True iff the value is a duration.
pub fn is_timedelta_type(value: &Value) -> bool {
    matches!(value, Value::Duration(_))
}

/// True iff the value is a numeric epoch timestamp: an integer or a float,
/// and never a boolean.
///
/// The boolean arm is spelled out even though the variants are already
/// disjoint, so the contract stays visible and testable.
pub fn is_timestamp(value: &Value) -> bool {
    match value {
        Value::Bool(_) => false,
        Value::Int(_) | Value::Float(_) => true,
        _ => false,
    }
}

/// Promote a calendar date to the datetime at midnight on that date.
pub fn convert_date_to_datetime(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Parse an ISO-8601 date or datetime string into a naive datetime.
///
/// Accepted shapes:
/// - bare dates (`2024-01-15`), promoted to midnight
/// - naive datetimes with `T` or space separators, seconds and fractional
///   seconds optional (`2024-01-15T08:30`, `2024-01-15 08:30:00.250`)
/// - RFC 3339 strings with a UTC offset, normalized to their UTC instant
pub fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = s.parse::<NaiveDate>() {
        return Some(convert_date_to_datetime(date));
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_timestamp_excludes_booleans() {
        assert!(!is_timestamp(&Value::Bool(true)));
        assert!(!is_timestamp(&Value::Bool(false)));
        assert!(is_timestamp(&Value::Int(1_700_000_000)));
        assert!(is_timestamp(&Value::Float(1_700_000_000.5)));
        assert!(!is_timestamp(&Value::String("1700000000".into())));
    }

    #[test]
    fn test_date_promotion_is_midnight() {
        let dt = convert_date_to_datetime(date(2024, 1, 15));
        assert_eq!(dt, date(2024, 1, 15).and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_iso_shapes() {
        assert_eq!(
            parse_iso_datetime("2024-01-15"),
            Some(date(2024, 1, 15).and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_iso_datetime("2024-01-15T08:30"),
            Some(date(2024, 1, 15).and_hms_opt(8, 30, 0).unwrap())
        );
        assert_eq!(
            parse_iso_datetime("2024-01-15 08:30:00.250"),
            Some(date(2024, 1, 15).and_hms_milli_opt(8, 30, 0, 250).unwrap())
        );
        // Offset strings normalize to their UTC instant.
        assert_eq!(
            parse_iso_datetime("2024-01-15T08:30:00+02:00"),
            Some(date(2024, 1, 15).and_hms_opt(6, 30, 0).unwrap())
        );
        assert_eq!(parse_iso_datetime("not-a-date"), None);
        assert_eq!(parse_iso_datetime("2024-13-01"), None);
    }

    #[test]
    fn test_json_round_trip_natural_forms() {
        let json = serde_json::json!("2024-01-15");
        assert_eq!(
            Value::from_json(&json),
            Some(Value::String("2024-01-15".into()))
        );
        assert_eq!(Value::from_json(&serde_json::json!(3)), Some(Value::Int(3)));
        assert_eq!(
            Value::from_json(&serde_json::json!(1.5)),
            Some(Value::Float(1.5))
        );
        assert_eq!(
            Value::from_json(&serde_json::json!(true)),
            Some(Value::Bool(true))
        );
        assert_eq!(Value::from_json(&serde_json::Value::Null), None);
        assert_eq!(Value::from_json(&serde_json::json!([1, 2])), None);
    }

    #[test]
    fn test_to_json_canonical_forms() {
        assert_eq!(
            Value::Date(date(2024, 1, 15)).to_json(),
            serde_json::json!("2024-01-15")
        );
        assert_eq!(
            Value::Datetime(date(2024, 1, 15).and_hms_opt(8, 30, 0).unwrap()).to_json(),
            serde_json::json!("2024-01-15T08:30:00")
        );
        assert_eq!(
            Value::Duration(TimeDelta::milliseconds(1500)).to_json(),
            serde_json::json!(1500)
        );
    }
}
