//! Typed Property Kinds - Transform/Validate Gate
//!
//! A property kind normalizes, then gates. `transform` is best-effort
//! normalization and never fails; `validate` is the correctness gate and
//! rejects with a [`ValidationError`]. Both run their generic base stage
//! before the kind-specific one.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::{
    convert_date_to_datetime, is_datetime_type, is_timedelta_type, is_timestamp,
    parse_iso_datetime, Value, ISO_DATE_FORMAT,
};

/// A rejected attribute value.
///
/// The message is fully descriptive when validation ran with `detail`, and
/// empty otherwise; callers suppress detail in bulk passes where messages
/// are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    /// Build a rejection, paying for message formatting only when `detail`
    /// is set.
    fn reject(detail: bool, message: impl FnOnce() -> String) -> Self {
        Self {
            message: if detail { message() } else { String::new() },
        }
    }
}

/// The semantic kind a property accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    /// Calendar dates. Canonical stored form: ISO-8601 date string.
    Date,
    /// Instants: datetime values, calendar dates, ISO strings, or numeric
    /// epoch timestamps.
    Datetime,
    /// Elapsed time spans. Native duration values only.
    TimeDelta,
}

impl PropertyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::TimeDelta => "timedelta",
        }
    }

    /// Normalize a candidate value into the kind's canonical form.
    ///
    /// Pure and best-effort: values the kind does not recognize pass through
    /// unchanged for `validate` to judge.
    pub fn transform(&self, value: Value) -> Value {
        let value = transform_base(value);

        match self {
            Self::Date => match value {
                Value::Date(d) => Value::String(d.format(ISO_DATE_FORMAT).to_string()),
                other => other,
            },
            Self::Datetime => match value {
                Value::String(s) => match parse_iso_datetime(&s) {
                    Some(dt) => Value::Datetime(dt),
                    None => Value::String(s),
                },
                Value::Date(d) => Value::Datetime(convert_date_to_datetime(d)),
                other => other,
            },
            // Wire encoding of durations belongs to the protocol stage.
            Self::TimeDelta => value,
        }
    }

    /// Gate a candidate value against this kind.
    ///
    /// Runs the generic base gate first, then the kind-specific checks in
    /// order. With `detail` unset the rejection carries an empty message.
    pub fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        validate_base(value, detail)?;

        match self {
            Self::Date => {
                // A datetime is structurally date-like; exclude it up front.
                if is_datetime_type(value) {
                    return Err(ValidationError::reject(detail, || {
                        "Expected a date value, got a datetime".to_string()
                    }));
                }
                if matches!(value, Value::Date(_)) {
                    return Ok(());
                }
                if let Value::String(s) = value {
                    if parse_iso_datetime(s).is_some() {
                        return Ok(());
                    }
                }
                Err(ValidationError::reject(detail, || {
                    format!("Expected an ISO date string, got {value:?}")
                }))
            }
            Self::Datetime => {
                if is_datetime_type(value) {
                    return Ok(());
                }
                if matches!(value, Value::Date(_)) {
                    return Ok(());
                }
                if is_timestamp(value) {
                    return Ok(());
                }
                if let Value::String(s) = value {
                    if parse_iso_datetime(s).is_some() {
                        return Ok(());
                    }
                }
                Err(ValidationError::reject(detail, || {
                    format!("Expected a date, datetime, or timestamp, got {value:?}")
                }))
            }
            Self::TimeDelta => {
                if is_timedelta_type(value) {
                    return Ok(());
                }
                Err(ValidationError::reject(detail, || {
                    format!("Expected a duration value, got {value:?}")
                }))
            }
        }
    }
}

/// Generic stage of the transform chain; kinds run it before their own
/// normalization.
fn transform_base(value: Value) -> Value {
    value
}

/// Generic gate every kind runs first: non-finite numbers are never valid
/// attribute values.
fn validate_base(value: &Value, detail: bool) -> Result<(), ValidationError> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(ValidationError::reject(detail, || {
            format!("Expected a finite number, got {value:?}")
        })),
        _ => Ok(()),
    }
}

/// Declared default of a property: either an explicit value or the absence
/// marker meaning "no default provided".
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyDefault {
    Undefined,
    Value(Value),
}

/// A schema-attached attribute declaration: the kind, a default, and an
/// optional help string. Configuration only; carries no runtime state.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub kind: PropertyKind,
    pub default: PropertyDefault,
    /// Documentation only; no behavioral effect.
    pub help: Option<String>,
}

impl PropertyDescriptor {
    /// Declare an attribute of the given kind. `TimeDelta` defaults to a
    /// zero-length duration; the other kinds start with no default.
    pub fn new(kind: PropertyKind) -> Self {
        let default = match kind {
            PropertyKind::TimeDelta => PropertyDefault::Value(Value::Duration(TimeDelta::zero())),
            _ => PropertyDefault::Undefined,
        };
        Self {
            kind,
            default,
            help: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = PropertyDefault::Value(value);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}
