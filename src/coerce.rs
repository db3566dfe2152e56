//! Conversions between [`Value`] and concrete field types.
//!
//! The pair [`IntoValue`]/[`FromValue`] is the conversion table the binding
//! schema consults: the impls on this page are the complete, immutable set of
//! supported field types. Numeric conversions are checked — a value that does
//! not fit the target width is a [`CoerceError`], which the caller downgrades
//! to a per-field warning rather than aborting the load.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use thiserror::Error;

use crate::value::Value;

/// A single failed conversion. Never fatal: the binding layer reports it as
/// a warning and leaves the field at its prior value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CoerceError(String);

impl CoerceError {
    pub(crate) fn mismatch(expected: &str, found: &Value) -> Self {
        CoerceError(format!("expected {expected}, found {}", found.type_name()))
    }

    pub(crate) fn message(msg: impl Into<String>) -> Self {
        CoerceError(msg.into())
    }
}

/// Convert a field value into the format-neutral model for rendering.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Convert a parsed [`Value`] into a concrete field type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, CoerceError>;

    /// Whether an explicit null should be passed through to the field.
    /// Only `Option` (and raw `Value`) say yes; for every other target an
    /// explicit null leaves the field's prior value in place.
    fn accepts_null() -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Str(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::Str(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(CoerceError::mismatch("a boolean", other)),
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

macro_rules! int_conversions {
    ($($ty:ty),* $(,)?) => {$(
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, CoerceError> {
                match value {
                    Value::Int(i) => <$ty>::try_from(*i).map_err(|_| {
                        CoerceError::message(format!(
                            "{i} is out of range for {}", stringify!($ty)
                        ))
                    }),
                    Value::Float(f) => {
                        let rounded = *f as i64;
                        if f.fract() == 0.0 && (rounded as f64 - *f).abs() < f64::EPSILON {
                            <$ty>::try_from(rounded).map_err(|_| {
                                CoerceError::message(format!(
                                    "{f} is out of range for {}", stringify!($ty)
                                ))
                            })
                        } else {
                            Err(CoerceError::message(format!(
                                "{f} is not a whole number"
                            )))
                        }
                    }
                    Value::Str(s) => s.trim().parse::<$ty>().map_err(|_| {
                        CoerceError::message(format!(
                            "'{s}' is not a valid {}", stringify!($ty)
                        ))
                    }),
                    other => Err(CoerceError::mismatch("an integer", other)),
                }
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::Int(self as i64)
            }
        }
    )*};
}

int_conversions!(i8, i16, i32, i64, u8, u16, u32, isize, usize);

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Int(i) if *i >= 0 => Ok(*i as u64),
            Value::Int(i) => Err(CoerceError::message(format!("{i} is negative"))),
            // Values above i64::MAX arrive as decimal strings.
            Value::Str(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| CoerceError::message(format!("'{s}' is not a valid u64"))),
            Value::Float(f) if f.fract() == 0.0 && *f >= 0.0 => Ok(*f as u64),
            other => Err(CoerceError::mismatch("an integer", other)),
        }
    }
}

impl IntoValue for u64 {
    fn into_value(self) -> Value {
        match i64::try_from(self) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Str(self.to_string()),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| CoerceError::message(format!("'{s}' is not a valid number"))),
            other => Err(CoerceError::mismatch("a number", other)),
        }
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self as f64)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            // Formats with untyped scalars may hand back a narrower reading
            // of what the user meant as text; render it back.
            Value::Bool(b) => Ok(b.to_string()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::DateTime(dt) => Ok(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            other => Err(CoerceError::mismatch("a string", other)),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl FromValue for char {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        let s = String::from_value(value)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(CoerceError::message(format!(
                "'{s}' is not a single character"
            ))),
        }
    }
}

impl IntoValue for char {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Date and time (ISO-8601 subsets)
// ---------------------------------------------------------------------------

pub(crate) fn parse_datetime(s: &str) -> Result<NaiveDateTime, CoerceError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, pattern) {
            return Ok(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(CoerceError::message(format!(
        "'{s}' is not an ISO-8601 date or date-time"
    )))
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::Str(s) => parse_datetime(s),
            other => Err(CoerceError::mismatch("a date-time", other)),
        }
    }
}

impl IntoValue for NaiveDateTime {
    fn into_value(self) -> Value {
        Value::DateTime(self)
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::DateTime(dt) => Ok(dt.date()),
            Value::Str(s) => parse_datetime(s).map(|dt| dt.date()),
            other => Err(CoerceError::mismatch("a date", other)),
        }
    }
}

impl IntoValue for NaiveDate {
    fn into_value(self) -> Value {
        // Dates travel as strings so formats without a date literal keep a
        // readable value.
        Value::Str(self.format("%Y-%m-%d").to_string())
    }
}

// ---------------------------------------------------------------------------
// Collections and Option
// ---------------------------------------------------------------------------

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Seq(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    T::from_value(item)
                        .map_err(|e| CoerceError::message(format!("element {i}: {e}")))
                })
                .collect(),
            other => Err(CoerceError::mismatch("a sequence", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Seq(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| {
                    T::from_value(v)
                        .map(|typed| (k.clone(), typed))
                        .map_err(|e| CoerceError::message(format!("entry '{k}': {e}")))
                })
                .collect(),
            other => Err(CoerceError::mismatch("a mapping", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for IndexMap<String, T> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k, v.into_value()))
                .collect(),
        )
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| {
                    T::from_value(v)
                        .map(|typed| (k.clone(), typed))
                        .map_err(|e| CoerceError::message(format!("entry '{k}': {e}")))
                })
                .collect(),
            other => Err(CoerceError::mismatch("a mapping", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for BTreeMap<String, T> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k, v.into_value()))
                .collect(),
        )
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn accepts_null() -> bool {
        true
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        Ok(value.clone())
    }

    fn accepts_null() -> bool {
        true
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}
