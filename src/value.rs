//! The format-neutral value model.
//!
//! Every format adapter parses into and renders from [`Value`], so the rest
//! of the library never branches on a parser's own value types. Maps preserve
//! insertion order, which is what keeps key order stable across a
//! parse/render round trip.

use chrono::NaiveDateTime;
use indexmap::IndexMap;

/// An ordered key→value mapping, the shape of every parsed document root.
pub type Map = IndexMap<String, Value>;

/// A parsed or to-be-rendered configuration value.
///
/// `Null` means "explicitly empty". Formats without a null literal (TOML,
/// Properties) and JSON omit null-valued keys entirely, so after a round
/// trip "set to null" and "never set" are the same state; only YAML writes
/// a `null` literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(NaiveDateTime),
    Seq(Vec<Value>),
    Map(Map),
}

impl Value {
    /// Human-readable name of the variant, used in coercion warnings.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Int(_) => "an integer",
            Value::Float(_) => "a float",
            Value::Str(_) => "a string",
            Value::DateTime(_) => "a date-time",
            Value::Seq(_) => "a sequence",
            Value::Map(_) => "a mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
