//! Host values flowing through the descriptor pipeline.
//!
//! `Value` is the application-side representation of anything a descriptor
//! validates, sanitizes or serializes. It deliberately distinguishes the
//! host-native number (`Number`, an f64 that can only represent integers
//! exactly within ±(2^53 − 1)) from exact integers (`BigInt`) and exact
//! decimals (`Decimal`).

use crate::error::{Result, TypeError};
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Largest integer a host-native number represents exactly.
pub const MAX_SAFE_INTEGER: i128 = 9_007_199_254_740_991;

/// Returns true when `n` is an integer within the safely representable range.
pub fn is_safe_integer(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER as f64
}

/// Render a host-native number the way it is sent to engines.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        n.to_string()
    }
}

/// Application-level value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value
    Null,

    Bool(bool),

    /// Host-native number
    Number(f64),

    /// Exact integer
    BigInt(i128),

    /// Exact decimal
    Decimal(Decimal),

    String(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// Instant with its original offset
    DateTime(DateTime<FixedOffset>),

    /// Calendar date without time
    Date(NaiveDate),

    Uuid(Uuid),

    /// JSON document (also used for GeoJSON)
    Json(serde_json::Value),

    Array(Vec<Value>),

    /// String-keyed map (hstore values, `{value, inclusive}` range bounds)
    Object(BTreeMap<String, Value>),

    Range(RangeValue),
}

/// A range of values.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeValue {
    /// The distinguished empty range
    Empty,
    /// A range with two bounds; a `Null` bound value means unbounded on that side
    Bounds { lower: RangeBound, upper: RangeBound },
}

/// One side of a range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    pub value: Box<Value>,
    pub inclusive: bool,
}

impl RangeBound {
    pub fn new(value: Value, inclusive: bool) -> Self {
        Self {
            value: Box::new(value),
            inclusive,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.value.is_null()
    }
}

impl RangeValue {
    pub fn bounds(lower: RangeBound, upper: RangeBound) -> Self {
        RangeValue::Bounds { lower, upper }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RangeValue::Empty)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::DateTime(_) => "date-time",
            Value::Date(_) => "date",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Range(_) => "range",
        }
    }

    /// Plain textual form: strings are not quoted, numbers use engine notation.
    pub fn as_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Json(j) => j.to_string(),
            other => other.to_string(),
        }
    }

    /// Convert into a JSON document.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        use serde_json::Value as Json;

        Ok(match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) if is_safe_integer(*n) => Json::from(*n as i64),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .ok_or_else(|| {
                    TypeError::Serialization(format!("{} cannot be represented in JSON", self))
                })?,
            Value::BigInt(i) => match i64::try_from(*i) {
                Ok(small) => Json::from(small),
                Err(_) => {
                    return Err(TypeError::Serialization(format!(
                        "{i} does not fit in a JSON number"
                    )))
                }
            },
            Value::Decimal(d) => Json::String(d.to_string()),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(_) | Value::Range(_) => {
                return Err(TypeError::Serialization(format!(
                    "a {} value cannot be represented in JSON",
                    self.kind()
                )))
            }
            Value::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
            Value::Uuid(u) => Json::String(u.to_string()),
            Value::Json(j) => j.clone(),
            Value::Array(items) => Json::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json()?);
                }
                Json::Object(out)
            }
        })
    }

    /// Structural conversion from JSON.
    ///
    /// Numbers that an f64 represents exactly become `Number`, larger integers `BigInt`.
    pub fn from_json(json: serde_json::Value) -> Value {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if (i as i128).abs() <= MAX_SAFE_INTEGER {
                        Value::Number(i as f64)
                    } else {
                        Value::BigInt(i as i128)
                    }
                } else if let Some(u) = n.as_u64() {
                    Value::BigInt(u as i128)
                } else {
                    Value::Number(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::BigInt(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "'{s}'"),
            Value::Bytes(bytes) => {
                f.write_str("<Bytes")?;
                for b in bytes {
                    write!(f, " {b:02x}")?;
                }
                f.write_str(">")
            }
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Json(j) => write!(f, "{j}"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {k}: {v}")?;
                }
                f.write_str(if map.is_empty() { "}" } else { " }" })
            }
            Value::Range(RangeValue::Empty) => f.write_str("empty"),
            Value::Range(RangeValue::Bounds { lower, upper }) => write!(
                f,
                "{}{},{}{}",
                if lower.inclusive { '[' } else { '(' },
                lower.value,
                upper.value,
                if upper.inclusive { ']' } else { ')' }
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Number(i as f64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Number(i as f64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        if (i as i128).abs() <= MAX_SAFE_INTEGER {
            Value::Number(i as f64)
        } else {
            Value::BigInt(i as i128)
        }
    }
}

impl From<i128> for Value {
    fn from(i: i128) -> Self {
        Value::BigInt(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt.fixed_offset())
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<RangeValue> for Value {
    fn from(r: RangeValue) -> Self {
        Value::Range(r)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}
