//! Forward conversion: descriptor value → PostgreSQL parameter
//!
//! The descriptor's transport value is mapped onto the Rust type that
//! `postgres-types` encodes for the column's storage type, so the value can
//! be handed to `tokio-postgres` as a binary parameter.

use crate::reverse::ConversionError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dtype_core::kinds::parse_datetime;
use dtype_core::values::is_safe_integer;
use dtype_core::{Descriptor, TypeId, Value};
use postgres_types::ToSql;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

/// PostgreSQL value wrapper for type-safe parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub enum PostgreSQLValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// Decimal value
    Decimal(Decimal),
    /// Text sent as is; the statement casts it when the column needs it
    Text(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// UUID value
    Uuid(Uuid),
    /// Date value (no time)
    Date(NaiveDate),
    /// Time value (no date)
    Time(NaiveTime),
    /// Timestamp with timezone
    TimestampTz(DateTime<Utc>),
    /// JSON value
    Json(serde_json::Value),
    /// Array of text values (PostgreSQL text[])
    TextArray(Vec<Option<String>>),
    /// Array of i32 values (PostgreSQL integer[])
    Int32Array(Vec<Option<i32>>),
    /// Array of i64 values (PostgreSQL bigint[])
    Int64Array(Vec<Option<i64>>),
    /// Array of f64 values (PostgreSQL double precision[])
    Float64Array(Vec<Option<f64>>),
    /// Array of boolean values (PostgreSQL boolean[])
    BoolArray(Vec<Option<bool>>),
}

fn mismatch(expected: &str, actual: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) if is_safe_integer(*n) => Some(*n as i64),
        Value::BigInt(i) => i64::try_from(*i).ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn convert_scalar(d: &Descriptor, value: Value) -> Result<PostgreSQLValue, ConversionError> {
    let type_id = d.type_id();
    let converted = match (type_id, &value) {
        (_, Value::Null) => PostgreSQLValue::Null,
        (TypeId::Boolean, Value::Bool(b)) => PostgreSQLValue::Bool(*b),
        (TypeId::TinyInt | TypeId::SmallInt, v) => {
            let i = as_i64(v).ok_or_else(|| mismatch("int16", v))?;
            PostgreSQLValue::Int16(i16::try_from(i).map_err(|_| mismatch("int16", v))?)
        }
        (TypeId::MediumInt | TypeId::Integer, v) => {
            let i = as_i64(v).ok_or_else(|| mismatch("int32", v))?;
            PostgreSQLValue::Int32(i32::try_from(i).map_err(|_| mismatch("int32", v))?)
        }
        (TypeId::BigInt, v) => {
            PostgreSQLValue::Int64(as_i64(v).ok_or_else(|| mismatch("int64", v))?)
        }
        (TypeId::Float | TypeId::Real, v) => {
            PostgreSQLValue::Float32(as_f64(v).ok_or_else(|| mismatch("float32", v))? as f32)
        }
        (TypeId::Double, v) => {
            PostgreSQLValue::Float64(as_f64(v).ok_or_else(|| mismatch("float64", v))?)
        }
        (TypeId::Decimal, Value::String(s)) => match Decimal::from_str(s) {
            Ok(dec) => PostgreSQLValue::Decimal(dec),
            // NaN and the infinities have no rust_decimal representation
            Err(_) => PostgreSQLValue::Text(s.clone()),
        },
        (TypeId::Uuid, Value::String(s)) => PostgreSQLValue::Uuid(Uuid::parse_str(s)?),
        (TypeId::Date, Value::String(s)) => match parse_datetime(s, &d.timezone()) {
            Some(dt) => PostgreSQLValue::TimestampTz(dt.with_timezone(&Utc)),
            None => PostgreSQLValue::Text(s.clone()),
        },
        (TypeId::DateOnly, Value::String(s)) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(date) => PostgreSQLValue::Date(date),
            Err(_) => PostgreSQLValue::Text(s.clone()),
        },
        (TypeId::Time, Value::String(s)) => match NaiveTime::parse_from_str(s, "%H:%M:%S%.f") {
            Ok(time) => PostgreSQLValue::Time(time),
            Err(_) => PostgreSQLValue::Text(s.clone()),
        },
        (TypeId::Json | TypeId::Jsonb, Value::String(s)) => {
            PostgreSQLValue::Json(serde_json::from_str(s)?)
        }
        (_, Value::Bytes(b)) => PostgreSQLValue::Bytes(b.clone()),
        (_, Value::Bool(b)) => PostgreSQLValue::Bool(*b),
        (_, Value::Array(_)) => {
            return Err(ConversionError::UnsupportedType(format!(
                "{type_id} with a list value"
            )))
        }
        (_, other) => PostgreSQLValue::Text(other.as_text()),
    };
    Ok(converted)
}

fn convert_array(
    element: &Descriptor,
    items: Vec<Value>,
) -> Result<PostgreSQLValue, ConversionError> {
    fn collect<T>(
        items: Vec<Value>,
        mut f: impl FnMut(&Value) -> Option<T>,
        expected: &str,
    ) -> Result<Vec<Option<T>>, ConversionError> {
        items
            .iter()
            .map(|item| match item {
                Value::Null => Ok(None),
                other => f(other).map(Some).ok_or_else(|| mismatch(expected, other)),
            })
            .collect()
    }

    Ok(match element.type_id() {
        TypeId::Boolean => PostgreSQLValue::BoolArray(collect(
            items,
            |v| match v {
                Value::Bool(b) => Some(*b),
                _ => None,
            },
            "bool",
        )?),
        TypeId::TinyInt | TypeId::SmallInt | TypeId::MediumInt | TypeId::Integer => {
            PostgreSQLValue::Int32Array(collect(
                items,
                |v| as_i64(v).and_then(|i| i32::try_from(i).ok()),
                "int32",
            )?)
        }
        TypeId::BigInt => PostgreSQLValue::Int64Array(collect(items, as_i64, "int64")?),
        TypeId::Float | TypeId::Real | TypeId::Double => {
            PostgreSQLValue::Float64Array(collect(items, as_f64, "float64")?)
        }
        _ => PostgreSQLValue::TextArray(collect(items, |v| Some(v.as_text()), "text")?),
    })
}

impl PostgreSQLValue {
    /// Convert a host value for a column described by `descriptor`.
    ///
    /// The descriptor must be bound to the PostgreSQL dialect; the value goes
    /// through the same sanitize and transport steps as a bound parameter.
    pub fn from_descriptor(
        descriptor: &Descriptor,
        value: &Value,
    ) -> Result<Self, ConversionError> {
        if value.is_null() {
            return Ok(PostgreSQLValue::Null);
        }
        match descriptor.to_transport(value)? {
            Value::Array(items) if descriptor.type_id() == TypeId::Array => {
                let element = descriptor.element().ok_or_else(|| {
                    ConversionError::UnsupportedType("ARRAY without element".to_string())
                })?;
                convert_array(element, items)
            }
            transport => convert_scalar(descriptor, transport),
        }
    }

    /// Box the value as a `tokio-postgres` parameter.
    pub fn into_boxed_sql(self) -> Box<dyn ToSql + Sync + Send> {
        match self {
            PostgreSQLValue::Null => Box::new(None::<String>),
            PostgreSQLValue::Bool(b) => Box::new(b),
            PostgreSQLValue::Int16(i) => Box::new(i),
            PostgreSQLValue::Int32(i) => Box::new(i),
            PostgreSQLValue::Int64(i) => Box::new(i),
            PostgreSQLValue::Float32(f) => Box::new(f),
            PostgreSQLValue::Float64(f) => Box::new(f),
            PostgreSQLValue::Decimal(d) => Box::new(d),
            PostgreSQLValue::Text(s) => Box::new(s),
            PostgreSQLValue::Bytes(b) => Box::new(b),
            PostgreSQLValue::Uuid(u) => Box::new(u),
            PostgreSQLValue::Date(d) => Box::new(d),
            PostgreSQLValue::Time(t) => Box::new(t),
            PostgreSQLValue::TimestampTz(ts) => Box::new(ts),
            PostgreSQLValue::Json(j) => Box::new(j),
            PostgreSQLValue::TextArray(v) => Box::new(v),
            PostgreSQLValue::Int32Array(v) => Box::new(v),
            PostgreSQLValue::Int64Array(v) => Box::new(v),
            PostgreSQLValue::Float64Array(v) => Box::new(v),
            PostgreSQLValue::BoolArray(v) => Box::new(v),
        }
    }
}

/// Untyped conversion for values collected without a descriptor.
impl From<Value> for PostgreSQLValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => PostgreSQLValue::Null,
            Value::Bool(b) => PostgreSQLValue::Bool(b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                PostgreSQLValue::Int64(n as i64)
            }
            Value::Number(n) => PostgreSQLValue::Float64(n),
            Value::BigInt(i) => match i64::try_from(i) {
                Ok(i) => PostgreSQLValue::Int64(i),
                Err(_) => PostgreSQLValue::Text(i.to_string()),
            },
            Value::Decimal(d) => PostgreSQLValue::Decimal(d),
            Value::Bytes(b) => PostgreSQLValue::Bytes(b),
            Value::DateTime(dt) => PostgreSQLValue::TimestampTz(dt.with_timezone(&Utc)),
            Value::Date(d) => PostgreSQLValue::Date(d),
            Value::Uuid(u) => PostgreSQLValue::Uuid(u),
            Value::Json(j) => PostgreSQLValue::Json(j),
            other => PostgreSQLValue::Text(other.as_text()),
        }
    }
}
