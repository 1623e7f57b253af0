//! Reverse conversion: PostgreSQL value → descriptor value
//!
//! Values read through `tokio-postgres` arrive as [`PostgreSQLRawValue`]
//! together with their wire [`Type`]. They are first turned into the raw
//! storage [`Value`] and then handed to the column descriptor's
//! `parse_from_storage`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use dtype_core::{Descriptor, TypeError, TypeId, Value};
use postgres_types::Type;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Errors that can occur while converting between PostgreSQL and host values.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The column type is not supported
    #[error("Unsupported PostgreSQL type: {0}")]
    UnsupportedType(String),

    /// A type mismatch occurred
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Invalid UUID format
    #[error("Invalid UUID: {0}")]
    UuidError(#[from] uuid::Error),

    /// Invalid JSON
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The descriptor rejected the value
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// PostgreSQL value with its wire type.
#[derive(Debug, Clone)]
pub struct PostgreSQLValueWithSchema {
    /// The PostgreSQL type reported for the column
    pub pg_type: Type,
    /// The decoded value
    pub value: PostgreSQLRawValue,
}

/// Raw value from PostgreSQL.
#[derive(Debug, Clone)]
pub enum PostgreSQLRawValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    /// Text format value, also used for types without a binary mapping
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Timestamp (no timezone)
    Timestamp(NaiveDateTime),
    /// Timestamp with timezone
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
    TextArray(Vec<Option<String>>),
    Int32Array(Vec<Option<i32>>),
    Int64Array(Vec<Option<i64>>),
    Float64Array(Vec<Option<f64>>),
    BoolArray(Vec<Option<bool>>),
}

fn array_of<T>(items: &[Option<T>], f: impl Fn(&T) -> Value) -> Value {
    Value::Array(
        items
            .iter()
            .map(|item| item.as_ref().map_or(Value::Null, &f))
            .collect(),
    )
}

/// Wire type a column of `descriptor` is read back as, when it is a built-in type.
///
/// Types PostgreSQL creates per database (enums, hstore, citext) have no fixed
/// OID and return `None`.
pub fn pg_type_for(descriptor: &Descriptor) -> Option<Type> {
    let descriptor = descriptor
        .fallback()
        .and_then(|f| f.replacement.as_ref())
        .unwrap_or(descriptor);
    let pg_type = match descriptor.type_id() {
        TypeId::Boolean => Type::BOOL,
        TypeId::TinyInt | TypeId::SmallInt => Type::INT2,
        TypeId::MediumInt | TypeId::Integer => Type::INT4,
        TypeId::BigInt => Type::INT8,
        TypeId::Float | TypeId::Real => Type::FLOAT4,
        TypeId::Double => Type::FLOAT8,
        TypeId::Decimal => Type::NUMERIC,
        TypeId::String => Type::VARCHAR,
        TypeId::Char => Type::BPCHAR,
        TypeId::Text => Type::TEXT,
        TypeId::Uuid => Type::UUID,
        TypeId::Date => Type::TIMESTAMPTZ,
        TypeId::DateOnly => Type::DATE,
        TypeId::Time => Type::TIME,
        TypeId::Json => Type::JSON,
        TypeId::Jsonb => Type::JSONB,
        TypeId::Blob => Type::BYTEA,
        TypeId::Inet => Type::INET,
        TypeId::Cidr => Type::CIDR,
        TypeId::MacAddr => Type::MACADDR,
        TypeId::MacAddr8 => Type::MACADDR8,
        TypeId::TsVector => Type::TS_VECTOR,
        TypeId::Array => match descriptor.element()?.type_id() {
            TypeId::Boolean => Type::BOOL_ARRAY,
            TypeId::Integer => Type::INT4_ARRAY,
            TypeId::BigInt => Type::INT8_ARRAY,
            TypeId::Double => Type::FLOAT8_ARRAY,
            TypeId::String => Type::VARCHAR_ARRAY,
            TypeId::Text => Type::TEXT_ARRAY,
            _ => return None,
        },
        _ => return None,
    };
    Some(pg_type)
}

impl PostgreSQLValueWithSchema {
    pub fn new(pg_type: Type, value: PostgreSQLRawValue) -> Self {
        Self { pg_type, value }
    }

    /// The raw storage value, checked against the wire type.
    pub fn to_storage_value(&self) -> Result<Value, ConversionError> {
        use PostgreSQLRawValue as Raw;

        let t = &self.pg_type;
        let value = match &self.value {
            Raw::Null => Value::Null,
            Raw::Bool(b) if *t == Type::BOOL => Value::Bool(*b),
            Raw::Int16(i) if *t == Type::INT2 => Value::Number(f64::from(*i)),
            Raw::Int32(i) if *t == Type::INT4 => Value::Number(f64::from(*i)),
            Raw::Int64(i) if *t == Type::INT8 => Value::BigInt(i128::from(*i)),
            Raw::Float32(f) if *t == Type::FLOAT4 => Value::Number(f64::from(*f)),
            Raw::Float64(f) if *t == Type::FLOAT8 => Value::Number(*f),
            Raw::Decimal(d) if *t == Type::NUMERIC => Value::Decimal(*d),
            Raw::Bytes(b) if *t == Type::BYTEA => Value::Bytes(b.clone()),
            Raw::Uuid(u) if *t == Type::UUID => Value::Uuid(*u),
            Raw::Date(d) if *t == Type::DATE => Value::Date(*d),
            Raw::Time(time) if *t == Type::TIME => {
                Value::String(time.format("%H:%M:%S%.f").to_string())
            }
            Raw::Timestamp(ts) if *t == Type::TIMESTAMP => {
                Value::String(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
            Raw::TimestampTz(ts) if *t == Type::TIMESTAMPTZ => Value::DateTime(ts.fixed_offset()),
            Raw::Json(j) if *t == Type::JSON || *t == Type::JSONB => Value::Json(j.clone()),
            Raw::TextArray(items) if *t == Type::TEXT_ARRAY || *t == Type::VARCHAR_ARRAY => {
                array_of(items, |s| Value::String(s.clone()))
            }
            Raw::Int32Array(items) if *t == Type::INT4_ARRAY => {
                array_of(items, |i| Value::Number(f64::from(*i)))
            }
            Raw::Int64Array(items) if *t == Type::INT8_ARRAY => {
                array_of(items, |i| Value::BigInt(i128::from(*i)))
            }
            Raw::Float64Array(items) if *t == Type::FLOAT8_ARRAY => {
                array_of(items, |f| Value::Number(*f))
            }
            Raw::BoolArray(items) if *t == Type::BOOL_ARRAY => array_of(items, |b| Value::Bool(*b)),
            // Text format covers ranges, hstore, enums and infinite timestamps
            Raw::Text(s) => Value::String(s.clone()),
            other => {
                return Err(ConversionError::TypeMismatch {
                    expected: t.name().to_string(),
                    actual: format!("{other:?}"),
                })
            }
        };
        Ok(value)
    }

    /// Host value for a column described by `descriptor`.
    pub fn read_value(&self, descriptor: &Descriptor) -> Result<Value, ConversionError> {
        if let Some(expected) = pg_type_for(descriptor) {
            let text = matches!(self.value, PostgreSQLRawValue::Text(_));
            if expected != self.pg_type && !text {
                debug!(
                    expected = expected.name(),
                    actual = self.pg_type.name(),
                    "column type does not match the descriptor"
                );
                return Err(ConversionError::TypeMismatch {
                    expected: expected.name().to_string(),
                    actual: self.pg_type.name().to_string(),
                });
            }
        }
        Ok(descriptor.parse_from_storage(self.to_storage_value()?)?)
    }
}
