//! Reverse conversion: MySQL value → descriptor value
//!
//! Values read through `mysql_async` are first turned into the raw storage
//! [`Value`] according to the column metadata, then handed to the column
//! descriptor's `parse_from_storage`.
//!
//! Spatial columns are expected to be selected through `ST_AsGeoJSON(...)`;
//! raw WKB is rejected as an invalid storage value.

use chrono::NaiveDate;
use dtype_core::values::MAX_SAFE_INTEGER;
use dtype_core::{Descriptor, TypeError, TypeId, Value};
use mysql_async::consts::{ColumnFlags, ColumnType};
use mysql_async::Value as MyValue;
use thiserror::Error;
use tracing::debug;

/// Error during MySQL value conversion.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Unsupported MySQL type: {0:?}")]
    UnsupportedType(ColumnType),
    #[error("Type mismatch: expected {expected}, got {actual:?}")]
    TypeMismatch { expected: String, actual: MyValue },
    #[error("Invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("Invalid date/time value")]
    InvalidDateTime,
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// MySQL value with the column metadata reported by the server.
#[derive(Debug, Clone)]
pub struct MySQLValueWithSchema {
    /// The raw MySQL value.
    pub value: MyValue,
    /// The MySQL column type.
    pub column_type: ColumnType,
    /// Column flags (e.g., UNSIGNED, BINARY).
    pub column_flags: ColumnFlags,
}

/// Descriptor whose storage type the column actually has.
pub fn storage_descriptor(descriptor: &Descriptor) -> &Descriptor {
    descriptor
        .fallback()
        .and_then(|f| f.replacement.as_ref())
        .unwrap_or(descriptor)
}

/// Column type MySQL reports for a column of `descriptor`.
pub fn column_type_for(descriptor: &Descriptor) -> Option<ColumnType> {
    use ColumnType::*;
    let column_type = match storage_descriptor(descriptor).type_id() {
        TypeId::TinyInt => MYSQL_TYPE_TINY,
        TypeId::SmallInt => MYSQL_TYPE_SHORT,
        TypeId::MediumInt => MYSQL_TYPE_INT24,
        TypeId::Integer => MYSQL_TYPE_LONG,
        TypeId::BigInt => MYSQL_TYPE_LONGLONG,
        TypeId::Float => MYSQL_TYPE_FLOAT,
        TypeId::Real | TypeId::Double => MYSQL_TYPE_DOUBLE,
        TypeId::Decimal => MYSQL_TYPE_NEWDECIMAL,
        TypeId::String => MYSQL_TYPE_VAR_STRING,
        // ENUM columns are reported as strings with the ENUM flag
        TypeId::Char | TypeId::Enum => MYSQL_TYPE_STRING,
        TypeId::Text | TypeId::Citext | TypeId::Blob => MYSQL_TYPE_BLOB,
        TypeId::Date => MYSQL_TYPE_DATETIME,
        TypeId::DateOnly => MYSQL_TYPE_DATE,
        TypeId::Time => MYSQL_TYPE_TIME,
        TypeId::Json => MYSQL_TYPE_JSON,
        _ => return None,
    };
    Some(column_type)
}

fn family(column_type: ColumnType) -> ColumnType {
    use ColumnType::*;
    match column_type {
        MYSQL_TYPE_TINY_BLOB | MYSQL_TYPE_MEDIUM_BLOB | MYSQL_TYPE_LONG_BLOB => MYSQL_TYPE_BLOB,
        MYSQL_TYPE_VARCHAR => MYSQL_TYPE_VAR_STRING,
        MYSQL_TYPE_DECIMAL => MYSQL_TYPE_NEWDECIMAL,
        MYSQL_TYPE_DATETIME2 | MYSQL_TYPE_TIMESTAMP | MYSQL_TYPE_TIMESTAMP2 => MYSQL_TYPE_DATETIME,
        MYSQL_TYPE_TIME2 => MYSQL_TYPE_TIME,
        MYSQL_TYPE_NEWDATE => MYSQL_TYPE_DATE,
        other => other,
    }
}

fn integer_value(i: i128) -> Value {
    if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&i) {
        Value::Number(i as f64)
    } else {
        Value::BigInt(i)
    }
}

impl MySQLValueWithSchema {
    /// Create a new MySQLValueWithSchema.
    pub fn new(value: MyValue, column_type: ColumnType, column_flags: ColumnFlags) -> Self {
        Self {
            value,
            column_type,
            column_flags,
        }
    }

    fn is_binary(&self) -> bool {
        self.column_flags.contains(ColumnFlags::BINARY_FLAG)
    }

    fn mismatch(&self, expected: &str) -> ConversionError {
        ConversionError::TypeMismatch {
            expected: expected.to_string(),
            actual: self.value.clone(),
        }
    }

    /// The raw storage value, shaped by the column metadata.
    pub fn to_storage_value(&self) -> Result<Value, ConversionError> {
        use ColumnType::*;

        if matches!(self.value, MyValue::NULL) {
            return Ok(Value::Null);
        }

        match self.column_type {
            MYSQL_TYPE_TINY | MYSQL_TYPE_SHORT | MYSQL_TYPE_INT24 | MYSQL_TYPE_LONG
            | MYSQL_TYPE_LONGLONG | MYSQL_TYPE_YEAR => self.extract_int().map(integer_value),

            MYSQL_TYPE_FLOAT | MYSQL_TYPE_DOUBLE => self.extract_float().map(Value::Number),

            // Kept textual so no precision is lost
            MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL => self.extract_string().map(Value::String),

            MYSQL_TYPE_STRING | MYSQL_TYPE_VAR_STRING | MYSQL_TYPE_VARCHAR | MYSQL_TYPE_ENUM
            | MYSQL_TYPE_SET | MYSQL_TYPE_TINY_BLOB | MYSQL_TYPE_MEDIUM_BLOB
            | MYSQL_TYPE_BLOB | MYSQL_TYPE_LONG_BLOB => {
                if self.is_binary() {
                    self.extract_bytes().map(Value::Bytes)
                } else {
                    self.extract_string().map(Value::String)
                }
            }

            MYSQL_TYPE_JSON => self.extract_string().map(Value::String),

            MYSQL_TYPE_DATE | MYSQL_TYPE_NEWDATE => match &self.value {
                MyValue::Date(year, month, day, ..) => {
                    NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                        .map(Value::Date)
                        .ok_or(ConversionError::InvalidDateTime)
                }
                _ => self.extract_string().map(Value::String),
            },

            // Wall-clock text, read in the configured time zone by the descriptor
            MYSQL_TYPE_DATETIME | MYSQL_TYPE_DATETIME2 | MYSQL_TYPE_TIMESTAMP
            | MYSQL_TYPE_TIMESTAMP2 => match &self.value {
                MyValue::Date(year, month, day, hour, minute, second, micros) => {
                    Ok(Value::String(format!(
                        "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
                    )))
                }
                _ => self.extract_string().map(Value::String),
            },

            MYSQL_TYPE_TIME | MYSQL_TYPE_TIME2 => match &self.value {
                MyValue::Time(negative, days, hours, minutes, seconds, micros) => {
                    let hours = days * 24 + u32::from(*hours);
                    let sign = if *negative { "-" } else { "" };
                    Ok(Value::String(format!(
                        "{sign}{hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
                    )))
                }
                _ => self.extract_string().map(Value::String),
            },

            MYSQL_TYPE_BIT | MYSQL_TYPE_GEOMETRY => self.extract_bytes().map(Value::Bytes),

            other => Err(ConversionError::UnsupportedType(other)),
        }
    }

    /// Host value for a column described by `descriptor`.
    pub fn read_value(&self, descriptor: &Descriptor) -> Result<Value, ConversionError> {
        if let Some(expected) = column_type_for(descriptor) {
            if family(expected) != family(self.column_type) {
                debug!(
                    expected = ?expected,
                    actual = ?self.column_type,
                    "column type does not match the descriptor"
                );
                return Err(self.mismatch(&format!("{expected:?}")));
            }
        }
        let raw = match self.to_storage_value()? {
            // Binary collations report the binary flag on textual columns
            Value::Bytes(bytes) if is_textual(storage_descriptor(descriptor).type_id()) => {
                Value::String(String::from_utf8(bytes)?)
            }
            other => other,
        };
        Ok(descriptor.parse_from_storage(raw)?)
    }

    fn extract_int(&self) -> Result<i128, ConversionError> {
        match &self.value {
            MyValue::Int(i) => Ok(i128::from(*i)),
            MyValue::UInt(u) => Ok(i128::from(*u)),
            MyValue::Bytes(b) => {
                let s = String::from_utf8(b.clone())?;
                s.trim().parse().map_err(|_| self.mismatch("integer"))
            }
            _ => Err(self.mismatch("integer")),
        }
    }

    fn extract_float(&self) -> Result<f64, ConversionError> {
        match &self.value {
            MyValue::Float(f) => Ok(f64::from(*f)),
            MyValue::Double(d) => Ok(*d),
            MyValue::Int(i) => Ok(*i as f64),
            MyValue::UInt(u) => Ok(*u as f64),
            MyValue::Bytes(b) => {
                let s = String::from_utf8(b.clone())?;
                s.trim().parse().map_err(|_| self.mismatch("float"))
            }
            _ => Err(self.mismatch("float")),
        }
    }

    fn extract_string(&self) -> Result<String, ConversionError> {
        match &self.value {
            MyValue::Bytes(b) => Ok(String::from_utf8(b.clone())?),
            MyValue::Int(i) => Ok(i.to_string()),
            MyValue::UInt(u) => Ok(u.to_string()),
            MyValue::Float(f) => Ok(f.to_string()),
            MyValue::Double(d) => Ok(d.to_string()),
            _ => Err(self.mismatch("string")),
        }
    }

    fn extract_bytes(&self) -> Result<Vec<u8>, ConversionError> {
        match &self.value {
            MyValue::Bytes(b) => Ok(b.clone()),
            _ => Err(self.mismatch("bytes")),
        }
    }
}

fn is_textual(type_id: TypeId) -> bool {
    matches!(
        type_id,
        TypeId::String
            | TypeId::Char
            | TypeId::Text
            | TypeId::Citext
            | TypeId::Enum
            | TypeId::Json
            | TypeId::Decimal
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::mysql_dialect;
    use chrono::{DateTime, FixedOffset};
    use dtype_core::types::StringOptions;
    use dtype_core::{DataType, TypeSystemOptions};
    use serde_json::json;

    fn bound(data_type: DataType) -> Descriptor {
        let dialect = mysql_dialect(TypeSystemOptions::default());
        Descriptor::new(data_type)
            .specialize(&dialect)
            .unwrap()
            .into_owned()
    }

    fn text(s: &str) -> MyValue {
        MyValue::Bytes(s.as_bytes().to_vec())
    }

    #[test]
    fn test_int_conversion() {
        let mv = MySQLValueWithSchema::new(
            MyValue::Int(42),
            ColumnType::MYSQL_TYPE_LONG,
            ColumnFlags::empty(),
        );
        assert_eq!(mv.to_storage_value().unwrap(), Value::from(42));
        assert_eq!(
            mv.read_value(&bound(DataType::integer())).unwrap(),
            Value::from(42)
        );
    }

    #[test]
    fn test_bigint_conversion() {
        let mv = MySQLValueWithSchema::new(
            MyValue::UInt(u64::MAX),
            ColumnType::MYSQL_TYPE_LONGLONG,
            ColumnFlags::UNSIGNED_FLAG,
        );
        assert_eq!(
            mv.read_value(&bound(DataType::bigint())).unwrap(),
            Value::from("18446744073709551615")
        );
    }

    #[test]
    fn test_boolean_from_tinyint() {
        let mv = MySQLValueWithSchema::new(
            MyValue::Int(1),
            ColumnType::MYSQL_TYPE_TINY,
            ColumnFlags::empty(),
        );
        assert_eq!(
            mv.read_value(&bound(DataType::boolean())).unwrap(),
            Value::Bool(true)
        );
        let bit = MySQLValueWithSchema::new(
            MyValue::Bytes(vec![0]),
            ColumnType::MYSQL_TYPE_BIT,
            ColumnFlags::empty(),
        );
        assert_eq!(bit.to_storage_value().unwrap(), Value::Bytes(vec![0]));
    }

    #[test]
    fn test_string_conversion() {
        let mv = MySQLValueWithSchema::new(
            text("hello"),
            ColumnType::MYSQL_TYPE_VAR_STRING,
            ColumnFlags::empty(),
        );
        assert_eq!(
            mv.read_value(&bound(DataType::string(20))).unwrap(),
            Value::from("hello")
        );
    }

    #[test]
    fn test_binary_collation_string_is_decoded() {
        let mv = MySQLValueWithSchema::new(
            text("Case"),
            ColumnType::MYSQL_TYPE_VARCHAR,
            ColumnFlags::BINARY_FLAG,
        );
        let d = bound(DataType::String(StringOptions {
            length: 10,
            binary: true,
        }));
        assert_eq!(mv.read_value(&d).unwrap(), Value::from("Case"));
    }

    #[test]
    fn test_uuid_conversion() {
        let id = uuid::Uuid::new_v4();
        let mv = MySQLValueWithSchema::new(
            text(&id.to_string()),
            ColumnType::MYSQL_TYPE_STRING,
            ColumnFlags::BINARY_FLAG,
        );
        assert_eq!(
            mv.read_value(&bound(DataType::uuid())).unwrap(),
            Value::from(id.hyphenated().to_string())
        );
    }

    #[test]
    fn test_datetime_conversion() {
        let mv = MySQLValueWithSchema::new(
            MyValue::Date(2024, 1, 15, 10, 30, 45, 500_000),
            ColumnType::MYSQL_TYPE_DATETIME,
            ColumnFlags::empty(),
        );
        assert_eq!(
            mv.to_storage_value().unwrap(),
            Value::from("2024-01-15 10:30:45.500000")
        );
        let expected: DateTime<FixedOffset> =
            DateTime::parse_from_rfc3339("2024-01-15T10:30:45.5Z").unwrap();
        assert_eq!(
            mv.read_value(&bound(DataType::date())).unwrap(),
            Value::DateTime(expected)
        );
    }

    #[test]
    fn test_date_and_time_conversion() {
        let date = MySQLValueWithSchema::new(
            MyValue::Date(2024, 2, 29, 0, 0, 0, 0),
            ColumnType::MYSQL_TYPE_DATE,
            ColumnFlags::empty(),
        );
        assert_eq!(
            date.read_value(&bound(DataType::dateonly())).unwrap(),
            Value::from("2024-02-29")
        );

        let time = MySQLValueWithSchema::new(
            MyValue::Time(false, 1, 2, 3, 4, 0),
            ColumnType::MYSQL_TYPE_TIME,
            ColumnFlags::empty(),
        );
        assert_eq!(
            time.to_storage_value().unwrap(),
            Value::from("26:03:04.000000")
        );
    }

    #[test]
    fn test_null_conversion() {
        let mv = MySQLValueWithSchema::new(
            MyValue::NULL,
            ColumnType::MYSQL_TYPE_LONG,
            ColumnFlags::empty(),
        );
        assert_eq!(mv.read_value(&bound(DataType::integer())).unwrap(), Value::Null);
    }

    #[test]
    fn test_json_conversion() {
        let mv = MySQLValueWithSchema::new(
            text(r#"{"name": "test", "tags": [1, 2]}"#),
            ColumnType::MYSQL_TYPE_JSON,
            ColumnFlags::BINARY_FLAG,
        );
        assert_eq!(
            mv.read_value(&bound(DataType::json())).unwrap(),
            Value::Json(json!({"name": "test", "tags": [1, 2]}))
        );
    }

    #[test]
    fn test_decimal_conversion() {
        let mv = MySQLValueWithSchema::new(
            text("123.45"),
            ColumnType::MYSQL_TYPE_NEWDECIMAL,
            ColumnFlags::empty(),
        );
        assert_eq!(
            mv.read_value(&bound(DataType::decimal(10, 2).unwrap()))
                .unwrap(),
            Value::from("123.45")
        );
    }

    #[test]
    fn test_blob_conversion() {
        let mv = MySQLValueWithSchema::new(
            MyValue::Bytes(vec![0xde, 0xad]),
            ColumnType::MYSQL_TYPE_BLOB,
            ColumnFlags::BINARY_FLAG,
        );
        assert_eq!(
            mv.read_value(&bound(DataType::blob())).unwrap(),
            Value::Bytes(vec![0xde, 0xad])
        );
    }

    #[test]
    fn test_text_conversion() {
        let mv = MySQLValueWithSchema::new(
            text("long text"),
            ColumnType::MYSQL_TYPE_BLOB,
            ColumnFlags::empty(),
        );
        assert_eq!(
            mv.read_value(&bound(DataType::text())).unwrap(),
            Value::from("long text")
        );
    }

    #[test]
    fn test_column_type_mismatch() {
        let mv = MySQLValueWithSchema::new(
            text("abc"),
            ColumnType::MYSQL_TYPE_VAR_STRING,
            ColumnFlags::empty(),
        );
        let err = mv.read_value(&bound(DataType::integer())).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));
    }

    #[test]
    fn test_invalid_storage_value() {
        let mv = MySQLValueWithSchema::new(
            text("not a date"),
            ColumnType::MYSQL_TYPE_DATETIME,
            ColumnFlags::empty(),
        );
        assert!(matches!(
            mv.read_value(&bound(DataType::date())),
            Err(ConversionError::Type(TypeError::InvalidStorageValue { .. }))
        ));
    }
}
