//! Forward conversion: descriptor value → MySQL parameter
//!
//! The descriptor's transport value is mapped onto the `mysql_async::Value`
//! variant the binary protocol expects for the column's storage type.

use crate::reverse::{storage_descriptor, ConversionError};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use dtype_core::{Descriptor, TypeId, Value};
use mysql_async::Value as MyValue;

/// MySQL value wrapper for type-safe conversions.
#[derive(Debug, Clone, PartialEq)]
pub struct MySQLValue(pub MyValue);

impl MySQLValue {
    /// Get the inner mysql_async::Value.
    pub fn into_inner(self) -> MyValue {
        self.0
    }

    /// Get a reference to the inner value.
    pub fn as_inner(&self) -> &MyValue {
        &self.0
    }

    /// Validate and convert `value` for a column described by `descriptor`.
    ///
    /// The descriptor must be bound to the MySQL dialect.
    pub fn from_descriptor(descriptor: &Descriptor, value: &Value) -> Result<Self, ConversionError> {
        if value.is_null() && !descriptor.accepts_null_sentinel() {
            return Ok(MySQLValue(MyValue::NULL));
        }
        descriptor.validate(value)?;
        let transport = descriptor.to_transport(value)?;
        let storage = storage_descriptor(descriptor).type_id();
        convert(storage, transport).map(MySQLValue)
    }
}

fn mismatch(expected: &str, actual: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected: expected.to_string(),
        actual: MyValue::Bytes(actual.as_text().into_bytes()),
    }
}

fn datetime_value(dt: &NaiveDateTime) -> MyValue {
    MyValue::Date(
        dt.year() as u16,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
        dt.nanosecond() / 1000,
    )
}

fn convert(storage: TypeId, transport: Value) -> Result<MyValue, ConversionError> {
    let converted = match (storage, transport) {
        (_, Value::Null) => MyValue::NULL,

        (TypeId::Date, Value::String(s)) => {
            let dt = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|_| ConversionError::InvalidDateTime)?;
            datetime_value(&dt)
        }
        (TypeId::DateOnly, Value::String(s)) => {
            let date = NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|_| ConversionError::InvalidDateTime)?;
            MyValue::Date(date.year() as u16, date.month() as u8, date.day() as u8, 0, 0, 0, 0)
        }
        (TypeId::Time, Value::String(s)) => {
            let time = NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M"))
                .map_err(|_| ConversionError::InvalidDateTime)?;
            MyValue::Time(
                false,
                0,
                time.hour() as u8,
                time.minute() as u8,
                time.second() as u8,
                time.nanosecond() / 1000,
            )
        }

        (TypeId::Float, Value::Number(n)) => MyValue::Float(n as f32),
        (TypeId::Real | TypeId::Double, Value::Number(n)) => MyValue::Double(n),
        (t, Value::Number(n)) if t.is_integer() => {
            if n.fract() != 0.0 {
                return Err(mismatch("integer", &Value::Number(n)));
            }
            MyValue::Int(n as i64)
        }
        // BIGINT travels as a decimal string to keep its precision
        (t, Value::String(s)) if t.is_integer() => match s.parse::<i64>() {
            Ok(i) => MyValue::Int(i),
            Err(_) => match s.parse::<u64>() {
                Ok(u) => MyValue::UInt(u),
                Err(_) => return Err(mismatch("integer", &Value::String(s))),
            },
        },

        (_, Value::Bool(b)) => MyValue::Int(i64::from(b)),
        (_, Value::Number(n)) => MyValue::Double(n),
        (_, Value::BigInt(i)) => match i64::try_from(i) {
            Ok(i) => MyValue::Int(i),
            Err(_) => MyValue::Bytes(i.to_string().into_bytes()),
        },
        (_, Value::Bytes(b)) => MyValue::Bytes(b),
        (_, Value::String(s)) => MyValue::Bytes(s.into_bytes()),
        (_, other) => MyValue::Bytes(other.as_text().into_bytes()),
    };
    Ok(converted)
}

/// Convert a value without a descriptor, by its own shape.
impl From<Value> for MySQLValue {
    fn from(value: Value) -> Self {
        let converted = match value {
            Value::Null => MyValue::NULL,
            Value::Bool(b) => MyValue::Int(i64::from(b)),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                MyValue::Int(n as i64)
            }
            Value::Number(n) => MyValue::Double(n),
            Value::BigInt(i) => match i64::try_from(i) {
                Ok(i) => MyValue::Int(i),
                Err(_) => MyValue::Bytes(i.to_string().into_bytes()),
            },
            Value::Bytes(b) => MyValue::Bytes(b),
            Value::DateTime(dt) => datetime_value(&dt.naive_utc()),
            Value::Date(d) => {
                MyValue::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0)
            }
            Value::Json(j) => MyValue::Bytes(j.to_string().into_bytes()),
            other => MyValue::Bytes(other.as_text().into_bytes()),
        };
        MySQLValue(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::mysql_dialect;
    use dtype_core::types::{IntegerOptions, TimeOptions};
    use dtype_core::{DataType, TypeSystemOptions};
    use serde_json::json;

    fn bound(data_type: DataType) -> Descriptor {
        let dialect = mysql_dialect(TypeSystemOptions::default());
        Descriptor::new(data_type)
            .specialize(&dialect)
            .unwrap()
            .into_owned()
    }

    fn convert_with(data_type: DataType, value: Value) -> MyValue {
        MySQLValue::from_descriptor(&bound(data_type), &value)
            .unwrap()
            .into_inner()
    }

    #[test]
    fn test_bool_conversion() {
        assert_eq!(convert_with(DataType::boolean(), Value::Bool(true)), MyValue::Int(1));
        assert_eq!(convert_with(DataType::boolean(), Value::Bool(false)), MyValue::Int(0));
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(convert_with(DataType::integer(), Value::from("42")), MyValue::Int(42));
        assert_eq!(
            convert_with(DataType::bigint(), Value::from(i128::from(i64::MAX))),
            MyValue::Int(i64::MAX)
        );
        let unsigned = DataType::integer_of(
            TypeId::BigInt,
            IntegerOptions {
                unsigned: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            convert_with(unsigned, Value::from("18446744073709551615")),
            MyValue::UInt(u64::MAX)
        );
    }

    #[test]
    fn test_float_conversion() {
        assert_eq!(convert_with(DataType::float(), Value::from(1.5)), MyValue::Float(1.5));
        assert_eq!(convert_with(DataType::double(), Value::from("2.25")), MyValue::Double(2.25));
    }

    #[test]
    fn test_decimal_stays_textual() {
        let decimal = DataType::decimal(10, 2).unwrap();
        assert_eq!(
            convert_with(decimal, Value::from("123.45")),
            MyValue::Bytes(b"123.45".to_vec())
        );
    }

    #[test]
    fn test_datetime_conversion() {
        let value = Value::from("2024-01-15T10:30:45.123+00:00");
        assert_eq!(
            convert_with(DataType::Date(TimeOptions { precision: Some(3) }), value),
            MyValue::Date(2024, 1, 15, 10, 30, 45, 123_000)
        );
        assert_eq!(
            convert_with(DataType::dateonly(), Value::from("2024-02-29")),
            MyValue::Date(2024, 2, 29, 0, 0, 0, 0)
        );
        assert_eq!(
            convert_with(DataType::Time(TimeOptions::default()), Value::from("08:15:00")),
            MyValue::Time(false, 0, 8, 15, 0, 0)
        );
    }

    #[test]
    fn test_text_kinds_become_bytes() {
        assert_eq!(
            convert_with(DataType::string(20), Value::from("hello")),
            MyValue::Bytes(b"hello".to_vec())
        );
        let id = uuid::Uuid::new_v4();
        assert_eq!(
            convert_with(DataType::uuid(), Value::from(id)),
            MyValue::Bytes(id.hyphenated().to_string().into_bytes())
        );
        assert_eq!(
            convert_with(DataType::json(), Value::Json(json!({"a": [1, 2]}))),
            MyValue::Bytes(br#"{"a":[1,2]}"#.to_vec())
        );
        assert_eq!(
            convert_with(DataType::blob(), Value::Bytes(vec![0, 1, 2])),
            MyValue::Bytes(vec![0, 1, 2])
        );
    }

    #[test]
    fn test_null_conversion() {
        assert_eq!(convert_with(DataType::integer(), Value::Null), MyValue::NULL);
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let d = bound(DataType::integer());
        assert!(matches!(
            MySQLValue::from_descriptor(&d, &Value::from("abc")),
            Err(ConversionError::Type(_))
        ));
    }

    #[test]
    fn test_untyped_conversion() {
        assert_eq!(MySQLValue::from(Value::from(7)).into_inner(), MyValue::Int(7));
        assert_eq!(
            MySQLValue::from(Value::from(0.5)).into_inner(),
            MyValue::Double(0.5)
        );
        assert_eq!(
            MySQLValue::from(Value::from("x")).into_inner(),
            MyValue::Bytes(b"x".to_vec())
        );
    }
}
