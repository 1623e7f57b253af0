//! Forward conversion: descriptor value → SQLite parameter

use crate::reverse::{storage_class_for, ConversionError, StorageClass};
use dtype_core::{Descriptor, Value};

/// A value in one of SQLite's storage classes.
#[derive(Debug, Clone, PartialEq)]
pub enum SQLiteValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SQLiteValue {
    /// Validate and convert `value` for a column described by `descriptor`.
    ///
    /// The descriptor must be bound to the SQLite dialect.
    pub fn from_descriptor(descriptor: &Descriptor, value: &Value) -> Result<Self, ConversionError> {
        if value.is_null() && !descriptor.accepts_null_sentinel() {
            return Ok(SQLiteValue::Null);
        }
        descriptor.validate(value)?;
        let transport = descriptor.to_transport(value)?;
        convert(storage_class_for(descriptor), transport)
    }
}

fn integer(text: &str) -> Result<i64, ConversionError> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| ConversionError::IntegerOverflow(text.to_string()))
}

fn convert(class: StorageClass, transport: Value) -> Result<SQLiteValue, ConversionError> {
    let converted = match (class, transport) {
        (_, Value::Null) => SQLiteValue::Null,

        (StorageClass::Integer, Value::Number(n)) if n.fract() == 0.0 => {
            SQLiteValue::Integer(n as i64)
        }
        // BIGINT travels as a decimal string to keep its precision
        (StorageClass::Integer, Value::String(s)) => SQLiteValue::Integer(integer(&s)?),
        (StorageClass::Integer, Value::BigInt(i)) => SQLiteValue::Integer(
            i64::try_from(i).map_err(|_| ConversionError::IntegerOverflow(i.to_string()))?,
        ),
        (StorageClass::Real, Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(n) => SQLiteValue::Real(n),
            Err(_) => SQLiteValue::Text(s),
        },

        (_, Value::Bool(b)) => SQLiteValue::Integer(i64::from(b)),
        (_, Value::Number(n)) => SQLiteValue::Real(n),
        (_, Value::Bytes(b)) => SQLiteValue::Blob(b),
        (_, Value::String(s)) => SQLiteValue::Text(s),
        (_, other) => SQLiteValue::Text(other.as_text()),
    };
    Ok(converted)
}

/// Convert a value without a descriptor, by its own shape.
impl From<Value> for SQLiteValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SQLiteValue::Null,
            Value::Bool(b) => SQLiteValue::Integer(i64::from(b)),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                SQLiteValue::Integer(n as i64)
            }
            Value::Number(n) => SQLiteValue::Real(n),
            Value::BigInt(i) => match i64::try_from(i) {
                Ok(i) => SQLiteValue::Integer(i),
                Err(_) => SQLiteValue::Text(i.to_string()),
            },
            Value::Bytes(b) => SQLiteValue::Blob(b),
            Value::String(s) => SQLiteValue::Text(s),
            Value::Json(j) => SQLiteValue::Text(j.to_string()),
            other => SQLiteValue::Text(other.as_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::sqlite_dialect;
    use dtype_core::{DataType, TypeSystemOptions};
    use serde_json::json;

    fn bound(data_type: DataType) -> Descriptor {
        let dialect = sqlite_dialect(TypeSystemOptions::default());
        Descriptor::new(data_type)
            .specialize(&dialect)
            .unwrap()
            .into_owned()
    }

    fn convert_with(data_type: DataType, value: Value) -> SQLiteValue {
        SQLiteValue::from_descriptor(&bound(data_type), &value).unwrap()
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(convert_with(DataType::integer(), Value::from(42)), SQLiteValue::Integer(42));
        assert_eq!(convert_with(DataType::integer(), Value::from("7")), SQLiteValue::Integer(7));
        assert_eq!(
            convert_with(DataType::bigint(), Value::from(i128::from(i64::MIN))),
            SQLiteValue::Integer(i64::MIN)
        );
    }

    #[test]
    fn test_bigint_overflow() {
        let d = bound(DataType::bigint());
        let err = SQLiteValue::from_descriptor(&d, &Value::from("18446744073709551615")).unwrap_err();
        assert!(matches!(err, ConversionError::IntegerOverflow(_)));
    }

    #[test]
    fn test_boolean_conversion() {
        assert_eq!(convert_with(DataType::boolean(), Value::Bool(true)), SQLiteValue::Integer(1));
        assert_eq!(convert_with(DataType::boolean(), Value::Bool(false)), SQLiteValue::Integer(0));
    }

    #[test]
    fn test_real_conversion() {
        assert_eq!(convert_with(DataType::double(), Value::from(2.5)), SQLiteValue::Real(2.5));
        assert_eq!(convert_with(DataType::float(), Value::from(3)), SQLiteValue::Real(3.0));
    }

    #[test]
    fn test_textual_conversion() {
        assert_eq!(
            convert_with(DataType::string(10), Value::from("abc")),
            SQLiteValue::Text("abc".into())
        );
        assert_eq!(
            convert_with(DataType::json(), Value::Json(json!([1, "two"]))),
            SQLiteValue::Text(r#"[1,"two"]"#.into())
        );
        assert_eq!(
            convert_with(DataType::dateonly(), Value::from("2024-02-29")),
            SQLiteValue::Text("2024-02-29".into())
        );
        assert_eq!(
            convert_with(DataType::date(), Value::from("2024-03-01T08:30:00Z")),
            SQLiteValue::Text("2024-03-01 08:30:00.000 +00:00".into())
        );
    }

    #[test]
    fn test_blob_conversion() {
        assert_eq!(
            convert_with(DataType::blob(), Value::Bytes(vec![9, 8])),
            SQLiteValue::Blob(vec![9, 8])
        );
    }

    #[test]
    fn test_null_and_invalid() {
        assert_eq!(convert_with(DataType::text(), Value::Null), SQLiteValue::Null);
        let d = bound(DataType::integer());
        assert!(matches!(
            SQLiteValue::from_descriptor(&d, &Value::from(1.5)),
            Err(ConversionError::Type(_))
        ));
    }

    #[test]
    fn test_untyped_conversion() {
        assert_eq!(SQLiteValue::from(Value::from(7)), SQLiteValue::Integer(7));
        assert_eq!(SQLiteValue::from(Value::from(0.25)), SQLiteValue::Real(0.25));
        assert_eq!(SQLiteValue::from(Value::Bool(true)), SQLiteValue::Integer(1));
    }
}
