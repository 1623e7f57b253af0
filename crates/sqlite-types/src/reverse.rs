//! Reverse conversion: SQLite value → descriptor value
//!
//! SQLite hands back one of five storage classes regardless of the declared
//! column type. The class is mapped onto a raw storage [`Value`] and then
//! parsed by the column descriptor.

use crate::forward::SQLiteValue;
use dtype_core::values::MAX_SAFE_INTEGER;
use dtype_core::{Descriptor, TypeError, TypeId, Value};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Error during SQLite value conversion.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: StorageClass,
        actual: StorageClass,
    },
    #[error("Integer {0} does not fit in a 64-bit SQLite integer")]
    IntegerOverflow(String),
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// The five SQLite storage classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    pub fn name(&self) -> &'static str {
        match self {
            StorageClass::Null => "NULL",
            StorageClass::Integer => "INTEGER",
            StorageClass::Real => "REAL",
            StorageClass::Text => "TEXT",
            StorageClass::Blob => "BLOB",
        }
    }

    /// Whether a value of class `actual` can be read from a column of this class.
    ///
    /// REAL columns convert integral values to INTEGER on disk.
    fn accepts(&self, actual: StorageClass) -> bool {
        *self == actual
            || actual == StorageClass::Null
            || (*self == StorageClass::Real && actual == StorageClass::Integer)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Descriptor whose storage type the column actually has.
pub fn storage_descriptor(descriptor: &Descriptor) -> &Descriptor {
    descriptor
        .fallback()
        .and_then(|f| f.replacement.as_ref())
        .unwrap_or(descriptor)
}

/// Storage class values of `descriptor` are written with.
pub fn storage_class_for(descriptor: &Descriptor) -> StorageClass {
    match storage_descriptor(descriptor).type_id() {
        t if t.is_integer() => StorageClass::Integer,
        TypeId::Float | TypeId::Real | TypeId::Double => StorageClass::Real,
        TypeId::Blob => StorageClass::Blob,
        _ => StorageClass::Text,
    }
}

impl SQLiteValue {
    pub fn storage_class(&self) -> StorageClass {
        match self {
            SQLiteValue::Null => StorageClass::Null,
            SQLiteValue::Integer(_) => StorageClass::Integer,
            SQLiteValue::Real(_) => StorageClass::Real,
            SQLiteValue::Text(_) => StorageClass::Text,
            SQLiteValue::Blob(_) => StorageClass::Blob,
        }
    }

    /// The raw storage value.
    pub fn to_storage_value(&self) -> Value {
        match self {
            SQLiteValue::Null => Value::Null,
            SQLiteValue::Integer(i) if i128::from(*i).abs() <= MAX_SAFE_INTEGER => {
                Value::Number(*i as f64)
            }
            SQLiteValue::Integer(i) => Value::BigInt(i128::from(*i)),
            SQLiteValue::Real(r) => Value::Number(*r),
            SQLiteValue::Text(s) => Value::String(s.clone()),
            SQLiteValue::Blob(b) => Value::Bytes(b.clone()),
        }
    }

    /// Host value for a column described by `descriptor`.
    pub fn read_value(&self, descriptor: &Descriptor) -> Result<Value, ConversionError> {
        let expected = storage_class_for(descriptor);
        let actual = self.storage_class();
        if !expected.accepts(actual) {
            debug!(
                expected = expected.name(),
                actual = actual.name(),
                "storage class does not match the descriptor"
            );
            return Err(ConversionError::TypeMismatch { expected, actual });
        }
        Ok(descriptor.parse_from_storage(self.to_storage_value())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::sqlite_dialect;
    use chrono::{TimeZone, Utc};
    use dtype_core::{DataType, TypeSystemOptions};
    use serde_json::json;

    fn bound(data_type: DataType) -> Descriptor {
        let dialect = sqlite_dialect(TypeSystemOptions::default());
        Descriptor::new(data_type)
            .specialize(&dialect)
            .unwrap()
            .into_owned()
    }

    #[test]
    fn test_storage_classes() {
        assert_eq!(storage_class_for(&bound(DataType::bigint())), StorageClass::Integer);
        assert_eq!(storage_class_for(&bound(DataType::boolean())), StorageClass::Integer);
        assert_eq!(storage_class_for(&bound(DataType::double())), StorageClass::Real);
        assert_eq!(storage_class_for(&bound(DataType::blob())), StorageClass::Blob);
        assert_eq!(storage_class_for(&bound(DataType::uuid())), StorageClass::Text);
        assert_eq!(storage_class_for(&bound(DataType::date())), StorageClass::Text);
    }

    #[test]
    fn test_read_boolean() {
        let d = bound(DataType::boolean());
        assert_eq!(SQLiteValue::Integer(1).read_value(&d).unwrap(), Value::Bool(true));
        assert_eq!(SQLiteValue::Integer(0).read_value(&d).unwrap(), Value::Bool(false));
        assert!(matches!(
            SQLiteValue::Integer(2).read_value(&d),
            Err(ConversionError::Type(_))
        ));
    }

    #[test]
    fn test_read_bigint_beyond_safe_range() {
        let d = bound(DataType::bigint());
        assert_eq!(
            SQLiteValue::Integer(i64::MAX).to_storage_value(),
            Value::BigInt(i128::from(i64::MAX))
        );
        assert!(SQLiteValue::Integer(i64::MAX).read_value(&d).is_ok());
    }

    #[test]
    fn test_real_accepts_integer_class() {
        let d = bound(DataType::double());
        assert_eq!(SQLiteValue::Integer(3).read_value(&d).unwrap(), Value::Number(3.0));
        assert_eq!(SQLiteValue::Real(0.5).read_value(&d).unwrap(), Value::Number(0.5));
    }

    #[test]
    fn test_read_textual_kinds() {
        let when = bound(DataType::date());
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        match SQLiteValue::Text("2024-03-01 08:30:00.000 +00:00".into())
            .read_value(&when)
            .unwrap()
        {
            Value::DateTime(dt) => assert_eq!(dt, expected),
            other => panic!("expected a date-time, got {other:?}"),
        }

        let day = bound(DataType::dateonly());
        assert_eq!(
            SQLiteValue::Text("2024-02-29".into()).read_value(&day).unwrap(),
            Value::from("2024-02-29")
        );

        let doc = bound(DataType::json());
        assert_eq!(
            SQLiteValue::Text(r#"{"a":1}"#.into()).read_value(&doc).unwrap(),
            Value::Json(json!({"a": 1}))
        );
    }

    #[test]
    fn test_null_passes_through() {
        let d = bound(DataType::integer());
        assert_eq!(SQLiteValue::Null.read_value(&d).unwrap(), Value::Null);
    }

    #[test]
    fn test_mismatched_class_is_rejected() {
        let d = bound(DataType::integer());
        let err = SQLiteValue::Text("12".into()).read_value(&d).unwrap_err();
        assert_eq!(err.to_string(), "Type mismatch: expected INTEGER, got TEXT");
        let blob = bound(DataType::blob());
        assert!(SQLiteValue::Blob(vec![1]).read_value(&blob).is_ok());
        assert!(SQLiteValue::Integer(1).read_value(&blob).is_err());
    }
}
