use crate::descriptor::{Descriptor, Specialization, TypeBehavior};
use crate::error::{Result, TypeError};
use crate::types::DataType;
use crate::values::Value;

/// BLOB, optionally sized.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobType;

impl TypeBehavior for BlobType {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        if !spec.capabilities().blob {
            return Err(spec.unsupported("BLOB"));
        }
        let length = match &*spec.data_type {
            DataType::Blob(Some(length)) => *length,
            _ => return Ok(()),
        };
        if !spec.capabilities().blob_lengths {
            let message = format!(
                "{} does not support BLOB with the {} length option. Plain BLOB is used instead.",
                spec.dialect().name(),
                length.as_str()
            );
            spec.warn(&message);
            *spec.data_type = DataType::Blob(None);
        }
        Ok(())
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        Ok(match d.data_type() {
            DataType::Blob(Some(length)) => format!("{}BLOB", length.sql_prefix()),
            _ => "BLOB".to_string(),
        })
    }

    fn validate(&self, _d: &Descriptor, value: &Value) -> Result<()> {
        match value {
            Value::String(_) | Value::Bytes(_) => Ok(()),
            other => Err(TypeError::not_a_valid(other, "blob")),
        }
    }

    fn sanitize(&self, _d: &Descriptor, value: Value) -> Result<Value> {
        Ok(match value {
            Value::String(s) => Value::Bytes(s.into_bytes()),
            other => other,
        })
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        self.sanitize(d, raw)
    }

    fn to_transport(&self, _d: &Descriptor, value: &Value) -> Result<Value> {
        match value {
            Value::Bytes(_) => Ok(value.clone()),
            Value::String(s) => Ok(Value::Bytes(s.as_bytes().to_vec())),
            other => Err(TypeError::not_a_valid(other, "blob")),
        }
    }

    fn are_equivalent(&self, _d: &Descriptor, a: &Value, b: &Value) -> bool {
        let bytes = |v: &Value| match v {
            Value::Bytes(bytes) => Some(bytes.clone()),
            Value::String(s) => Some(s.as_bytes().to_vec()),
            _ => None,
        };
        match (bytes(a), bytes(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::descriptor::Descriptor;
    use crate::dialect::CapabilityTable;
    use crate::types::{DataType, LengthClass};
    use crate::values::Value;

    #[test]
    fn test_blob_sanitizes_strings_and_inlines_bytes() {
        let dialect = dialect_with(CapabilityTable::default());
        let d = bound(DataType::blob(), &dialect);
        assert_eq!(
            d.sanitize(Value::from("hi")).unwrap(),
            Value::Bytes(b"hi".to_vec())
        );
        assert_eq!(d.to_inline_literal(&Value::from("hi")).unwrap(), "X'6869'");
        assert!(d.validate(&Value::from(1)).is_err());
    }

    #[test]
    fn test_blob_lengths() {
        let plain = dialect_with(CapabilityTable::default());
        let d = bound(DataType::Blob(Some(LengthClass::Medium)), &plain);
        assert_eq!(d.describe_storage_type().unwrap(), "BLOB");
        assert_eq!(plain.warning_count(), 1);

        let sized = dialect_with(CapabilityTable {
            blob_lengths: true,
            ..Default::default()
        });
        let d = bound(DataType::Blob(Some(LengthClass::Tiny)), &sized);
        assert_eq!(d.describe_storage_type().unwrap(), "TINYBLOB");
    }

    #[test]
    fn test_blob_unsupported() {
        let dialect = dialect_with(CapabilityTable {
            blob: false,
            ..Default::default()
        });
        assert!(Descriptor::new(DataType::blob()).specialize(&dialect).is_err());
    }
}
