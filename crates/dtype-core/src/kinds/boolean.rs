use crate::descriptor::{Descriptor, Specialization, TypeBehavior};
use crate::error::{Result, TypeError};
use crate::types::{DataType, IntegerOptions, TypeId};
use crate::values::Value;

/// BOOLEAN, stored as a small integer on engines without a native type.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) if *n == 1.0 => Some(true),
        Value::Number(n) if *n == 0.0 => Some(false),
        Value::BigInt(1) => Some(true),
        Value::BigInt(0) => Some(false),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Some(true),
            "false" | "f" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

impl TypeBehavior for BooleanType {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        let caps = spec.capabilities();
        if caps.boolean {
            return Ok(());
        }
        let ints = caps.ints;
        let replacement = if ints.tinyint {
            let length = ints.length.then_some(1);
            DataType::integer_of(
                TypeId::TinyInt,
                IntegerOptions {
                    length,
                    ..Default::default()
                },
            )?
        } else {
            DataType::integer_of(TypeId::SmallInt, IntegerOptions::default())?
        };
        let reason = format!(
            "{} has no BOOLEAN; storing 1 and 0 in an integer column",
            spec.dialect().name()
        );
        spec.fall_back(Some(replacement), None, reason);
        Ok(())
    }

    fn storage_type(&self, _d: &Descriptor) -> Result<String> {
        Ok("BOOLEAN".to_string())
    }

    fn validate(&self, _d: &Descriptor, value: &Value) -> Result<()> {
        match value {
            Value::Bool(_) => Ok(()),
            other => Err(TypeError::not_a_valid(other, "boolean")),
        }
    }

    fn sanitize(&self, _d: &Descriptor, value: Value) -> Result<Value> {
        Ok(match parse_bool(&value) {
            Some(b) => Value::Bool(b),
            None => value,
        })
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        let parsed = match &raw {
            Value::Bytes(bytes) if bytes.len() == 1 && bytes[0] <= 1 => Some(bytes[0] == 1),
            Value::Bytes(_) => None,
            other => parse_bool(other),
        };
        parsed
            .map(Value::Bool)
            .ok_or_else(|| TypeError::invalid_storage_value(d.type_id(), &raw))
    }

    fn to_transport(&self, d: &Descriptor, value: &Value) -> Result<Value> {
        let Some(b) = parse_bool(value) else {
            return Err(TypeError::not_a_valid(value, "boolean"));
        };
        Ok(if d.fallback().is_some() {
            Value::Number(if b { 1.0 } else { 0.0 })
        } else {
            Value::Bool(b)
        })
    }

    fn to_inline_literal(&self, d: &Descriptor, value: &Value) -> Result<String> {
        Ok(match self.to_transport(d, value)? {
            Value::Bool(true) => "true".to_string(),
            Value::Bool(false) => "false".to_string(),
            other => other.as_text(),
        })
    }

    fn are_equivalent(&self, _d: &Descriptor, a: &Value, b: &Value) -> bool {
        match (parse_bool(a), parse_bool(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::dialect::{CapabilityTable, IntegerCapabilities};
    use crate::error::TypeError;
    use crate::types::DataType;
    use crate::values::Value;

    fn no_boolean(ints: IntegerCapabilities) -> CapabilityTable {
        CapabilityTable {
            boolean: false,
            ints,
            ..Default::default()
        }
    }

    #[test]
    fn test_native_boolean() {
        let dialect = dialect_with(CapabilityTable::default());
        let d = bound(DataType::boolean(), &dialect);
        assert_eq!(d.describe_storage_type().unwrap(), "BOOLEAN");
        assert_eq!(d.to_transport(&Value::from("t")).unwrap(), Value::Bool(true));
        assert_eq!(d.to_inline_literal(&Value::Bool(false)).unwrap(), "false");
    }

    #[test]
    fn test_boolean_validation_is_strict_after_sanitize() {
        let d = crate::descriptor::Descriptor::new(DataType::boolean());
        assert!(d.validate(&Value::Bool(true)).is_ok());
        assert!(d.validate(&Value::from("yes")).is_err());
        assert_eq!(d.sanitize(Value::from("0")).unwrap(), Value::Bool(false));
        assert_eq!(d.sanitize(Value::from(1)).unwrap(), Value::Bool(true));
        assert_eq!(d.sanitize(Value::from("maybe")).unwrap(), Value::from("maybe"));
    }

    #[test]
    fn test_tinyint_fallback() {
        let dialect = dialect_with(no_boolean(IntegerCapabilities {
            tinyint: true,
            length: true,
            ..Default::default()
        }));
        let d = bound(DataType::boolean(), &dialect);
        assert_eq!(d.describe_storage_type().unwrap(), "TINYINT(1)");
        assert_eq!(d.to_transport(&Value::Bool(true)).unwrap(), Value::from(1));
        assert_eq!(d.to_inline_literal(&Value::Bool(false)).unwrap(), "0");
    }

    #[test]
    fn test_smallint_fallback() {
        let dialect = dialect_with(no_boolean(IntegerCapabilities::default()));
        let d = bound(DataType::boolean(), &dialect);
        assert_eq!(d.describe_storage_type().unwrap(), "SMALLINT");
    }

    #[test]
    fn test_parse_from_storage() {
        let d = crate::descriptor::Descriptor::new(DataType::boolean());
        assert_eq!(d.parse_from_storage(Value::from(1)).unwrap(), Value::Bool(true));
        assert_eq!(
            d.parse_from_storage(Value::Bytes(vec![0])).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(d.parse_from_storage(Value::Null).unwrap(), Value::Null);
        assert!(matches!(
            d.parse_from_storage(Value::from(7)).unwrap_err(),
            TypeError::InvalidStorageValue { .. }
        ));
    }
}
