use super::{kind_name, unsupported_on};
use crate::descriptor::{CheckConstraint, Descriptor, Specialization, TypeBehavior};
use crate::dialect::CitextSupport;
use crate::error::{Result, TypeError};
use crate::types::{DataType, TypeId};
use crate::values::Value;

/// STRING (`VARCHAR`) and CHAR.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl TypeBehavior for StringType {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        let type_id = spec.type_id();
        let (char_supported, collate_binary, blob) = {
            let caps = spec.capabilities();
            (caps.char, caps.collate_binary, caps.blob)
        };
        if type_id == TypeId::Char && !char_supported {
            return Err(spec.unsupported("CHAR"));
        }

        let Some(options) = spec.data_type.string_options().cloned() else {
            return Ok(());
        };
        if options.binary && !collate_binary {
            if !blob {
                return Err(spec.unsupported(format!("{type_id}.BINARY")));
            }
            let constraint = if type_id == TypeId::Char {
                CheckConstraint::ExactOctetLength(options.length)
            } else {
                CheckConstraint::MaxOctetLength(options.length)
            };
            let reason = format!(
                "{} has no binary {type_id}; using BLOB with an octet length check",
                spec.dialect().name()
            );
            spec.fall_back(Some(DataType::blob()), Some(constraint), reason);
        }
        Ok(())
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        let options = d.data_type().string_options().cloned().unwrap_or_default();
        let name = if d.type_id() == TypeId::Char {
            "CHAR"
        } else {
            "VARCHAR"
        };
        let binary = if options.binary { " BINARY" } else { "" };
        Ok(format!("{name}({}){binary}", options.length))
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        let binary = d.data_type().string_options().is_some_and(|o| o.binary);
        match value {
            Value::String(_) => Ok(()),
            Value::Bytes(_) if binary => Ok(()),
            other => Err(TypeError::not_a_valid(other, &kind_name(d.type_id()))),
        }
    }

    fn to_transport(&self, d: &Descriptor, value: &Value) -> Result<Value> {
        Ok(match value {
            // Stored in a BLOB column on this dialect
            Value::String(s) if d.fallback().is_some() => Value::Bytes(s.clone().into_bytes()),
            Value::String(_) | Value::Bytes(_) => value.clone(),
            other => Value::String(other.as_text()),
        })
    }
}

/// TEXT, optionally sized.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextType;

impl TypeBehavior for TextType {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        let length = match &*spec.data_type {
            DataType::Text(Some(length)) => *length,
            _ => return Ok(()),
        };
        if !spec.capabilities().text_lengths {
            let message = format!(
                "{} does not support TEXT with the {} length option. Plain TEXT is used instead.",
                spec.dialect().name(),
                length.as_str()
            );
            spec.warn(&message);
            *spec.data_type = DataType::Text(None);
        }
        Ok(())
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        Ok(match d.data_type() {
            DataType::Text(Some(length)) => format!("{}TEXT", length.sql_prefix()),
            _ => "TEXT".to_string(),
        })
    }

    fn validate(&self, _d: &Descriptor, value: &Value) -> Result<()> {
        match value {
            Value::String(_) => Ok(()),
            other => Err(TypeError::not_a_valid(other, "string")),
        }
    }
}

/// Case-insensitive text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CitextType;

impl TypeBehavior for CitextType {
    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        let dialect = d.require_dialect("describe_storage_type")?;
        match &dialect.capabilities().citext {
            CitextSupport::Native => Ok("CITEXT".to_string()),
            CitextSupport::Collation(collation) => Ok(format!("TEXT COLLATE {collation}")),
            CitextSupport::Unsupported => Err(unsupported_on(d, "CITEXT")),
        }
    }

    fn validate(&self, _d: &Descriptor, value: &Value) -> Result<()> {
        match value {
            Value::String(_) => Ok(()),
            other => Err(TypeError::not_a_valid(other, "string")),
        }
    }

    fn are_equivalent(&self, _d: &Descriptor, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::String(x), Value::String(y)) => x.to_lowercase() == y.to_lowercase(),
            _ => a == b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::descriptor::CheckConstraint;
    use crate::dialect::{CapabilityTable, CitextSupport};
    use crate::error::TypeError;
    use crate::types::{DataType, LengthClass, StringOptions};
    use crate::values::Value;

    fn binary_string(length: u32) -> DataType {
        DataType::String(StringOptions {
            length,
            binary: true,
        })
    }

    #[test]
    fn test_string_storage_and_validation() {
        let dialect = dialect_with(CapabilityTable::default());
        let d = bound(DataType::string(80), &dialect);
        assert_eq!(d.describe_storage_type().unwrap(), "VARCHAR(80)");
        assert!(d.validate(&Value::from("hello")).is_ok());
        let err = d.validate(&Value::from(5)).unwrap_err();
        assert_eq!(err.to_string(), "5 is not a valid string");
        assert!(d.validate(&Value::Bytes(vec![1])).is_err());
    }

    #[test]
    fn test_binary_string_with_native_collation() {
        let dialect = dialect_with(CapabilityTable {
            collate_binary: true,
            ..Default::default()
        });
        let d = bound(binary_string(16), &dialect);
        assert_eq!(d.describe_storage_type().unwrap(), "VARCHAR(16) BINARY");
        assert!(d.fallback().is_none());
        assert!(d.validate(&Value::Bytes(vec![1, 2])).is_ok());
    }

    #[test]
    fn test_binary_string_falls_back_to_blob() {
        let dialect = dialect_with(CapabilityTable::default());
        let d = bound(binary_string(16), &dialect);
        assert_eq!(d.describe_storage_type().unwrap(), "BLOB");
        let fallback = d.fallback().unwrap();
        assert_eq!(
            fallback.constraint,
            Some(CheckConstraint::MaxOctetLength(16))
        );
        assert_eq!(
            d.to_transport(&Value::from("ab")).unwrap(),
            Value::Bytes(b"ab".to_vec())
        );
        assert_eq!(d.to_inline_literal(&Value::from("ab")).unwrap(), "X'6162'");
    }

    #[test]
    fn test_binary_char_needs_some_binary_type() {
        let dialect = dialect_with(CapabilityTable {
            blob: false,
            ..Default::default()
        });
        let d = crate::descriptor::Descriptor::new(DataType::Char(StringOptions {
            length: 4,
            binary: true,
        }));
        let err = d.specialize(&dialect).unwrap_err();
        assert!(matches!(err, TypeError::UnsupportedType { .. }));
    }

    #[test]
    fn test_char_unsupported() {
        let dialect = dialect_with(CapabilityTable {
            char: false,
            ..Default::default()
        });
        let err = crate::descriptor::Descriptor::new(DataType::char(2))
            .specialize(&dialect)
            .unwrap_err();
        assert_eq!(err.to_string(), "test does not support the CHAR data type");
    }

    #[test]
    fn test_string_inline_literal_escapes_quotes() {
        let dialect = dialect_with(CapabilityTable::default());
        let d = bound(DataType::string(255), &dialect);
        assert_eq!(
            d.to_inline_literal(&Value::from("O'Brien")).unwrap(),
            "'O''Brien'"
        );
    }

    #[test]
    fn test_text_length_dropped_when_unsupported() {
        let dialect = dialect_with(CapabilityTable::default());
        let d = bound(DataType::Text(Some(LengthClass::Long)), &dialect);
        assert_eq!(d.describe_storage_type().unwrap(), "TEXT");
        assert_eq!(dialect.warning_count(), 1);

        let sized = dialect_with(CapabilityTable {
            text_lengths: true,
            ..Default::default()
        });
        let d = bound(DataType::Text(Some(LengthClass::Long)), &sized);
        assert_eq!(d.describe_storage_type().unwrap(), "LONGTEXT");
    }

    #[test]
    fn test_citext_variants() {
        let native = dialect_with(CapabilityTable {
            citext: CitextSupport::Native,
            ..Default::default()
        });
        assert_eq!(
            bound(DataType::Citext, &native)
                .describe_storage_type()
                .unwrap(),
            "CITEXT"
        );

        let collated = dialect_with(CapabilityTable {
            citext: CitextSupport::Collation("NOCASE".into()),
            ..Default::default()
        });
        let d = bound(DataType::Citext, &collated);
        assert_eq!(d.describe_storage_type().unwrap(), "TEXT COLLATE NOCASE");
        assert!(d.are_equivalent(&Value::from("Hello"), &Value::from("hELLO")));

        let none = dialect_with(CapabilityTable::default());
        assert!(crate::descriptor::Descriptor::new(DataType::Citext)
            .specialize(&none)
            .is_err());
    }
}
