use crate::descriptor::{CheckConstraint, Descriptor, Specialization, TypeBehavior};
use crate::error::{Result, TypeError};
use crate::types::DataType;
use crate::values::Value;

/// ENUM with an ordered list of members.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumType;

impl EnumType {
    pub(crate) fn members(d: &Descriptor) -> &[String] {
        match d.data_type() {
            DataType::Enum(options) => &options.values,
            _ => &[],
        }
    }
}

impl TypeBehavior for EnumType {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        if spec.capabilities().enums {
            return Ok(());
        }
        let values = match &*spec.data_type {
            DataType::Enum(options) => options.values.clone(),
            _ => return Ok(()),
        };
        let reason = format!(
            "{} has no native ENUM; using TEXT with a membership check",
            spec.dialect().name()
        );
        spec.fall_back(
            Some(DataType::text()),
            Some(CheckConstraint::OneOf(values)),
            reason,
        );
        Ok(())
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        let dialect = d.require_dialect("describe_storage_type")?;
        let members: Vec<String> = Self::members(d)
            .iter()
            .map(|m| dialect.escape_string(m))
            .collect();
        Ok(format!("ENUM({})", members.join(", ")))
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        let members = Self::members(d);
        if let Value::String(s) = value {
            if members.iter().any(|m| m == s) {
                return Ok(());
            }
        }
        let allowed: Vec<String> = members.iter().map(|m| format!("'{m}'")).collect();
        Err(TypeError::mismatch(
            value,
            format!(
                "{value} is not a valid choice for enum [{}]",
                allowed.join(", ")
            ),
        ))
    }
}
