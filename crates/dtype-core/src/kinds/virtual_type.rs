use crate::descriptor::{Descriptor, Specialization, TypeBehavior};
use crate::error::{Result, TypeError};
use crate::pipeline::BindCollector;
use crate::types::DataType;
use crate::values::Value;

/// A computed attribute. It is never stored, so every storage-facing
/// operation fails; validation uses the declared return type when there is one.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualType;

fn return_type(d: &Descriptor) -> Option<&Descriptor> {
    match d.data_type() {
        DataType::Virtual(options) => options.return_type.as_deref(),
        _ => None,
    }
}

impl TypeBehavior for VirtualType {
    fn check_supported(&self, _spec: &mut Specialization<'_>) -> Result<()> {
        Ok(())
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        Err(TypeError::NoStorageType(d.type_id()))
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        match return_type(d) {
            Some(inner) => inner.validate(value),
            None => Ok(()),
        }
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        match return_type(d) {
            Some(inner) => inner.sanitize(value),
            None => Ok(value),
        }
    }

    fn to_transport(&self, d: &Descriptor, _value: &Value) -> Result<Value> {
        Err(TypeError::NoStorageType(d.type_id()))
    }

    fn to_inline_literal(&self, d: &Descriptor, _value: &Value) -> Result<String> {
        Err(TypeError::NoStorageType(d.type_id()))
    }

    fn bind_param_sql(
        &self,
        d: &Descriptor,
        _value: &Value,
        _params: &mut dyn BindCollector,
    ) -> Result<String> {
        Err(TypeError::NoStorageType(d.type_id()))
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        match return_type(d) {
            Some(inner) => inner.are_equivalent(a, b),
            None => a == b,
        }
    }
}
