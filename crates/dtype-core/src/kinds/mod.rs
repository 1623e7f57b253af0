//! Generic behaviors of every type kind.
//!
//! These are the behaviors a descriptor uses when its dialect registers no
//! override for the type identifier. Engine adapters reuse them, either by
//! delegating method by method or through [`StorageOverride`] when only the
//! storage type name differs.

mod binary;
mod boolean;
mod composite;
mod enumeration;
mod geometry;
mod json;
mod misc;
mod numeric;
mod string;
mod temporal;
mod virtual_type;

pub use binary::BlobType;
pub use boolean::BooleanType;
pub use composite::{normalize_range, ArrayType, RangeType};
pub use enumeration::EnumType;
pub use geometry::GeometryKind;
pub use json::{null_json_policy, JsonType};
pub use misc::{CidrType, HstoreType, InetType, MacAddrType, TsVectorType, UuidType};
pub use numeric::{DecimalType, FloatType, IntegerType};
pub use string::{CitextType, StringType, TextType};
pub use temporal::{parse_datetime, DateOnlyType, DateType, TimeType};
pub use virtual_type::VirtualType;

use crate::descriptor::{Descriptor, Specialization, TypeBehavior};
use crate::error::{Result, TypeError};
use crate::pipeline::BindCollector;
use crate::types::TypeId;
use crate::values::Value;
use std::sync::Arc;

/// Generic behavior registered for `type_id`.
pub fn generic_behavior(type_id: TypeId) -> Arc<dyn TypeBehavior> {
    match type_id {
        TypeId::String | TypeId::Char => Arc::new(StringType),
        TypeId::Text => Arc::new(TextType),
        TypeId::Citext => Arc::new(CitextType),
        TypeId::TinyInt
        | TypeId::SmallInt
        | TypeId::MediumInt
        | TypeId::Integer
        | TypeId::BigInt => Arc::new(IntegerType),
        TypeId::Float | TypeId::Real | TypeId::Double => Arc::new(FloatType),
        TypeId::Decimal => Arc::new(DecimalType),
        TypeId::Boolean => Arc::new(BooleanType),
        TypeId::Time => Arc::new(TimeType),
        TypeId::Date => Arc::new(DateType),
        TypeId::DateOnly => Arc::new(DateOnlyType),
        TypeId::Uuid => Arc::new(UuidType),
        TypeId::Json | TypeId::Jsonb => Arc::new(JsonType),
        TypeId::Hstore => Arc::new(HstoreType),
        TypeId::Blob => Arc::new(BlobType),
        TypeId::Enum => Arc::new(EnumType),
        TypeId::Array => Arc::new(ArrayType),
        TypeId::Range => Arc::new(RangeType),
        TypeId::Geometry | TypeId::Geography => Arc::new(GeometryKind),
        TypeId::Cidr => Arc::new(CidrType),
        TypeId::Inet => Arc::new(InetType),
        TypeId::MacAddr | TypeId::MacAddr8 => Arc::new(MacAddrType),
        TypeId::TsVector => Arc::new(TsVectorType),
        TypeId::Virtual => Arc::new(VirtualType),
    }
}

/// Lowercase kind name used in validation messages, e.g. `integer`.
pub(crate) fn kind_name(type_id: TypeId) -> String {
    type_id.as_str().to_ascii_lowercase()
}

pub(crate) fn unsupported_on(d: &Descriptor, type_name: impl Into<String>) -> TypeError {
    TypeError::UnsupportedType {
        dialect: d.dialect().map(|d| d.name().to_string()).unwrap_or_default(),
        type_name: type_name.into(),
    }
}

/// Generic behavior of a type whose storage type is spelled differently.
#[derive(Debug, Clone)]
pub struct StorageOverride {
    inner: Arc<dyn TypeBehavior>,
    render: fn(&Descriptor) -> Result<String>,
}

impl StorageOverride {
    pub fn new(type_id: TypeId, render: fn(&Descriptor) -> Result<String>) -> Self {
        Self {
            inner: generic_behavior(type_id),
            render,
        }
    }
}

impl TypeBehavior for StorageOverride {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        self.inner.check_supported(spec)
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        (self.render)(d)
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        self.inner.validate(d, value)
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        self.inner.sanitize(d, value)
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        self.inner.parse_from_storage(d, raw)
    }

    fn to_transport(&self, d: &Descriptor, value: &Value) -> Result<Value> {
        self.inner.to_transport(d, value)
    }

    fn to_inline_literal(&self, d: &Descriptor, value: &Value) -> Result<String> {
        self.inner.to_inline_literal(d, value)
    }

    fn bind_param_sql(
        &self,
        d: &Descriptor,
        value: &Value,
        params: &mut dyn BindCollector,
    ) -> Result<String> {
        self.inner.bind_param_sql(d, value, params)
    }

    fn accepts_null(&self, d: &Descriptor) -> bool {
        self.inner.accepts_null(d)
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        self.inner.are_equivalent(d, a, b)
    }

    fn dependent_ddl(&self, d: &Descriptor) -> Result<Option<String>> {
        self.inner.dependent_ddl(d)
    }
}
