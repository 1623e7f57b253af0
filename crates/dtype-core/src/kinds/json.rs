use crate::config::NullJsonStringification;
use crate::descriptor::{Descriptor, TypeBehavior};
use crate::error::{Result, TypeError};
use crate::types::{DataType, TypeId};
use crate::values::Value;

/// How a host `Null` written to this JSON descriptor is treated.
///
/// The descriptor's own option wins over the dialect-wide setting.
pub fn null_json_policy(d: &Descriptor) -> NullJsonStringification {
    let own = match d.data_type() {
        DataType::Json(options) | DataType::Jsonb(options) => options.null_json,
        _ => None,
    };
    own.or_else(|| d.dialect().map(|d| d.options().null_json_stringification))
        .unwrap_or_default()
}

/// JSON and JSONB documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonType;

impl TypeBehavior for JsonType {
    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        Ok(if d.type_id() == TypeId::Jsonb {
            "JSONB".to_string()
        } else {
            "JSON".to_string()
        })
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        if value.is_null() && null_json_policy(d) == NullJsonStringification::Explicit {
            return Err(TypeError::mismatch(
                value,
                "null is ambiguous for a JSON attribute: pass a JSON null document or an SQL NULL explicitly",
            ));
        }
        value
            .to_json()
            .map(|_| ())
            .map_err(|e| TypeError::mismatch(value, format!("{value} is not valid JSON: {e}")))
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        let parsed = match &raw {
            Value::Json(_) => return Ok(raw),
            Value::String(s) => serde_json::from_str(s).ok(),
            Value::Bytes(bytes) => serde_json::from_slice(bytes).ok(),
            _ => None,
        };
        parsed
            .map(Value::Json)
            .ok_or_else(|| TypeError::invalid_storage_value(d.type_id(), &raw))
    }

    fn to_transport(&self, _d: &Descriptor, value: &Value) -> Result<Value> {
        Ok(Value::String(value.to_json()?.to_string()))
    }

    fn accepts_null(&self, d: &Descriptor) -> bool {
        null_json_policy(d) != NullJsonStringification::Sql
    }

    fn are_equivalent(&self, _d: &Descriptor, a: &Value, b: &Value) -> bool {
        match (a.to_json(), b.to_json()) {
            (Ok(x), Ok(y)) => x == y,
            _ => a == b,
        }
    }
}
