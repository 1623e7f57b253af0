//! UUID, network address, full-text and key/value types.

use crate::descriptor::{CheckConstraint, Descriptor, Specialization, TypeBehavior};
use crate::error::{Result, TypeError};
use crate::types::{DataType, TypeId, UuidVersion};
use crate::values::Value;
use std::net::IpAddr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidType;

impl UuidType {
    fn parse(value: &Value) -> Option<Uuid> {
        match value {
            Value::Uuid(u) => Some(*u),
            Value::String(s) => Uuid::parse_str(s.trim()).ok(),
            Value::Bytes(bytes) => Uuid::from_slice(bytes).ok(),
            _ => None,
        }
    }

    fn version(d: &Descriptor) -> UuidVersion {
        match d.data_type() {
            DataType::Uuid(version) => *version,
            _ => UuidVersion::All,
        }
    }
}

impl TypeBehavior for UuidType {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        if spec.capabilities().uuid {
            return Ok(());
        }
        let replacement = if spec.capabilities().char {
            DataType::char(36)
        } else {
            DataType::string(36)
        };
        let reason = format!(
            "{} has no UUID; storing the textual form with a format check",
            spec.dialect().name()
        );
        spec.fall_back(Some(replacement), Some(CheckConstraint::UuidFormat), reason);
        Ok(())
    }

    fn storage_type(&self, _d: &Descriptor) -> Result<String> {
        Ok("UUID".to_string())
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        // Byte buffers are only accepted through sanitize
        let parsed = match value {
            Value::Bytes(_) => None,
            other => Self::parse(other),
        };
        let Some(uuid) = parsed else {
            return Err(TypeError::not_a_valid(value, "uuid"));
        };
        let expected = match Self::version(d) {
            UuidVersion::All => return Ok(()),
            UuidVersion::V1 => 1,
            UuidVersion::V4 => 4,
        };
        if uuid.get_version_num() == expected {
            Ok(())
        } else {
            Err(TypeError::mismatch(
                value,
                format!("{value} is not a valid uuid (version {expected})"),
            ))
        }
    }

    fn sanitize(&self, _d: &Descriptor, value: Value) -> Result<Value> {
        Ok(match Self::parse(&value) {
            Some(uuid) => Value::String(uuid.hyphenated().to_string()),
            None => value,
        })
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        match Self::parse(&raw) {
            Some(uuid) => Ok(Value::String(uuid.hyphenated().to_string())),
            None => Err(TypeError::invalid_storage_value(d.type_id(), &raw)),
        }
    }

    fn are_equivalent(&self, _d: &Descriptor, a: &Value, b: &Value) -> bool {
        match (Self::parse(a), Self::parse(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        }
    }
}

fn parse_prefix(prefix: &str, ip: &IpAddr) -> Option<u8> {
    let bits: u8 = prefix.parse().ok()?;
    let max = if ip.is_ipv4() { 32 } else { 128 };
    (bits <= max).then_some(bits)
}

fn is_cidr(s: &str) -> bool {
    let Some((address, prefix)) = s.split_once('/') else {
        return false;
    };
    address
        .parse::<IpAddr>()
        .ok()
        .and_then(|ip| parse_prefix(prefix, &ip))
        .is_some()
}

fn is_inet(s: &str) -> bool {
    match s.split_once('/') {
        Some(_) => is_cidr(s),
        None => s.parse::<IpAddr>().is_ok(),
    }
}

fn is_mac_address(s: &str, groups: usize) -> bool {
    let separator = if s.contains('-') { '-' } else { ':' };
    let parts: Vec<&str> = s.split(separator).collect();
    parts.len() == groups
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn validate_text(value: &Value, kind: &str, check: impl Fn(&str) -> bool) -> Result<()> {
    match value {
        Value::String(s) if check(s.trim()) => Ok(()),
        other => Err(TypeError::not_a_valid(other, kind)),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CidrType;

impl TypeBehavior for CidrType {
    fn storage_type(&self, _d: &Descriptor) -> Result<String> {
        Ok("CIDR".to_string())
    }

    fn validate(&self, _d: &Descriptor, value: &Value) -> Result<()> {
        validate_text(value, "cidr", is_cidr)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InetType;

impl TypeBehavior for InetType {
    fn storage_type(&self, _d: &Descriptor) -> Result<String> {
        Ok("INET".to_string())
    }

    fn validate(&self, _d: &Descriptor, value: &Value) -> Result<()> {
        validate_text(value, "inet", is_inet)
    }
}

/// MACADDR (six groups) and MACADDR8 (eight groups).
#[derive(Debug, Clone, Copy, Default)]
pub struct MacAddrType;

impl TypeBehavior for MacAddrType {
    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        Ok(d.type_id().as_str().to_string())
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        let (groups, kind) = if d.type_id() == TypeId::MacAddr8 {
            (8, "macaddr8")
        } else {
            (6, "macaddr")
        };
        validate_text(value, kind, |s| is_mac_address(s, groups))
    }

    fn sanitize(&self, _d: &Descriptor, value: Value) -> Result<Value> {
        Ok(match value {
            Value::String(s) => Value::String(s.trim().to_ascii_lowercase().replace('-', ":")),
            other => other,
        })
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        match (self.sanitize(d, a.clone()), self.sanitize(d, b.clone())) {
            (Ok(x), Ok(y)) => x == y,
            _ => a == b,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TsVectorType;

impl TypeBehavior for TsVectorType {
    fn storage_type(&self, _d: &Descriptor) -> Result<String> {
        Ok("TSVECTOR".to_string())
    }

    fn validate(&self, _d: &Descriptor, value: &Value) -> Result<()> {
        match value {
            Value::String(_) => Ok(()),
            other => Err(TypeError::not_a_valid(other, "tsvector")),
        }
    }
}

/// Key/value map with string keys and string (or null) values.
#[derive(Debug, Clone, Copy, Default)]
pub struct HstoreType;

impl TypeBehavior for HstoreType {
    fn storage_type(&self, _d: &Descriptor) -> Result<String> {
        Ok("HSTORE".to_string())
    }

    fn validate(&self, _d: &Descriptor, value: &Value) -> Result<()> {
        let Value::Object(map) = value else {
            return Err(TypeError::not_a_valid(value, "hstore"));
        };
        match map
            .iter()
            .find(|(_, v)| !matches!(v, Value::String(_) | Value::Null))
        {
            Some((key, v)) => Err(TypeError::mismatch(
                value,
                format!("{value} is not a valid hstore: the value of key '{key}' is {v}, not a string"),
            )),
            None => Ok(()),
        }
    }

    fn sanitize(&self, _d: &Descriptor, value: Value) -> Result<Value> {
        Ok(match value {
            Value::Json(json @ serde_json::Value::Object(_)) => Value::from_json(json),
            other => other,
        })
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        let parsed = match &raw {
            Value::Object(_) => return Ok(raw),
            Value::String(s) => serde_json::from_str::<serde_json::Value>(s).ok(),
            Value::Json(json) => Some(json.clone()),
            _ => None,
        };
        match parsed {
            Some(json @ serde_json::Value::Object(_)) => Ok(Value::from_json(json)),
            _ => Err(TypeError::invalid_storage_value(d.type_id(), &raw)),
        }
    }

    fn to_transport(&self, _d: &Descriptor, value: &Value) -> Result<Value> {
        Ok(Value::String(value.to_json()?.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::dialect::CapabilityTable;
    use std::collections::BTreeMap;

    const V4: &str = "5f1b7a5e-5b2e-4c8e-9b7e-3a8b6f0d2c11";
    const V1: &str = "c232ab00-9414-11ec-b3c8-9f6bdeced846";

    #[test]
    fn test_uuid_versions() {
        let any = Descriptor::new(DataType::uuid());
        assert!(any.validate(&Value::from(V1)).is_ok());
        assert!(any.validate(&Value::from("not-a-uuid")).is_err());

        let v4 = Descriptor::new(DataType::Uuid(UuidVersion::V4));
        assert!(v4.validate(&Value::from(V4)).is_ok());
        let err = v4.validate(&Value::from(V1)).unwrap_err();
        assert!(err.to_string().contains("version 4"));
    }

    #[test]
    fn test_uuid_sanitize_lowercases() {
        let d = Descriptor::new(DataType::uuid());
        assert_eq!(
            d.sanitize(Value::from(V4.to_uppercase())).unwrap(),
            Value::from(V4)
        );
        let raw = Uuid::parse_str(V4).unwrap();
        assert_eq!(
            d.sanitize(Value::Bytes(raw.as_bytes().to_vec())).unwrap(),
            Value::from(V4)
        );
        assert!(d.are_equivalent(&Value::Uuid(raw), &Value::from(V4)));
    }

    #[test]
    fn test_uuid_fallback_to_char() {
        let dialect = dialect_with(CapabilityTable::default());
        let d = bound(DataType::uuid(), &dialect);
        assert_eq!(d.describe_storage_type().unwrap(), "CHAR(36)");
        assert_eq!(
            d.fallback().unwrap().constraint,
            Some(CheckConstraint::UuidFormat)
        );
        assert_eq!(d.to_inline_literal(&Value::from(V4)).unwrap(), format!("'{V4}'"));

        let native = dialect_with(CapabilityTable {
            uuid: true,
            ..Default::default()
        });
        assert_eq!(
            bound(DataType::uuid(), &native)
                .describe_storage_type()
                .unwrap(),
            "UUID"
        );
    }

    #[test]
    fn test_network_formats() {
        let cidr = Descriptor::new(DataType::Cidr);
        assert!(cidr.validate(&Value::from("10.0.0.0/8")).is_ok());
        assert!(cidr.validate(&Value::from("10.0.0.0/33")).is_err());
        assert!(cidr.validate(&Value::from("10.0.0.0")).is_err());

        let inet = Descriptor::new(DataType::Inet);
        assert!(inet.validate(&Value::from("::1")).is_ok());
        assert!(inet.validate(&Value::from("192.168.0.1/24")).is_ok());
        assert!(inet.validate(&Value::from("localhost")).is_err());

        let mac = Descriptor::new(DataType::MacAddr);
        assert!(mac.validate(&Value::from("08:00:2b:01:02:03")).is_ok());
        assert!(mac.validate(&Value::from("08-00-2B-01-02-03")).is_ok());
        assert!(mac.validate(&Value::from("08:00:2b:01:02")).is_err());
        assert_eq!(
            mac.sanitize(Value::from("08-00-2B-01-02-03")).unwrap(),
            Value::from("08:00:2b:01:02:03")
        );

        let mac8 = Descriptor::new(DataType::MacAddr8);
        assert!(mac8.validate(&Value::from("08:00:2b:01:02:03:04:05")).is_ok());
        assert!(mac8.validate(&Value::from("08:00:2b:01:02:03")).is_err());
    }

    #[test]
    fn test_network_types_need_support() {
        let dialect = dialect_with(CapabilityTable::default());
        let err = Descriptor::new(DataType::Inet)
            .specialize(&dialect)
            .unwrap_err();
        assert_eq!(err.to_string(), "test does not support the INET data type");
    }

    #[test]
    fn test_hstore_values_must_be_strings() {
        let d = Descriptor::new(DataType::Hstore);
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::from("1"));
        map.insert("b".to_string(), Value::Null);
        assert!(d.validate(&Value::Object(map.clone())).is_ok());

        map.insert("c".to_string(), Value::from(3));
        let err = d.validate(&Value::Object(map)).unwrap_err();
        assert!(err.to_string().contains("key 'c'"));
        assert!(d.validate(&Value::from("a=>1")).is_err());
    }

    #[test]
    fn test_hstore_generic_transport_is_json() {
        let dialect = dialect_with(CapabilityTable {
            hstore: true,
            ..Default::default()
        });
        let d = bound(DataType::Hstore, &dialect);
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Value::from("v"));
        let transport = d.to_transport(&Value::Object(map.clone())).unwrap();
        assert_eq!(transport, Value::from(r#"{"k":"v"}"#));
        assert_eq!(d.parse_from_storage(transport).unwrap(), Value::Object(map));
    }
}
