//! PostgreSQL behaviors for HSTORE, ARRAY and ENUM.
//!
//! Each one delegates to the generic behavior and only replaces what the
//! engine does differently.

use dtype_core::kinds::{ArrayType, EnumType, HstoreType};
use dtype_core::{
    BindCollector, DataType, Descriptor, Result, Specialization, TypeBehavior, TypeError, TypeId,
    Value,
};
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

// ============================================================================
// Text format helpers
// ============================================================================

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

/// Read a double-quoted token with backslash escapes. The opening quote must be next.
fn read_quoted(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    if chars.next()? != '"' {
        return None;
    }
    let mut out = String::new();
    loop {
        match chars.next()? {
            '\\' => out.push(chars.next()?),
            '"' => return Some(out),
            c => out.push(c),
        }
    }
}

/// Read an unquoted token up to one of `stops`.
fn read_bare(chars: &mut Peekable<Chars<'_>>, stops: &[char]) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if stops.contains(&c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out.trim_end().to_string()
}

/// `"key"=>"value"` text form of an hstore map. Values must be strings or null.
pub fn stringify_hstore(map: &BTreeMap<String, Value>) -> Result<String> {
    let pairs = map
        .iter()
        .map(|(key, value)| match value {
            Value::Null => Ok(format!("{}=>NULL", quote(key))),
            Value::String(s) => Ok(format!("{}=>{}", quote(key), quote(s))),
            other => Err(TypeError::mismatch(
                other,
                format!("{other} is not a valid hstore value for key '{key}'"),
            )),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(pairs.join(","))
}

/// Parse the hstore output format, e.g. `"a"=>"1", "b"=>NULL`.
pub fn parse_hstore(text: &str) -> Option<BTreeMap<String, Value>> {
    let mut map = BTreeMap::new();
    let mut chars = text.chars().peekable();
    loop {
        skip_whitespace(&mut chars);
        if chars.peek().is_none() {
            return Some(map);
        }
        let key = read_quoted(&mut chars)?;
        skip_whitespace(&mut chars);
        if chars.next()? != '=' || chars.next()? != '>' {
            return None;
        }
        skip_whitespace(&mut chars);
        let value = if chars.peek() == Some(&'"') {
            Value::String(read_quoted(&mut chars)?)
        } else if read_bare(&mut chars, &[',']).eq_ignore_ascii_case("NULL") {
            Value::Null
        } else {
            return None;
        };
        map.insert(key, value);
        skip_whitespace(&mut chars);
        match chars.next() {
            None => return Some(map),
            Some(',') => continue,
            Some(_) => return None,
        }
    }
}

/// Parse a one-dimensional array literal such as `{1,"a b",NULL}`.
pub fn parse_array_literal(text: &str) -> Option<Vec<Value>> {
    let inner = text.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();
    skip_whitespace(&mut chars);
    if chars.peek().is_none() {
        return Some(items);
    }
    loop {
        skip_whitespace(&mut chars);
        let item = match chars.peek()? {
            '"' => Value::String(read_quoted(&mut chars)?),
            '{' => return None,
            _ => {
                let bare = read_bare(&mut chars, &[',']);
                if bare.eq_ignore_ascii_case("NULL") {
                    Value::Null
                } else {
                    Value::String(bare)
                }
            }
        };
        items.push(item);
        skip_whitespace(&mut chars);
        match chars.next() {
            None => return Some(items),
            Some(',') => continue,
            Some(_) => return None,
        }
    }
}

// ============================================================================
// HSTORE
// ============================================================================

/// HSTORE sent and read in its native text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgHstore;

impl TypeBehavior for PgHstore {
    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        HstoreType.storage_type(d)
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        HstoreType.validate(d, value)
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        HstoreType.sanitize(d, value)
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        if let Value::String(text) = &raw {
            if let Some(map) = parse_hstore(text) {
                return Ok(Value::Object(map));
            }
        }
        HstoreType.parse_from_storage(d, raw)
    }

    fn to_transport(&self, _d: &Descriptor, value: &Value) -> Result<Value> {
        match value {
            Value::Object(map) => stringify_hstore(map).map(Value::String),
            other => Err(TypeError::not_a_valid(other, "hstore")),
        }
    }
}

// ============================================================================
// ARRAY
// ============================================================================

/// ARRAY with `ARRAY[...]` literals and `{...}` parsing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgArray;

impl PgArray {
    fn element(d: &Descriptor) -> Result<&Descriptor> {
        d.element()
            .ok_or_else(|| TypeError::invalid_definition(TypeId::Array, "missing element type"))
    }

    /// Element types PostgreSQL infers without a cast.
    fn is_unambiguous(element: &Descriptor) -> bool {
        matches!(element.type_id(), TypeId::Text | TypeId::Integer)
    }
}

impl TypeBehavior for PgArray {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        ArrayType.check_supported(spec)
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        ArrayType.storage_type(d)
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        ArrayType.validate(d, value)
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        ArrayType.sanitize(d, value)
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        let Value::String(text) = &raw else {
            return ArrayType.parse_from_storage(d, raw);
        };
        let Some(items) = parse_array_literal(text) else {
            return Err(TypeError::invalid_storage_value(d.type_id(), &raw));
        };
        let element = Self::element(d)?;
        items
            .into_iter()
            .map(|item| match item {
                Value::Null => Ok(Value::Null),
                text => element.parse_from_storage(element.sanitize(text)?),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn to_transport(&self, d: &Descriptor, value: &Value) -> Result<Value> {
        ArrayType.to_transport(d, value)
    }

    fn to_inline_literal(&self, d: &Descriptor, value: &Value) -> Result<String> {
        let Value::Array(items) = value else {
            return Err(TypeError::not_a_valid(value, "array"));
        };
        let element = Self::element(d)?;
        let literals = items
            .iter()
            .map(|item| match item {
                Value::Null => Ok("NULL".to_string()),
                other => element.to_inline_literal(other),
            })
            .collect::<Result<Vec<_>>>()?;
        let cast = if items.is_empty() || !Self::is_unambiguous(element) {
            format!("::{}", self.storage_type(d)?)
        } else {
            String::new()
        };
        Ok(format!("ARRAY[{}]{cast}", literals.join(",")))
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        ArrayType.are_equivalent(d, a, b)
    }

    fn dependent_ddl(&self, d: &Descriptor) -> Result<Option<String>> {
        Self::element(d)?.dependent_ddl()
    }
}

// ============================================================================
// ENUM
// ============================================================================

/// ENUM backed by a named type created before the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgEnum;

impl PgEnum {
    /// `enum_<table>_<column>`, derived from the usage context.
    pub fn type_name(d: &Descriptor) -> Result<String> {
        let usage = d.usage_context().ok_or_else(|| {
            TypeError::invalid_definition(
                TypeId::Enum,
                "could not determine the name of this enum because it is not attached to a column",
            )
        })?;
        Ok(format!("enum_{}_{}", usage.owner, usage.field))
    }

    fn members(d: &Descriptor) -> &[String] {
        match d.data_type() {
            DataType::Enum(options) => &options.values,
            _ => &[],
        }
    }
}

impl TypeBehavior for PgEnum {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        EnumType.check_supported(spec)
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        let dialect = d.require_dialect("describe_storage_type")?;
        Ok(dialect.quote_identifier(&Self::type_name(d)?))
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        EnumType.validate(d, value)
    }

    fn bind_param_sql(
        &self,
        d: &Descriptor,
        value: &Value,
        params: &mut dyn BindCollector,
    ) -> Result<String> {
        let placeholder = params.collect(self.to_transport(d, value)?);
        Ok(format!("{placeholder}::{}", self.storage_type(d)?))
    }

    fn dependent_ddl(&self, d: &Descriptor) -> Result<Option<String>> {
        let dialect = d.require_dialect("dependent_ddl")?;
        let members: Vec<String> = Self::members(d)
            .iter()
            .map(|m| dialect.escape_string(m))
            .collect();
        Ok(Some(format!(
            "CREATE TYPE {} AS ENUM({});",
            self.storage_type(d)?,
            members.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::postgres_dialect;
    use dtype_core::{BindParams, TypeSystemOptions, UsageContext};

    fn bound(data_type: DataType) -> Descriptor {
        let dialect = postgres_dialect(TypeSystemOptions::default());
        Descriptor::new(data_type)
            .specialize(&dialect)
            .unwrap()
            .into_owned()
    }

    fn map(pairs: &[(&str, Option<&str>)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map_or(Value::Null, Value::from)))
            .collect()
    }

    #[test]
    fn test_hstore_text_form() {
        let d = bound(DataType::Hstore);
        let value = Value::Object(map(&[("a", Some("1")), ("q\"uote", Some("x")), ("n", None)]));
        assert_eq!(
            d.to_transport(&value).unwrap(),
            Value::from(r#""a"=>"1","n"=>NULL,"q\"uote"=>"x""#)
        );
        assert_eq!(
            d.to_inline_literal(&Value::Object(map(&[("k", Some("it's"))])))
                .unwrap(),
            r#"'"k"=>"it''s"'"#
        );
    }

    #[test]
    fn test_hstore_parse() {
        let d = bound(DataType::Hstore);
        let parsed = d
            .parse_from_storage(Value::from(r#""a"=>"1", "b"=>NULL, "c\"d"=>"e,f""#))
            .unwrap();
        assert_eq!(
            parsed,
            Value::Object(map(&[("a", Some("1")), ("b", None), ("c\"d", Some("e,f"))]))
        );
        assert_eq!(
            d.parse_from_storage(Value::from("")).unwrap(),
            Value::Object(BTreeMap::new())
        );
        assert!(d.parse_from_storage(Value::from("a=>1")).is_err());
    }

    #[test]
    fn test_array_literal_casts() {
        let ints = bound(DataType::array(DataType::integer()));
        let items = Value::Array(vec![Value::from(1), Value::Null, Value::from(3)]);
        assert_eq!(ints.to_inline_literal(&items).unwrap(), "ARRAY[1,NULL,3]");
        assert_eq!(
            ints.to_inline_literal(&Value::Array(vec![])).unwrap(),
            "ARRAY[]::INTEGER[]"
        );

        let strings = bound(DataType::array(DataType::string(10)));
        assert_eq!(
            strings
                .to_inline_literal(&Value::Array(vec![Value::from("a")]))
                .unwrap(),
            "ARRAY['a']::VARCHAR(10)[]"
        );
    }

    #[test]
    fn test_array_parse_text() {
        let ints = bound(DataType::array(DataType::integer()));
        assert_eq!(
            ints.parse_from_storage(Value::from("{1,2,NULL}")).unwrap(),
            Value::Array(vec![Value::from(1), Value::from(2), Value::Null])
        );
        let texts = bound(DataType::array(DataType::text()));
        assert_eq!(
            texts
                .parse_from_storage(Value::from(r#"{"a b","c\"d",plain}"#))
                .unwrap(),
            Value::Array(vec![
                Value::from("a b"),
                Value::from("c\"d"),
                Value::from("plain")
            ])
        );
        assert_eq!(
            texts.parse_from_storage(Value::from("{}")).unwrap(),
            Value::Array(vec![])
        );
        assert!(ints.parse_from_storage(Value::from("{{1},{2}}")).is_err());
        assert!(ints.parse_from_storage(Value::from(5)).is_err());
    }

    #[test]
    fn test_enum_named_after_column() {
        let d = Descriptor::new(DataType::enumeration(["admin", "user"]).unwrap())
            .attach_usage_context(UsageContext::new("users", "role"))
            .unwrap();
        let dialect = postgres_dialect(TypeSystemOptions::default());
        let d = d.specialize(&dialect).unwrap().into_owned();
        assert_eq!(d.describe_storage_type().unwrap(), "\"enum_users_role\"");
        assert_eq!(
            d.dependent_ddl().unwrap().unwrap(),
            "CREATE TYPE \"enum_users_role\" AS ENUM('admin', 'user');"
        );

        let mut params = BindParams::new(&dialect);
        assert_eq!(
            d.bind_param_sql(&Value::from("user"), &mut params).unwrap(),
            "$1::\"enum_users_role\""
        );
    }

    #[test]
    fn test_enum_without_usage_context() {
        let d = bound(DataType::enumeration(["a"]).unwrap());
        let err = d.describe_storage_type().unwrap_err();
        assert!(matches!(err, TypeError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_enum_array_shares_the_type() {
        let dialect = postgres_dialect(TypeSystemOptions::default());
        let d = Descriptor::new(DataType::array(DataType::enumeration(["x", "y"]).unwrap()))
            .attach_usage_context(UsageContext::new("posts", "tags"))
            .unwrap()
            .specialize(&dialect)
            .unwrap()
            .into_owned();
        assert_eq!(d.describe_storage_type().unwrap(), "\"enum_posts_tags\"[]");
        assert!(d
            .dependent_ddl()
            .unwrap()
            .unwrap()
            .starts_with("CREATE TYPE \"enum_posts_tags\""));
        assert_eq!(
            d.to_inline_literal(&Value::Array(vec![Value::from("x")]))
                .unwrap(),
            "ARRAY['x']::\"enum_posts_tags\"[]"
        );
    }
}
