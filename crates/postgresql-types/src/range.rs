//! Native PostgreSQL range types.
//!
//! Ranges travel as their text form (`[1,10)`, `empty`) and are cast to the
//! concrete range type in SQL.

use dtype_core::kinds::RangeType;
use dtype_core::values::format_number;
use dtype_core::{
    BindCollector, Descriptor, RangeBound, RangeValue, Result, Specialization, TypeBehavior,
    TypeError, TypeId, Value,
};

/// Built-in range type for a subtype, or `None` when PostgreSQL has none.
pub fn range_type_name(subtype: TypeId) -> Option<&'static str> {
    match subtype {
        TypeId::Integer => Some("int4range"),
        TypeId::BigInt => Some("int8range"),
        TypeId::Decimal => Some("numrange"),
        TypeId::Date => Some("tstzrange"),
        TypeId::DateOnly => Some("daterange"),
        _ => None,
    }
}

fn bound_text(value: &Value) -> Result<String> {
    let text = match value {
        Value::Null => return Ok(String::new()),
        Value::Number(n) => return Ok(format_number(*n)),
        Value::BigInt(i) => return Ok(i.to_string()),
        Value::Decimal(d) => return Ok(d.to_string()),
        Value::String(s) => s,
        other => {
            return Err(TypeError::mismatch(
                other,
                format!("{other} cannot be used as a range bound"),
            ))
        }
    };
    let needs_quotes = text.is_empty()
        || text
            .chars()
            .any(|c| matches!(c, ',' | '(' | ')' | '[' | ']' | '"' | '\\') || c.is_whitespace());
    Ok(if needs_quotes {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        text.clone()
    })
}

/// Text form of a range whose bounds are already transport values.
pub fn stringify_range(range: &RangeValue) -> Result<String> {
    match range {
        RangeValue::Empty => Ok("empty".to_string()),
        RangeValue::Bounds { lower, upper } => Ok(format!(
            "{}{},{}{}",
            if lower.inclusive { '[' } else { '(' },
            bound_text(&lower.value)?,
            bound_text(&upper.value)?,
            if upper.inclusive { ']' } else { ')' },
        )),
    }
}

fn parse_bound(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return Some(Value::Null);
    }
    let Some(quoted) = text.strip_prefix('"') else {
        return Some(Value::String(text.to_string()));
    };
    let quoted = quoted.strip_suffix('"')?;
    let mut out = String::new();
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?),
            c => out.push(c),
        }
    }
    Some(Value::String(out))
}

/// Parse the range output format. Bounds come back as strings, unbounded sides as `Null`.
pub fn parse_range_literal(text: &str) -> Option<RangeValue> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("empty") {
        return Some(RangeValue::Empty);
    }
    let lower_inclusive = match text.chars().next()? {
        '[' => true,
        '(' => false,
        _ => return None,
    };
    let upper_inclusive = match text.chars().last()? {
        ']' => true,
        ')' => false,
        _ => return None,
    };
    let inner = text.get(1..text.len() - 1)?;

    let mut in_quotes = false;
    let mut escaped = false;
    let mut split = None;
    for (i, c) in inner.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                split = Some(i);
                break;
            }
            _ => {}
        }
    }
    let split = split?;
    Some(RangeValue::bounds(
        RangeBound::new(parse_bound(&inner[..split])?, lower_inclusive),
        RangeBound::new(parse_bound(&inner[split + 1..])?, upper_inclusive),
    ))
}

/// RANGE mapped to the built-in range types.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgRange;

impl PgRange {
    fn type_name(d: &Descriptor) -> Result<&'static str> {
        let subtype = d
            .subtype()
            .ok_or_else(|| TypeError::invalid_definition(TypeId::Range, "missing range subtype"))?;
        range_type_name(subtype.type_id()).ok_or_else(|| {
            TypeError::invalid_definition(
                TypeId::Range,
                format!("{} has no built-in range type", subtype.type_id()),
            )
        })
    }

    fn transport_text(d: &Descriptor, value: &Value) -> Result<String> {
        stringify_range(&RangeType::transport_bounds(d, value)?)
    }
}

impl TypeBehavior for PgRange {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        if !spec.capabilities().range {
            return Err(spec.unsupported("RANGE"));
        }
        Ok(())
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        Self::type_name(d).map(str::to_string)
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        RangeType.validate(d, value)
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        RangeType.sanitize(d, value)
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        let Value::String(text) = &raw else {
            return RangeType.parse_from_storage(d, raw);
        };
        match parse_range_literal(text) {
            Some(range) => RangeType.parse_from_storage(d, Value::Range(range)),
            None => Err(TypeError::invalid_storage_value(d.type_id(), &raw)),
        }
    }

    fn to_transport(&self, d: &Descriptor, value: &Value) -> Result<Value> {
        Self::transport_text(d, value).map(Value::String)
    }

    fn to_inline_literal(&self, d: &Descriptor, value: &Value) -> Result<String> {
        let dialect = d.require_dialect("to_inline_literal")?;
        Ok(format!(
            "{}::{}",
            dialect.escape_string(&Self::transport_text(d, value)?),
            Self::type_name(d)?
        ))
    }

    fn bind_param_sql(
        &self,
        d: &Descriptor,
        value: &Value,
        params: &mut dyn BindCollector,
    ) -> Result<String> {
        let placeholder = params.collect(self.to_transport(d, value)?);
        Ok(format!("{placeholder}::{}", Self::type_name(d)?))
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        RangeType.are_equivalent(d, a, b)
    }
}
