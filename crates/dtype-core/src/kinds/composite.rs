//! ARRAY and RANGE, which delegate element values to a nested descriptor.

use super::unsupported_on;
use crate::descriptor::{Descriptor, TypeBehavior};
use crate::error::{Result, TypeError};
use crate::values::{RangeBound, RangeValue, Value};

fn element_of(d: &Descriptor) -> Result<&Descriptor> {
    d.element()
        .ok_or_else(|| TypeError::invalid_definition(d.type_id(), "missing element type"))
}

fn subtype_of(d: &Descriptor) -> Result<&Descriptor> {
    d.subtype()
        .ok_or_else(|| TypeError::invalid_definition(d.type_id(), "missing range subtype"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayType;

impl TypeBehavior for ArrayType {
    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        Ok(format!("{}[]", element_of(d)?.describe_storage_type()?))
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        let Value::Array(items) = value else {
            return Err(TypeError::not_a_valid(value, "array"));
        };
        let element = element_of(d)?;
        for item in items.iter().filter(|item| !item.is_null()) {
            element.validate(item)?;
        }
        Ok(())
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        let Value::Array(items) = value else {
            return Ok(value);
        };
        let element = element_of(d)?;
        items
            .into_iter()
            .map(|item| element.sanitize(item))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        let Value::Array(items) = raw else {
            return Err(TypeError::invalid_storage_value(d.type_id(), &raw));
        };
        let element = element_of(d)?;
        items
            .into_iter()
            .map(|item| element.parse_from_storage(item))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn to_transport(&self, d: &Descriptor, value: &Value) -> Result<Value> {
        let Value::Array(items) = value else {
            return Err(TypeError::not_a_valid(value, "array"));
        };
        let element = element_of(d)?;
        items
            .iter()
            .map(|item| match item {
                Value::Null => Ok(Value::Null),
                other => element.to_transport(other),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn to_inline_literal(&self, d: &Descriptor, value: &Value) -> Result<String> {
        let Value::Array(items) = value else {
            return Err(TypeError::not_a_valid(value, "array"));
        };
        let element = element_of(d)?;
        let literals = items
            .iter()
            .map(|item| match item {
                Value::Null => Ok("NULL".to_string()),
                other => element.to_inline_literal(other),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("ARRAY[{}]", literals.join(", ")))
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        match (a, b, d.element()) {
            (Value::Array(x), Value::Array(y), Some(element)) => {
                x.len() == y.len()
                    && x.iter()
                        .zip(y)
                        .all(|(left, right)| element.are_equivalent(left, right))
            }
            _ => a == b,
        }
    }
}

fn range_bound(value: Value, default_inclusive: bool) -> RangeBound {
    match value {
        Value::Object(mut map) if map.contains_key("value") => {
            let inclusive = match map.get("inclusive") {
                Some(Value::Bool(b)) => *b,
                _ => default_inclusive,
            };
            RangeBound::new(map.remove("value").unwrap_or(Value::Null), inclusive)
        }
        raw => RangeBound::new(raw, default_inclusive),
    }
}

/// Bring the accepted range shorthands into `Value::Range`.
///
/// `[]` is the empty range; `[lower, upper]` takes raw values (inclusive
/// lower, exclusive upper) or `{value, inclusive}` objects. Anything else is
/// returned unchanged.
pub fn normalize_range(value: Value) -> Value {
    match value {
        Value::Array(items) if items.is_empty() => Value::Range(RangeValue::Empty),
        Value::Array(items) if items.len() == 2 => {
            let mut items = items.into_iter();
            let lower = items.next().unwrap_or(Value::Null);
            let upper = items.next().unwrap_or(Value::Null);
            Value::Range(RangeValue::bounds(
                range_bound(lower, true),
                range_bound(upper, false),
            ))
        }
        other => other,
    }
}

fn map_bounds(
    range: RangeValue,
    mut f: impl FnMut(Value) -> Result<Value>,
) -> Result<RangeValue> {
    match range {
        RangeValue::Empty => Ok(RangeValue::Empty),
        RangeValue::Bounds { lower, upper } => {
            let mut convert = |bound: RangeBound| -> Result<RangeBound> {
                let value = match *bound.value {
                    Value::Null => Value::Null,
                    other => f(other)?,
                };
                Ok(RangeBound::new(value, bound.inclusive))
            };
            Ok(RangeValue::bounds(convert(lower)?, convert(upper)?))
        }
    }
}

/// RANGE over a subtype. Engines with native ranges override storage and transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeType;

impl RangeType {
    /// Normalized range with every bound passed through the subtype's transport.
    pub fn transport_bounds(d: &Descriptor, value: &Value) -> Result<RangeValue> {
        let subtype = subtype_of(d)?;
        match normalize_range(value.clone()) {
            Value::Range(range) => map_bounds(range, |v| subtype.to_transport(&v)),
            other => Err(TypeError::not_a_valid(&other, "range")),
        }
    }
}

impl TypeBehavior for RangeType {
    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        Err(unsupported_on(d, "RANGE"))
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        let subtype = subtype_of(d)?;
        match normalize_range(value.clone()) {
            Value::Range(RangeValue::Empty) => Ok(()),
            Value::Range(RangeValue::Bounds { lower, upper }) => {
                for bound in [lower, upper] {
                    if !bound.is_unbounded() {
                        subtype.validate(&bound.value)?;
                    }
                }
                Ok(())
            }
            _ => Err(TypeError::not_a_valid(value, "range")),
        }
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        let subtype = subtype_of(d)?;
        match normalize_range(value) {
            Value::Range(range) => Ok(Value::Range(map_bounds(range, |v| subtype.sanitize(v))?)),
            other => Ok(other),
        }
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        let subtype = subtype_of(d)?;
        match normalize_range(raw) {
            Value::Range(range) => Ok(Value::Range(map_bounds(range, |v| {
                subtype.parse_from_storage(v)
            })?)),
            other => Err(TypeError::invalid_storage_value(d.type_id(), &other)),
        }
    }

    fn to_transport(&self, d: &Descriptor, value: &Value) -> Result<Value> {
        Self::transport_bounds(d, value).map(Value::Range)
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        let Some(subtype) = d.subtype() else {
            return a == b;
        };
        match (normalize_range(a.clone()), normalize_range(b.clone())) {
            (Value::Range(RangeValue::Empty), Value::Range(RangeValue::Empty)) => true,
            (
                Value::Range(RangeValue::Bounds {
                    lower: l1,
                    upper: u1,
                }),
                Value::Range(RangeValue::Bounds {
                    lower: l2,
                    upper: u2,
                }),
            ) => [(l1, l2), (u1, u2)].iter().all(|(x, y)| {
                x.inclusive == y.inclusive
                    && match (x.is_unbounded(), y.is_unbounded()) {
                        (true, true) => true,
                        (false, false) => subtype.are_equivalent(&x.value, &y.value),
                        _ => false,
                    }
            }),
            (x, y) => x == y,
        }
    }
}
