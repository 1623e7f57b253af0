//! Integer, floating point and exact decimal types.

use super::kind_name;
use crate::descriptor::{CheckConstraint, Descriptor, Specialization, TypeBehavior};
use crate::dialect::FloatCapabilities;
use crate::error::{Result, TypeError};
use crate::types::{DataType, IntegerOptions, NumericOptions, TypeId};
use crate::values::{format_number, is_safe_integer, Value, MAX_SAFE_INTEGER};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Shape of a numeric string: `Some(true)` for integers, `Some(false)` for
/// other decimal or exponent notations, `None` when it is not a number.
pub(crate) fn numeric_literal(s: &str) -> Option<bool> {
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (mantissa, None),
    };
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
        return None;
    }
    if !digits(int_part) || !frac_part.map_or(true, digits) {
        return None;
    }
    if let Some(exp) = exponent {
        let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if exp.is_empty() || !digits(exp) {
            return None;
        }
    }
    Some(exponent.is_none() && frac_part.is_none())
}

enum Special {
    NaN,
    Infinity,
}

fn special_of(value: &Value) -> Option<Special> {
    match value {
        Value::Number(n) if n.is_nan() => Some(Special::NaN),
        Value::Number(n) if n.is_infinite() => Some(Special::Infinity),
        Value::String(s) => match s.as_str() {
            "NaN" => Some(Special::NaN),
            "Infinity" | "+Infinity" | "-Infinity" => Some(Special::Infinity),
            _ => None,
        },
        _ => None,
    }
}

fn check_special(d: &Descriptor, value: &Value, nan: bool, infinity: bool) -> Result<()> {
    let (allowed, what) = match special_of(value) {
        Some(Special::NaN) => (nan, "NaN"),
        Some(Special::Infinity) => (infinity, "Infinity"),
        None => return Ok(()),
    };
    if allowed {
        return Ok(());
    }
    let engine = d.dialect().map(|d| d.name()).unwrap_or("an unbound data type");
    Err(TypeError::mismatch(
        value,
        format!(
            "{value} is not a valid {}: {what} is not supported by {engine}",
            kind_name(d.type_id())
        ),
    ))
}

fn unsafe_integer(value: &Value) -> TypeError {
    TypeError::mismatch(
        value,
        format!(
            "{value} is not a safely representable integer. Pass it as a BigInt or a string to keep its precision"
        ),
    )
}

fn safe_i128(i: i128) -> bool {
    (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&i)
}

fn as_i128(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) if is_safe_integer(*n) => Some(*n as i128),
        Value::BigInt(i) => Some(*i),
        Value::String(s) => s.trim().parse().ok(),
        Value::Decimal(d) if d.fract().is_zero() => d.to_i128(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::BigInt(i) => Some(*i as f64),
        Value::Decimal(d) => d.to_f64(),
        Value::String(s) if special_of(value).is_some() || numeric_literal(s).is_some() => {
            parse_f64(s)
        }
        _ => None,
    }
}

fn parse_f64(s: &str) -> Option<f64> {
    match s {
        "NaN" => Some(f64::NAN),
        "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

fn numeric_storage(name: &str, options: &NumericOptions) -> String {
    let mut out = name.to_string();
    match (options.precision, options.scale) {
        (Some(p), Some(s)) => out.push_str(&format!("({p}, {s})")),
        (Some(p), None) => out.push_str(&format!("({p})")),
        _ => {}
    }
    if options.unsigned {
        out.push_str(" UNSIGNED");
    }
    if options.zerofill {
        out.push_str(" ZEROFILL");
    }
    out
}

/// TINYINT, SMALLINT, MEDIUMINT, INTEGER and BIGINT.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl IntegerType {
    fn options(d: &Descriptor) -> IntegerOptions {
        d.data_type().integer_options().cloned().unwrap_or_default()
    }
}

impl TypeBehavior for IntegerType {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        let type_id = spec.type_id();
        let ints = spec.capabilities().ints;
        let Some(options) = spec.data_type.integer_options().cloned() else {
            return Ok(());
        };

        if options.zerofill && !ints.zerofill {
            return Err(spec.unsupported(format!("{type_id}.ZEROFILL")));
        }
        if options.length.is_some() && !ints.length {
            let message = format!(
                "{} does not support {type_id} with a display width. The length option is ignored.",
                spec.dialect().name()
            );
            spec.warn(&message);
            if let Some(options) = spec.data_type.integer_options_mut() {
                options.length = None;
            }
        }

        let native = spec.capabilities().supports(type_id);
        if native && (!options.unsigned || ints.unsigned) {
            return Ok(());
        }

        let Some((min, max)) = type_id.integer_bounds(options.unsigned) else {
            return Ok(());
        };
        let wider = TypeId::INTEGERS
            .iter()
            .copied()
            .skip_while(|kind| *kind != type_id)
            .skip(1)
            .find(|kind| {
                spec.capabilities().supports(*kind)
                    && kind
                        .integer_bounds(false)
                        .is_some_and(|(lo, hi)| lo <= min && max <= hi)
            });

        let Some(wider) = wider else {
            let name = if options.unsigned {
                format!("{type_id} UNSIGNED")
            } else {
                type_id.to_string()
            };
            return Err(spec.unsupported(name));
        };
        let reason = format!(
            "{} has no {}{type_id}; using {wider} with a range check",
            spec.dialect().name(),
            if options.unsigned { "unsigned " } else { "" }
        );
        spec.fall_back(
            Some(DataType::integer_of(wider, IntegerOptions::default())?),
            Some(CheckConstraint::IntegerRange { min, max }),
            reason,
        );
        Ok(())
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        let options = Self::options(d);
        let mut out = d.type_id().as_str().to_string();
        if let Some(length) = options.length {
            out.push_str(&format!("({length})"));
        }
        if options.unsigned {
            out.push_str(" UNSIGNED");
        }
        if options.zerofill {
            out.push_str(" ZEROFILL");
        }
        Ok(out)
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        let valid = match value {
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                if !is_safe_integer(*n) {
                    return Err(unsafe_integer(value));
                }
                true
            }
            Value::BigInt(_) => true,
            Value::String(s) => numeric_literal(s) == Some(true),
            Value::Decimal(dec) => dec.fract().is_zero(),
            _ => false,
        };
        if valid {
            Ok(())
        } else {
            Err(TypeError::not_a_valid(value, &kind_name(d.type_id())))
        }
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        if d.type_id() == TypeId::BigInt {
            return Ok(match value {
                Value::Number(n) if is_safe_integer(n) => Value::String((n as i64).to_string()),
                Value::BigInt(i) => Value::String(i.to_string()),
                Value::String(s) => match s.trim().parse::<i128>() {
                    Ok(i) => Value::String(i.to_string()),
                    Err(_) => Value::String(s),
                },
                other => other,
            });
        }
        Ok(match value {
            Value::String(s) => match s.trim().parse::<i128>() {
                Ok(i) if safe_i128(i) => Value::Number(i as f64),
                _ => Value::String(s),
            },
            Value::BigInt(i) if safe_i128(i) => Value::Number(i as f64),
            other => other,
        })
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        self.sanitize(d, raw)
    }

    fn to_transport(&self, _d: &Descriptor, value: &Value) -> Result<Value> {
        Ok(match value {
            Value::Number(n) if n.is_finite() => Value::Number(*n),
            other => Value::String(other.as_text()),
        })
    }

    fn to_inline_literal(&self, d: &Descriptor, value: &Value) -> Result<String> {
        let dialect = d.require_dialect("to_inline_literal")?;
        Ok(match self.to_transport(d, value)? {
            Value::Number(n) => format_number(n),
            other => match other.as_text().trim().parse::<i128>() {
                Ok(i) => i.to_string(),
                Err(_) => dialect.escape_string(&other.as_text()),
            },
        })
    }

    fn are_equivalent(&self, _d: &Descriptor, a: &Value, b: &Value) -> bool {
        match (as_i128(a), as_i128(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        }
    }
}

/// FLOAT, REAL and DOUBLE.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatType;

impl FloatType {
    fn capabilities(d: &Descriptor) -> FloatCapabilities {
        d.capabilities()
            .and_then(|caps| caps.float_capabilities(d.type_id()).copied())
            .unwrap_or_default()
    }
}

impl TypeBehavior for FloatType {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        let type_id = spec.type_id();
        let caps = spec
            .capabilities()
            .float_capabilities(type_id)
            .copied()
            .unwrap_or_default();
        let Some(options) = spec.data_type.numeric_options().cloned() else {
            return Ok(());
        };

        if options.zerofill && !caps.zerofill {
            return Err(spec.unsupported(format!("{type_id}.ZEROFILL")));
        }
        if type_id == TypeId::Real {
            spec.warn("The REAL data type is deprecated. Use FLOAT instead.");
        }
        if options.precision.is_some() && !caps.scale_and_precision {
            let message = format!(
                "{} does not support {type_id} with scale or precision specified. These options are ignored.",
                spec.dialect().name()
            );
            spec.warn(&message);
            if let Some(options) = spec.data_type.numeric_options_mut() {
                options.precision = None;
                options.scale = None;
            }
        }
        if options.unsigned && !caps.unsigned {
            if let Some(options) = spec.data_type.numeric_options_mut() {
                options.unsigned = false;
            }
            let reason = format!(
                "{} has no unsigned {type_id}; using a non-negative check",
                spec.dialect().name()
            );
            spec.fall_back(None, Some(CheckConstraint::NonNegative), reason);
        }
        Ok(())
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        let options = d.data_type().numeric_options().cloned().unwrap_or_default();
        let name = match d.type_id() {
            TypeId::Double => "DOUBLE PRECISION",
            TypeId::Real => "REAL",
            _ => "FLOAT",
        };
        Ok(numeric_storage(name, &options))
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        if special_of(value).is_some() {
            let caps = Self::capabilities(d);
            return check_special(d, value, caps.nan, caps.infinity);
        }
        match value {
            Value::Number(_) | Value::BigInt(_) | Value::Decimal(_) => Ok(()),
            Value::String(s) if numeric_literal(s).is_some() => Ok(()),
            other => Err(TypeError::not_a_valid(other, &kind_name(d.type_id()))),
        }
    }

    fn sanitize(&self, _d: &Descriptor, value: Value) -> Result<Value> {
        Ok(match value {
            Value::String(ref s) => match as_f64(&value) {
                Some(n) => Value::Number(n),
                None => Value::String(s.clone()),
            },
            Value::BigInt(i) if safe_i128(i) => Value::Number(i as f64),
            other => other,
        })
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        self.sanitize(d, raw)
    }

    fn to_transport(&self, _d: &Descriptor, value: &Value) -> Result<Value> {
        Ok(match value {
            Value::Number(n) if n.is_finite() => Value::Number(*n),
            Value::Number(n) => Value::String(format_number(*n)),
            other => Value::String(other.as_text()),
        })
    }

    fn to_inline_literal(&self, d: &Descriptor, value: &Value) -> Result<String> {
        let dialect = d.require_dialect("to_inline_literal")?;
        Ok(match self.to_transport(d, value)? {
            Value::Number(n) => format_number(n),
            other => dialect.escape_string(&other.as_text()),
        })
    }

    fn are_equivalent(&self, _d: &Descriptor, a: &Value, b: &Value) -> bool {
        match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x == y || (x.is_nan() && y.is_nan()),
            _ => a == b,
        }
    }
}

/// Exact DECIMAL. Values always travel as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalType;

impl TypeBehavior for DecimalType {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        let Some(caps) = spec.capabilities().decimal else {
            return Err(spec.unsupported("DECIMAL"));
        };
        let Some(options) = spec.data_type.numeric_options().cloned() else {
            return Ok(());
        };

        if options.zerofill && !caps.zerofill {
            return Err(spec.unsupported("DECIMAL.ZEROFILL"));
        }
        if options.is_constrained() {
            if !caps.constrained {
                let message = format!(
                    "{} does not support DECIMAL with scale or precision specified. These options are ignored.",
                    spec.dialect().name()
                );
                spec.warn(&message);
                if let Some(options) = spec.data_type.numeric_options_mut() {
                    options.precision = None;
                    options.scale = None;
                }
            }
        } else if !caps.unconstrained {
            return Err(spec.unsupported("DECIMAL without precision and scale"));
        }
        if options.unsigned && !caps.unsigned {
            if let Some(options) = spec.data_type.numeric_options_mut() {
                options.unsigned = false;
            }
            let reason = format!(
                "{} has no unsigned DECIMAL; using a non-negative check",
                spec.dialect().name()
            );
            spec.fall_back(None, Some(CheckConstraint::NonNegative), reason);
        }
        Ok(())
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        let options = d.data_type().numeric_options().cloned().unwrap_or_default();
        Ok(numeric_storage("DECIMAL", &options))
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        if special_of(value).is_some() {
            let caps = d.capabilities().and_then(|c| c.decimal).unwrap_or_default();
            return check_special(d, value, caps.nan, caps.infinity);
        }
        match value {
            Value::Number(n) if n.fract() == 0.0 && !is_safe_integer(*n) => {
                Err(unsafe_integer(value))
            }
            Value::Number(_) | Value::BigInt(_) | Value::Decimal(_) => Ok(()),
            Value::String(s) if numeric_literal(s).is_some() => Ok(()),
            other => Err(TypeError::not_a_valid(other, "decimal")),
        }
    }

    fn sanitize(&self, _d: &Descriptor, value: Value) -> Result<Value> {
        Ok(match value {
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && !is_safe_integer(n) => {
                return Err(unsafe_integer(&value))
            }
            Value::Number(n) => Value::String(format_number(n)),
            Value::BigInt(i) => Value::String(i.to_string()),
            Value::Decimal(dec) => Value::String(dec.to_string()),
            other => other,
        })
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        self.sanitize(d, raw)
    }

    fn to_transport(&self, _d: &Descriptor, value: &Value) -> Result<Value> {
        Ok(Value::String(value.as_text()))
    }

    fn are_equivalent(&self, _d: &Descriptor, a: &Value, b: &Value) -> bool {
        let exact = |v: &Value| match v {
            Value::Decimal(dec) => Some(*dec),
            Value::BigInt(i) => Decimal::from_str(&i.to_string()).ok(),
            Value::Number(n) if n.is_finite() => Decimal::from_str(&format_number(*n)).ok(),
            Value::String(s) => Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok(),
            _ => None,
        };
        match (exact(a), exact(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_text() == b.as_text(),
        }
    }
}
