//! The escape/bind boundary.
//!
//! [`produce_sql_fragment`] is what statement assembly calls once per value:
//! it short-circuits SQL NULL, infers a descriptor for untyped values,
//! validates, and then either inlines an escaped literal or registers a bound
//! parameter and returns the SQL standing for it.

use crate::descriptor::Descriptor;
use crate::dialect::Dialect;
use crate::error::{Result, TypeError};
use crate::types::DataType;
use crate::values::{is_safe_integer, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::trace;

/// Receives transport values and hands out the placeholder that stands for each.
pub trait BindCollector {
    fn collect(&mut self, value: Value) -> String;
}

/// Ordered bound parameters using the dialect's placeholder syntax.
#[derive(Debug)]
pub struct BindParams {
    dialect: Arc<Dialect>,
    values: Vec<Value>,
}

impl BindParams {
    pub fn new(dialect: &Arc<Dialect>) -> Self {
        Self {
            dialect: Arc::clone(dialect),
            values: Vec::new(),
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl BindCollector for BindParams {
    fn collect(&mut self, value: Value) -> String {
        self.values.push(value);
        self.dialect.escaper().placeholder(self.values.len())
    }
}

/// Best-effort logical type for a value that comes without a descriptor.
pub fn infer_data_type(value: &Value) -> Result<DataType> {
    Ok(match value {
        Value::String(_) => DataType::text(),
        Value::Number(n) if is_safe_integer(*n) => DataType::integer(),
        Value::Number(_) => DataType::double(),
        Value::BigInt(_) => DataType::bigint(),
        Value::Decimal(d) => {
            let digits = d.mantissa().unsigned_abs().to_string().len() as u32;
            let scale = d.scale();
            DataType::decimal(digits.max(scale).max(1), scale)?
        }
        Value::Bool(_) => DataType::boolean(),
        Value::DateTime(_) => DataType::date(),
        Value::Date(_) => DataType::dateonly(),
        Value::Bytes(_) => DataType::blob(),
        Value::Uuid(_) => DataType::uuid(),
        Value::Json(_) => DataType::json(),
        Value::Array(items) if !items.is_empty() => DataType::array(infer_data_type(&items[0])?),
        other => {
            return Err(TypeError::mismatch(
                other,
                format!("could not guess type of {other}"),
            ))
        }
    })
}

fn null_fragment(params: Option<&mut dyn BindCollector>) -> String {
    match params {
        Some(params) => params.collect(Value::Null),
        None => "NULL".to_string(),
    }
}

/// SQL for one value: a NULL, an escaped literal, or the SQL around a bound parameter.
///
/// `params` selects the mode: with a collector the transport value is bound,
/// without one an inline literal is produced.
pub fn produce_sql_fragment(
    dialect: &Arc<Dialect>,
    descriptor: Option<&Descriptor>,
    value: &Value,
    params: Option<&mut dyn BindCollector>,
) -> Result<String> {
    let descriptor = match descriptor {
        Some(d) => Cow::Borrowed(d),
        None if value.is_null() => return Ok(null_fragment(params)),
        None => {
            let inferred = infer_data_type(value)?;
            trace!(data_type = %inferred.type_id(), "inferred data type for untyped value");
            Cow::Owned(Descriptor::new(inferred))
        }
    };
    let bound = descriptor.specialize(dialect)?;

    if value.is_null() && !bound.accepts_null_sentinel() {
        return Ok(null_fragment(params));
    }

    bound.validate(value)?;
    match params {
        Some(params) => bound.bind_param_sql(value, params),
        None => bound.to_inline_literal(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NullJsonStringification, TypeSystemOptions};
    use crate::descriptor::TypeBehavior;
    use crate::dialect::CapabilityTable;
    use crate::usage::UsageContext;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn generic() -> Arc<Dialect> {
        Dialect::generic(TypeSystemOptions::default())
    }

    #[derive(Debug)]
    struct CountingType {
        validations: Arc<AtomicUsize>,
        accepts_null: bool,
    }

    impl TypeBehavior for CountingType {
        fn storage_type(&self, _d: &Descriptor) -> Result<String> {
            Ok("TEXT".to_string())
        }

        fn validate(&self, _d: &Descriptor, _value: &Value) -> Result<()> {
            self.validations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn accepts_null(&self, _d: &Descriptor) -> bool {
            self.accepts_null
        }
    }

    fn counting(accepts_null: bool) -> (Descriptor, Arc<AtomicUsize>) {
        let validations = Arc::new(AtomicUsize::new(0));
        let d = Descriptor::with_behavior(
            DataType::text(),
            CountingType {
                validations: Arc::clone(&validations),
                accepts_null,
            },
        );
        (d, validations)
    }

    #[test]
    fn test_null_short_circuit_skips_descriptor() {
        let dialect = generic();
        let (d, validations) = counting(false);
        assert_eq!(
            produce_sql_fragment(&dialect, Some(&d), &Value::Null, None).unwrap(),
            "NULL"
        );
        assert_eq!(validations.load(Ordering::SeqCst), 0);

        let mut params = BindParams::new(&dialect);
        assert_eq!(
            produce_sql_fragment(&dialect, Some(&d), &Value::Null, Some(&mut params)).unwrap(),
            "?"
        );
        assert_eq!(params.values(), &[Value::Null]);
        assert_eq!(validations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_null_sentinel_types_see_null() {
        let dialect = generic();
        let (d, validations) = counting(true);
        produce_sql_fragment(&dialect, Some(&d), &Value::Null, None).unwrap();
        assert_eq!(validations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_json_null_policy_in_fragments() {
        let dialect = Dialect::builder("json")
            .capabilities(CapabilityTable {
                json: true,
                ..Default::default()
            })
            .options(TypeSystemOptions {
                null_json_stringification: NullJsonStringification::Json,
                ..Default::default()
            })
            .build();
        let d = Descriptor::new(DataType::json());
        assert_eq!(
            produce_sql_fragment(&dialect, Some(&d), &Value::Null, None).unwrap(),
            "'null'"
        );
    }

    #[test]
    fn test_inline_and_bound_modes() {
        let dialect = generic();
        let d = Descriptor::new(DataType::string(20));
        assert_eq!(
            produce_sql_fragment(&dialect, Some(&d), &Value::from("it's"), None).unwrap(),
            "'it''s'"
        );

        let mut params = BindParams::new(&dialect);
        let sql =
            produce_sql_fragment(&dialect, Some(&d), &Value::from("it's"), Some(&mut params))
                .unwrap();
        assert_eq!(sql, "?");
        assert_eq!(params.into_values(), vec![Value::from("it's")]);
    }

    #[test]
    fn test_mismatch_carries_field_name() {
        let dialect = generic();
        let d = Descriptor::new(DataType::integer())
            .attach_usage_context(UsageContext::new("User", "age"))
            .unwrap();
        let err = produce_sql_fragment(&dialect, Some(&d), &Value::from("old"), None).unwrap_err();
        match err {
            TypeError::TypeMismatch { field, .. } => assert_eq!(field.as_deref(), Some("age")),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(
            produce_sql_fragment(&dialect, Some(&d), &Value::from("old"), None)
                .unwrap_err()
                .to_string(),
            "'old' is not a valid integer (field 'age')"
        );
    }

    #[test]
    fn test_inference() {
        assert_eq!(infer_data_type(&Value::from("x")).unwrap(), DataType::text());
        assert_eq!(infer_data_type(&Value::from(3)).unwrap(), DataType::integer());
        assert_eq!(infer_data_type(&Value::from(3.5)).unwrap(), DataType::double());
        assert_eq!(
            infer_data_type(&Value::Decimal(Decimal::new(12345, 2))).unwrap(),
            DataType::decimal(5, 2).unwrap()
        );
        assert_eq!(
            infer_data_type(&Value::Array(vec![Value::from(true)])).unwrap(),
            DataType::array(DataType::boolean())
        );
        let err = infer_data_type(&Value::Array(vec![])).unwrap_err();
        assert!(err.to_string().contains("could not guess type"));
    }

    #[test]
    fn test_untyped_values_are_inferred() {
        let dialect = generic();
        assert_eq!(
            produce_sql_fragment(&dialect, None, &Value::from(42), None).unwrap(),
            "42"
        );
        assert_eq!(
            produce_sql_fragment(&dialect, None, &Value::Bytes(vec![0xca, 0xfe]), None).unwrap(),
            "X'cafe'"
        );
        assert_eq!(
            produce_sql_fragment(&dialect, None, &Value::Null, None).unwrap(),
            "NULL"
        );
        assert!(produce_sql_fragment(&dialect, None, &Value::Array(vec![]), None).is_err());
    }
}
