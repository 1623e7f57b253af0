//! Descriptors, the behavior registry contract and dialect specialization.
//!
//! A [`Descriptor`] pairs a [`DataType`] with the [`TypeBehavior`] that
//! implements it. Unbound descriptors use the generic behavior of their
//! [`TypeId`]; [`Descriptor::specialize`] resolves the behavior a dialect
//! registers for that identifier, checks option support and records any
//! fallback the type chose.
//!
//! Descriptors are never mutated once shared: specialization and usage-context
//! rebinding both produce new values.

use crate::config::TimeZoneSetting;
use crate::dialect::{CapabilityTable, Dialect};
use crate::error::{Result, TypeError};
use crate::kinds;
use crate::pipeline::BindCollector;
use crate::types::{DataType, TypeId};
use crate::usage::UsageContext;
use crate::values::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Behavior of one logical type on one engine.
///
/// Every method receives the descriptor being operated on, which gives
/// access to the declared options and, once bound, to the dialect.
pub trait TypeBehavior: Send + Sync + fmt::Debug {
    /// Check the declared options against the dialect.
    ///
    /// May drop unsupported options (with a warning), record a fallback, or
    /// fail with `UnsupportedType`.
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        let type_id = spec.type_id();
        if spec.capabilities().supports(type_id) {
            Ok(())
        } else {
            Err(spec.unsupported(type_id.as_str()))
        }
    }

    /// Storage type declaration on the bound engine, e.g. `VARCHAR(255)`.
    fn storage_type(&self, d: &Descriptor) -> Result<String>;

    fn validate(&self, _d: &Descriptor, _value: &Value) -> Result<()> {
        Ok(())
    }

    /// Best-effort, idempotent normalization into the canonical representation.
    fn sanitize(&self, _d: &Descriptor, value: Value) -> Result<Value> {
        Ok(value)
    }

    fn parse_from_storage(&self, _d: &Descriptor, raw: Value) -> Result<Value> {
        Ok(raw)
    }

    /// Value handed to the driver when the value is sent as a bound parameter.
    fn to_transport(&self, _d: &Descriptor, value: &Value) -> Result<Value> {
        Ok(Value::String(value.as_text()))
    }

    /// Escaped literal that can be inlined into SQL text as is.
    fn to_inline_literal(&self, d: &Descriptor, value: &Value) -> Result<String> {
        let dialect = d.require_dialect("to_inline_literal")?;
        Ok(match self.to_transport(d, value)? {
            Value::Bytes(bytes) => dialect.escape_bytes(&bytes),
            other => dialect.escape_string(&other.as_text()),
        })
    }

    /// SQL that stands for a bound parameter. Usually the bare placeholder.
    fn bind_param_sql(
        &self,
        d: &Descriptor,
        value: &Value,
        params: &mut dyn BindCollector,
    ) -> Result<String> {
        Ok(params.collect(self.to_transport(d, value)?))
    }

    /// Whether the type handles `Null` itself instead of the generic short-circuit.
    fn accepts_null(&self, _d: &Descriptor) -> bool {
        false
    }

    fn are_equivalent(&self, _d: &Descriptor, a: &Value, b: &Value) -> bool {
        a == b
    }

    /// DDL that must run before a column of this type can be created.
    fn dependent_ddl(&self, _d: &Descriptor) -> Result<Option<String>> {
        Ok(None)
    }
}

/// CHECK constraint a fallback relies on to keep the original type's guarantees.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckConstraint {
    MaxOctetLength(u32),
    ExactOctetLength(u32),
    IntegerRange { min: i128, max: i128 },
    OneOf(Vec<String>),
    UuidFormat,
    NonNegative,
}

impl CheckConstraint {
    /// Render the constraint expression for an already quoted column.
    pub fn to_sql(&self, column: &str, dialect: &Dialect) -> String {
        match self {
            CheckConstraint::MaxOctetLength(n) => format!("octet_length({column}) <= {n}"),
            CheckConstraint::ExactOctetLength(n) => format!("octet_length({column}) = {n}"),
            CheckConstraint::IntegerRange { min, max } => {
                format!("{column} BETWEEN {min} AND {max}")
            }
            CheckConstraint::OneOf(values) => {
                let members: Vec<String> =
                    values.iter().map(|v| dialect.escape_string(v)).collect();
                format!("{column} IN ({})", members.join(", "))
            }
            CheckConstraint::UuidFormat => {
                format!("{column} LIKE '________-____-____-____-____________'")
            }
            CheckConstraint::NonNegative => format!("{column} >= 0"),
        }
    }
}

/// Substitute representation chosen during specialization.
#[derive(Debug, Clone)]
pub struct Fallback {
    /// Descriptor whose storage type replaces the original one
    pub replacement: Option<Descriptor>,
    pub constraint: Option<CheckConstraint>,
    pub reason: String,
}

#[derive(Debug)]
struct PendingFallback {
    replacement: Option<DataType>,
    constraint: Option<CheckConstraint>,
    reason: String,
}

/// State handed to [`TypeBehavior::check_supported`].
pub struct Specialization<'a> {
    /// Options being specialized; unsupported options may be dropped from it
    pub data_type: &'a mut DataType,
    dialect: &'a Arc<Dialect>,
    fallback: Option<PendingFallback>,
}

impl<'a> Specialization<'a> {
    fn new(data_type: &'a mut DataType, dialect: &'a Arc<Dialect>) -> Self {
        Self {
            data_type,
            dialect,
            fallback: None,
        }
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        self.dialect
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        self.dialect.capabilities()
    }

    pub fn type_id(&self) -> TypeId {
        self.data_type.type_id()
    }

    pub fn unsupported(&self, type_name: impl Into<String>) -> TypeError {
        TypeError::UnsupportedType {
            dialect: self.dialect.name().to_string(),
            type_name: type_name.into(),
        }
    }

    /// Warn about a downgrade once per dialect.
    pub fn warn(&self, message: &str) {
        self.dialect.warn_once(message);
    }

    /// Record the fallback this type uses on the dialect.
    pub fn fall_back(
        &mut self,
        replacement: Option<DataType>,
        constraint: Option<CheckConstraint>,
        reason: impl Into<String>,
    ) {
        self.fallback = Some(PendingFallback {
            replacement,
            constraint,
            reason: reason.into(),
        });
    }

    fn into_fallback(self) -> Option<PendingFallback> {
        self.fallback
    }
}

/// A logical type, optionally bound to a dialect and to a record field.
#[derive(Debug, Clone)]
pub struct Descriptor {
    data_type: DataType,
    /// Options as declared, before any dialect dropped some of them
    declared: Option<Arc<DataType>>,
    behavior: Arc<dyn TypeBehavior>,
    custom_behavior: bool,
    dialect: Option<Arc<Dialect>>,
    usage: Option<Arc<UsageContext>>,
    fallback: Option<Arc<Fallback>>,
}

impl Descriptor {
    /// Unbound descriptor with the generic behavior of its type.
    pub fn new(data_type: DataType) -> Self {
        let behavior = kinds::generic_behavior(data_type.type_id());
        Self::from_parts(data_type, behavior, false)
    }

    /// Descriptor with a user-supplied behavior that dialects never replace.
    pub fn with_behavior(data_type: DataType, behavior: impl TypeBehavior + 'static) -> Self {
        Self::from_parts(data_type, Arc::new(behavior), true)
    }

    fn from_parts(data_type: DataType, behavior: Arc<dyn TypeBehavior>, custom: bool) -> Self {
        Self {
            data_type,
            declared: None,
            behavior,
            custom_behavior: custom,
            dialect: None,
            usage: None,
            fallback: None,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.data_type.type_id()
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Options as originally declared.
    pub fn declared_type(&self) -> &DataType {
        self.declared.as_deref().unwrap_or(&self.data_type)
    }

    pub fn dialect(&self) -> Option<&Arc<Dialect>> {
        self.dialect.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.dialect.is_some()
    }

    pub fn is_bound_to(&self, dialect: &Arc<Dialect>) -> bool {
        self.dialect
            .as_ref()
            .is_some_and(|bound| Arc::ptr_eq(bound, dialect))
    }

    pub fn capabilities(&self) -> Option<&CapabilityTable> {
        self.dialect.as_deref().map(Dialect::capabilities)
    }

    /// The bound dialect, or `NotBound` naming `operation`.
    pub fn require_dialect(&self, operation: &'static str) -> Result<&Arc<Dialect>> {
        self.dialect.as_ref().ok_or(TypeError::NotBound {
            operation,
            type_id: self.type_id(),
        })
    }

    /// Time zone of the bound dialect, UTC when unbound.
    pub fn timezone(&self) -> TimeZoneSetting {
        self.dialect
            .as_deref()
            .map(|d| d.options().timezone)
            .unwrap_or_default()
    }

    pub fn usage_context(&self) -> Option<&UsageContext> {
        self.usage.as_deref()
    }

    pub fn fallback(&self) -> Option<&Fallback> {
        self.fallback.as_deref()
    }

    pub fn behavior(&self) -> &dyn TypeBehavior {
        self.behavior.as_ref()
    }

    /// Element descriptor of an ARRAY.
    pub fn element(&self) -> Option<&Descriptor> {
        match &self.data_type {
            DataType::Array(opts) => Some(&opts.element),
            _ => None,
        }
    }

    /// Bound descriptor of a RANGE.
    pub fn subtype(&self) -> Option<&Descriptor> {
        match &self.data_type {
            DataType::Range(opts) => Some(&opts.subtype),
            _ => None,
        }
    }

    fn with_field_name(&self, err: TypeError) -> TypeError {
        match &self.usage {
            Some(usage) => err.with_field(&usage.field),
            None => err,
        }
    }

    // ------------------------------------------------------------------
    // Value pipeline
    // ------------------------------------------------------------------

    /// Check that `value` is acceptable. Fails with `TypeMismatch`.
    pub fn validate(&self, value: &Value) -> Result<()> {
        self.behavior
            .validate(self, value)
            .map_err(|e| self.with_field_name(e))
    }

    pub fn sanitize(&self, value: Value) -> Result<Value> {
        self.behavior
            .sanitize(self, value)
            .map_err(|e| self.with_field_name(e))
    }

    /// Convert a value read from the engine. SQL NULL stays `Null`.
    pub fn parse_from_storage(&self, raw: Value) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        self.behavior.parse_from_storage(self, raw)
    }

    /// Value to send as a bound parameter.
    pub fn to_transport(&self, value: &Value) -> Result<Value> {
        self.require_dialect("to_transport")?;
        let value = self.sanitize(value.clone())?;
        self.behavior.to_transport(self, &value)
    }

    /// Escaped literal safe to inline into SQL text.
    pub fn to_inline_literal(&self, value: &Value) -> Result<String> {
        self.require_dialect("to_inline_literal")?;
        let value = self.sanitize(value.clone())?;
        self.behavior.to_inline_literal(self, &value)
    }

    /// Register `value` with `params` and return the SQL standing for it.
    pub fn bind_param_sql(&self, value: &Value, params: &mut dyn BindCollector) -> Result<String> {
        self.require_dialect("bind_param_sql")?;
        let value = self.sanitize(value.clone())?;
        self.behavior.bind_param_sql(self, &value, params)
    }

    /// Storage type declaration on the bound engine.
    pub fn describe_storage_type(&self) -> Result<String> {
        self.require_dialect("describe_storage_type")?;
        match self.fallback.as_ref().and_then(|f| f.replacement.as_ref()) {
            Some(replacement) => replacement.describe_storage_type(),
            None => self.behavior.storage_type(self),
        }
    }

    pub fn accepts_null_sentinel(&self) -> bool {
        self.behavior.accepts_null(self)
    }

    pub fn are_equivalent(&self, a: &Value, b: &Value) -> bool {
        self.behavior.are_equivalent(self, a, b)
    }

    pub fn dependent_ddl(&self) -> Result<Option<String>> {
        self.require_dialect("dependent_ddl")?;
        self.behavior.dependent_ddl(self)
    }

    // ------------------------------------------------------------------
    // Usage-context binding
    // ------------------------------------------------------------------

    /// Attach the field this descriptor is used by.
    ///
    /// Attaching an equal context again is a no-op; a different one fails
    /// with `ConflictingUsage`.
    pub fn attach_usage_context(mut self, context: UsageContext) -> Result<Self> {
        if let Some(existing) = &self.usage {
            if **existing == context {
                return Ok(self);
            }
            return Err(TypeError::ConflictingUsage {
                existing: existing.to_string(),
                requested: context.to_string(),
            });
        }
        self.install_usage(&Arc::new(context))?;
        Ok(self)
    }

    /// Copy of this descriptor bound to `context`; `self` stays reusable.
    pub fn with_usage_context(&self, context: UsageContext) -> Result<Self> {
        let mut copy = self.clone();
        copy.clear_usage();
        copy.attach_usage_context(context)
    }

    fn install_usage(&mut self, context: &Arc<UsageContext>) -> Result<()> {
        match &self.usage {
            Some(existing) if **existing != **context => {
                return Err(TypeError::ConflictingUsage {
                    existing: existing.to_string(),
                    requested: context.to_string(),
                })
            }
            Some(_) => return Ok(()),
            None => self.usage = Some(Arc::clone(context)),
        }
        for child in self.data_type.children_mut() {
            child.install_usage(context)?;
        }
        Ok(())
    }

    fn clear_usage(&mut self) {
        self.usage = None;
        for child in self.data_type.children_mut() {
            child.clear_usage();
        }
    }

    // ------------------------------------------------------------------
    // Dialect specialization
    // ------------------------------------------------------------------

    /// Resolve this descriptor for `dialect`.
    ///
    /// Returns `self` unchanged when it is already bound to `dialect`, and a
    /// fresh descriptor otherwise. `self` is never modified.
    pub fn specialize(&self, dialect: &Arc<Dialect>) -> Result<Cow<'_, Descriptor>> {
        if self.is_bound_to(dialect) {
            return Ok(Cow::Borrowed(self));
        }

        let declared = self.declared_type();
        let type_id = declared.type_id();
        let behavior = if self.custom_behavior {
            Arc::clone(&self.behavior)
        } else {
            dialect
                .behavior_for(type_id)
                .unwrap_or_else(|| kinds::generic_behavior(type_id))
        };

        let mut data_type = declared.clone();
        let mut spec = Specialization::new(&mut data_type, dialect);
        behavior.check_supported(&mut spec)?;
        let pending = spec.into_fallback();

        for child in data_type.children_mut() {
            let specialized = child.specialize(dialect)?.into_owned();
            *child = specialized;
        }

        let fallback = match pending {
            Some(pending) => {
                let replacement = match pending.replacement {
                    Some(replacement) => {
                        Some(Descriptor::new(replacement).specialize(dialect)?.into_owned())
                    }
                    None => None,
                };
                debug!(
                    dialect = dialect.name(),
                    data_type = %type_id,
                    reason = %pending.reason,
                    "data type falls back to an approximation"
                );
                Some(Arc::new(Fallback {
                    replacement,
                    constraint: pending.constraint,
                    reason: pending.reason,
                }))
            }
            None => None,
        };

        let mut result = Descriptor {
            data_type,
            declared: Some(
                self.declared
                    .clone()
                    .unwrap_or_else(|| Arc::new(self.data_type.clone())),
            ),
            behavior,
            custom_behavior: self.custom_behavior,
            dialect: Some(Arc::clone(dialect)),
            usage: None,
            fallback,
        };
        if let Some(context) = &self.usage {
            result.install_usage(context)?;
        }

        debug!(
            dialect = dialect.name(),
            data_type = %type_id,
            "specialized data type"
        );
        Ok(Cow::Owned(result))
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.data_type == other.data_type
    }
}

impl From<DataType> for Descriptor {
    fn from(data_type: DataType) -> Self {
        Descriptor::new(data_type)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.describe_storage_type() {
            Ok(storage) => f.write_str(&storage),
            Err(_) => f.write_str(self.type_id().as_str()),
        }
    }
}

impl Serialize for Descriptor {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.declared_type().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Descriptor {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        DataType::deserialize(deserializer).map(Descriptor::new)
    }
}
