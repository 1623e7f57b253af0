//! Error types shared by every descriptor operation.

use crate::types::TypeId;
use crate::values::Value;

/// Result alias used throughout the crate.
pub type Result<T, E = TypeError> = std::result::Result<T, E>;

/// Errors raised by descriptors, the specializer and the usage-context binder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    /// A value was rejected by `validate`. Recoverable; usually reported to the end user.
    #[error("{reason}{}", field_suffix(.field))]
    TypeMismatch {
        /// Rendering of the offending value
        value: String,
        /// Field the value was destined for, when known
        field: Option<String>,
        /// Human readable reason
        reason: String,
    },

    /// The dialect has no acceptable representation for the type and no fallback.
    #[error("{dialect} does not support the {type_name} data type")]
    UnsupportedType { dialect: String, type_name: String },

    /// A descriptor instance was attached to two different fields.
    #[error(
        "Cannot attach {requested} to a data type that is already used by {existing}. \
         Use with_usage_context to reuse a data type across fields"
    )]
    ConflictingUsage { existing: String, requested: String },

    /// A dialect-dependent operation was called on an unbound descriptor.
    #[error("{operation} was called on a {type_id} data type that is not bound to a dialect")]
    NotBound {
        operation: &'static str,
        type_id: TypeId,
    },

    /// The type is computed and has no storage representation.
    #[error("The {0} data type has no storage representation")]
    NoStorageType(TypeId),

    /// Constructor options are invalid.
    #[error("Invalid {type_id} definition: {reason}")]
    InvalidDefinition { type_id: TypeId, reason: String },

    /// The engine returned something the type cannot interpret.
    #[error("Cannot parse {value} received from the database as {type_id}")]
    InvalidStorageValue { type_id: TypeId, value: String },

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(name) => format!(" (field '{name}')"),
        None => String::new(),
    }
}

impl TypeError {
    /// Build a `TypeMismatch` for `value`.
    pub fn mismatch(value: &Value, reason: impl Into<String>) -> Self {
        TypeError::TypeMismatch {
            value: value.to_string(),
            field: None,
            reason: reason.into(),
        }
    }

    /// The standard "X is not a valid <kind>" mismatch.
    pub fn not_a_valid(value: &Value, kind: &str) -> Self {
        Self::mismatch(value, format!("{value} is not a valid {kind}"))
    }

    pub fn invalid_definition(type_id: TypeId, reason: impl Into<String>) -> Self {
        TypeError::InvalidDefinition {
            type_id,
            reason: reason.into(),
        }
    }

    pub fn invalid_storage_value(type_id: TypeId, value: &Value) -> Self {
        TypeError::InvalidStorageValue {
            type_id,
            value: value.to_string(),
        }
    }

    /// Fill in the field name of a `TypeMismatch` that does not carry one yet.
    pub fn with_field(self, name: &str) -> Self {
        match self {
            TypeError::TypeMismatch {
                value,
                field: None,
                reason,
            } => TypeError::TypeMismatch {
                value,
                field: Some(name.to_string()),
                reason,
            },
            other => other,
        }
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, TypeError::TypeMismatch { .. })
    }
}

impl From<serde_json::Error> for TypeError {
    fn from(e: serde_json::Error) -> Self {
        TypeError::Serialization(e.to_string())
    }
}
