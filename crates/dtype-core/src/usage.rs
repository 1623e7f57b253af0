//! Usage contexts: the record field a descriptor instance belongs to.

use std::fmt;

/// The `(owner, field)` pair a descriptor is permanently associated with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageContext {
    /// Name of the record type (table or model) that owns the field
    pub owner: String,
    /// Field (column) name
    pub field: String,
}

impl UsageContext {
    pub fn new(owner: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for UsageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attribute {}#{}", self.owner, self.field)
    }
}
