//! SQLite DDL generation.

use crate::dialect::sqlite_dialect;
use dtype_core::{Dialect, ToDdl, TypeSystemOptions};
use std::sync::Arc;

/// SQLite DDL generator.
#[derive(Debug, Clone)]
pub struct SQLiteDdl {
    dialect: Arc<Dialect>,
}

impl SQLiteDdl {
    pub fn new(options: TypeSystemOptions) -> Self {
        Self {
            dialect: sqlite_dialect(options),
        }
    }
}

impl Default for SQLiteDdl {
    fn default() -> Self {
        Self::new(TypeSystemOptions::default())
    }
}

impl ToDdl for SQLiteDdl {
    fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }
}
