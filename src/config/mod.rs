//! Configuration loading for the CLI.
//!
//! ```yaml
//! timezone: Europe/Berlin
//! null_json_stringification: sql
//! ```
//!
//! Missing keys keep their defaults. Command-line flags and environment
//! variables are applied on top through [`crate::TypeOpts`].

use crate::TypeOpts;
use anyhow::Context;
use dtype_core::TypeSystemOptions;
use std::path::Path;
use tracing::debug;

/// Load the type system options, from `path` when given, then apply `overrides`.
pub fn load_options(path: Option<&Path>, overrides: &TypeOpts) -> anyhow::Result<TypeSystemOptions> {
    let options = match path {
        Some(path) => {
            let options = TypeSystemOptions::from_yaml_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            debug!(path = %path.display(), "loaded type system options");
            options
        }
        None => TypeSystemOptions::default(),
    };
    Ok(overrides.apply(options))
}
