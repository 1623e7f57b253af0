//! The MySQL dialect: capabilities, escaping and type overrides.

use dtype_core::kinds::{DateType, StorageOverride, UuidType};
use dtype_core::types::StringOptions;
use dtype_core::{
    CapabilityTable, CheckConstraint, CitextSupport, DataType, DecimalCapabilities, Descriptor,
    Dialect, FloatCapabilities, IntegerCapabilities, Result, Specialization, SqlEscaper,
    TypeBehavior, TypeId, TypeSystemOptions, Value,
};
use std::sync::Arc;

/// Name the dialect reports in messages.
pub const DIALECT_NAME: &str = "mysql";

/// Collation used for case-insensitive text.
pub const CASE_INSENSITIVE_COLLATION: &str = "utf8mb4_general_ci";

/// MySQL literal syntax: backslash escapes and backtick identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySQLEscaper;

impl SqlEscaper for MySQLEscaper {
    fn escape_string(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for c in value.chars() {
            match c {
                '\0' => out.push_str("\\0"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\x08' => out.push_str("\\b"),
                '\t' => out.push_str("\\t"),
                '\x1a' => out.push_str("\\Z"),
                '\\' | '\'' | '"' => {
                    out.push('\\');
                    out.push(c);
                }
                c => out.push(c),
            }
        }
        out.push('\'');
        out
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }
}

/// What MySQL supports natively.
pub fn capabilities() -> CapabilityTable {
    let float = FloatCapabilities {
        nan: false,
        infinity: false,
        zerofill: true,
        unsigned: true,
        scale_and_precision: true,
    };
    CapabilityTable {
        collate_binary: true,
        citext: CitextSupport::Collation(CASE_INSENSITIVE_COLLATION.to_string()),
        ints: IntegerCapabilities {
            tinyint: true,
            mediumint: true,
            unsigned: true,
            zerofill: true,
            length: true,
        },
        float,
        real: float,
        double: float,
        decimal: Some(DecimalCapabilities {
            constrained: true,
            unconstrained: false,
            nan: false,
            infinity: false,
            zerofill: true,
            unsigned: true,
        }),
        boolean: false,
        json: true,
        geometry: true,
        enums: true,
        text_lengths: true,
        blob_lengths: true,
        ..CapabilityTable::default()
    }
}

/// Spatial column: `POINT SRID 4326`, `GEOMETRY`.
fn spatial(d: &Descriptor) -> Result<String> {
    let options = d.data_type().geometry_options().copied().unwrap_or_default();
    let name = options
        .geometry_type
        .map_or("GEOMETRY", |kind| kind.sql_name());
    Ok(match options.srid {
        Some(srid) => format!("{name} SRID {srid}"),
        None => name.to_string(),
    })
}

/// DATE stored in `DATETIME(p)`, which carries no offset.
///
/// Values are sent as wall-clock time in the configured time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySQLDateTime;

impl TypeBehavior for MySQLDateTime {
    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        DateType.storage_type(d)
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        DateType.validate(d, value)
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        DateType.sanitize(d, value)
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        DateType.parse_from_storage(d, raw)
    }

    fn to_transport(&self, d: &Descriptor, value: &Value) -> Result<Value> {
        let Value::DateTime(instant) = DateType.sanitize(d, value.clone())? else {
            return DateType.to_transport(d, value);
        };
        let local = d.timezone().convert(&instant);
        Ok(Value::String(
            local.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        ))
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        DateType.are_equivalent(d, a, b)
    }
}

/// UUID kept in a `CHAR(36) BINARY` column.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySQLUuid;

impl TypeBehavior for MySQLUuid {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        let replacement = DataType::Char(StringOptions {
            length: 36,
            binary: true,
        });
        let reason = format!(
            "{} has no UUID; storing the textual form in a binary CHAR(36)",
            spec.dialect().name()
        );
        spec.fall_back(
            Some(replacement),
            Some(CheckConstraint::UuidFormat),
            reason,
        );
        Ok(())
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        UuidType.storage_type(d)
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        UuidType.validate(d, value)
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        UuidType.sanitize(d, value)
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        let raw = match raw {
            Value::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Value::String(text),
                Err(e) => Value::Bytes(e.into_bytes()),
            },
            other => other,
        };
        UuidType.parse_from_storage(d, raw)
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        UuidType.are_equivalent(d, a, b)
    }
}

/// Build the MySQL dialect with the given options.
pub fn mysql_dialect(options: TypeSystemOptions) -> Arc<Dialect> {
    Dialect::builder(DIALECT_NAME)
        .capabilities(capabilities())
        .escaper(MySQLEscaper)
        .options(options)
        .override_type(TypeId::Date, MySQLDateTime)
        .override_type(TypeId::Uuid, MySQLUuid)
        .override_type(
            TypeId::Geometry,
            StorageOverride::new(TypeId::Geometry, spatial),
        )
        .build()
}
