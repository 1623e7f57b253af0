//! Dialects: capability tables, escaping rules and per-engine type overrides.
//!
//! A `Dialect` is built once per engine (and per set of options) and shared
//! behind an `Arc`. Descriptors bound to a dialect compare it by identity.

use crate::config::TypeSystemOptions;
use crate::descriptor::TypeBehavior;
use crate::types::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// How an engine represents case-insensitive text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CitextSupport {
    /// A native `CITEXT` type
    Native,
    /// `TEXT` with the named case-insensitive collation
    Collation(String),
    #[default]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntegerCapabilities {
    pub tinyint: bool,
    pub mediumint: bool,
    pub unsigned: bool,
    pub zerofill: bool,
    /// Display width, e.g. `INTEGER(11)`
    pub length: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FloatCapabilities {
    pub nan: bool,
    pub infinity: bool,
    pub zerofill: bool,
    pub unsigned: bool,
    pub scale_and_precision: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalCapabilities {
    /// `DECIMAL(p, s)`
    pub constrained: bool,
    /// Plain `DECIMAL` with arbitrary precision
    pub unconstrained: bool,
    pub nan: bool,
    pub infinity: bool,
    pub zerofill: bool,
    pub unsigned: bool,
}

impl Default for DecimalCapabilities {
    fn default() -> Self {
        Self {
            constrained: true,
            unconstrained: false,
            nan: false,
            infinity: false,
            zerofill: false,
            unsigned: false,
        }
    }
}

/// Static declaration of what an engine supports natively.
///
/// `Default` is a conservative baseline; adapters override the fields that
/// differ with struct update syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityTable {
    pub char: bool,
    /// `VARCHAR(n) BINARY`
    pub collate_binary: bool,
    pub citext: CitextSupport,
    pub ints: IntegerCapabilities,
    pub float: FloatCapabilities,
    pub real: FloatCapabilities,
    pub double: FloatCapabilities,
    /// `None` when the engine has no exact decimal type at all
    pub decimal: Option<DecimalCapabilities>,
    pub boolean: bool,
    pub uuid: bool,
    pub json: bool,
    pub jsonb: bool,
    pub hstore: bool,
    pub array: bool,
    pub range: bool,
    pub geometry: bool,
    pub geography: bool,
    pub cidr: bool,
    pub inet: bool,
    pub macaddr: bool,
    pub macaddr8: bool,
    pub tsvector: bool,
    /// Native enumerated types
    pub enums: bool,
    pub blob: bool,
    /// `TINYTEXT`, `MEDIUMTEXT`, `LONGTEXT`
    pub text_lengths: bool,
    /// `TINYBLOB`, `MEDIUMBLOB`, `LONGBLOB`
    pub blob_lengths: bool,
    pub datetime_infinity: bool,
    pub dateonly_infinity: bool,
    pub time_precision: bool,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self {
            char: true,
            collate_binary: false,
            citext: CitextSupport::Unsupported,
            ints: IntegerCapabilities::default(),
            float: FloatCapabilities::default(),
            real: FloatCapabilities::default(),
            double: FloatCapabilities::default(),
            decimal: Some(DecimalCapabilities::default()),
            boolean: true,
            uuid: false,
            json: false,
            jsonb: false,
            hstore: false,
            array: false,
            range: false,
            geometry: false,
            geography: false,
            cidr: false,
            inet: false,
            macaddr: false,
            macaddr8: false,
            tsvector: false,
            enums: false,
            blob: true,
            text_lengths: false,
            blob_lengths: false,
            datetime_infinity: false,
            dateonly_infinity: false,
            time_precision: true,
        }
    }
}

impl CapabilityTable {
    /// Whether the engine has a native representation for the type kind.
    ///
    /// Kinds with option-level capabilities (integers, floats) report `true`
    /// here; their options are checked by the type itself.
    pub fn supports(&self, type_id: TypeId) -> bool {
        match type_id {
            TypeId::Char => self.char,
            TypeId::Citext => self.citext != CitextSupport::Unsupported,
            TypeId::TinyInt => self.ints.tinyint,
            TypeId::MediumInt => self.ints.mediumint,
            TypeId::Decimal => self.decimal.is_some(),
            TypeId::Boolean => self.boolean,
            TypeId::Uuid => self.uuid,
            TypeId::Json => self.json,
            TypeId::Jsonb => self.jsonb,
            TypeId::Hstore => self.hstore,
            TypeId::Array => self.array,
            TypeId::Range => self.range,
            TypeId::Geometry => self.geometry,
            TypeId::Geography => self.geography,
            TypeId::Cidr => self.cidr,
            TypeId::Inet => self.inet,
            TypeId::MacAddr => self.macaddr,
            TypeId::MacAddr8 => self.macaddr8,
            TypeId::TsVector => self.tsvector,
            TypeId::Enum => self.enums,
            TypeId::Blob => self.blob,
            TypeId::String
            | TypeId::Text
            | TypeId::SmallInt
            | TypeId::Integer
            | TypeId::BigInt
            | TypeId::Float
            | TypeId::Real
            | TypeId::Double
            | TypeId::Time
            | TypeId::Date
            | TypeId::DateOnly
            | TypeId::Virtual => true,
        }
    }

    pub fn float_capabilities(&self, type_id: TypeId) -> Option<&FloatCapabilities> {
        match type_id {
            TypeId::Float => Some(&self.float),
            TypeId::Real => Some(&self.real),
            TypeId::Double => Some(&self.double),
            _ => None,
        }
    }
}

/// Lowercase hexadecimal rendering of a byte buffer.
pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Engine-specific literal escaping and placeholder syntax.
pub trait SqlEscaper: Send + Sync + fmt::Debug {
    /// Quoted, escaped string literal.
    fn escape_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Binary literal.
    fn escape_bytes(&self, value: &[u8]) -> String {
        format!("X'{}'", hex(value))
    }

    /// Placeholder for the bound parameter at the 1-based `position`.
    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }
}

/// ANSI escaping: doubled single quotes, `X'..'` bytes and `?` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEscaper;

impl SqlEscaper for StandardEscaper {}

/// A storage engine as seen by the type system.
#[derive(Debug)]
pub struct Dialect {
    name: String,
    capabilities: CapabilityTable,
    escaper: Box<dyn SqlEscaper>,
    overrides: HashMap<TypeId, Arc<dyn TypeBehavior>>,
    options: TypeSystemOptions,
    printed_warnings: Mutex<HashSet<String>>,
}

impl Dialect {
    pub fn builder(name: impl Into<String>) -> DialectBuilder {
        DialectBuilder {
            name: name.into(),
            capabilities: CapabilityTable::default(),
            escaper: Box::new(StandardEscaper),
            overrides: HashMap::new(),
            options: TypeSystemOptions::default(),
        }
    }

    /// A dialect with the baseline capability table and no overrides.
    pub fn generic(options: TypeSystemOptions) -> Arc<Dialect> {
        Dialect::builder("generic").options(options).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    pub fn escaper(&self) -> &dyn SqlEscaper {
        self.escaper.as_ref()
    }

    pub fn options(&self) -> &TypeSystemOptions {
        &self.options
    }

    /// Concrete behavior registered for `type_id`, if the engine overrides it.
    pub fn behavior_for(&self, type_id: TypeId) -> Option<Arc<dyn TypeBehavior>> {
        self.overrides.get(&type_id).cloned()
    }

    pub fn escape_string(&self, value: &str) -> String {
        self.escaper.escape_string(value)
    }

    pub fn escape_bytes(&self, value: &[u8]) -> String {
        self.escaper.escape_bytes(value)
    }

    pub fn quote_identifier(&self, identifier: &str) -> String {
        self.escaper.quote_identifier(identifier)
    }

    /// Log a data type downgrade, at most once per message for this dialect.
    pub fn warn_once(&self, message: &str) {
        let first_time = match self.printed_warnings.lock() {
            Ok(mut printed) => printed.insert(message.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(message.to_string()),
        };
        if first_time {
            warn!(dialect = %self.name, "{message}");
        }
    }

    /// Number of distinct warnings emitted so far.
    pub fn warning_count(&self) -> usize {
        match self.printed_warnings.lock() {
            Ok(printed) => printed.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

pub struct DialectBuilder {
    name: String,
    capabilities: CapabilityTable,
    escaper: Box<dyn SqlEscaper>,
    overrides: HashMap<TypeId, Arc<dyn TypeBehavior>>,
    options: TypeSystemOptions,
}

impl DialectBuilder {
    pub fn capabilities(mut self, capabilities: CapabilityTable) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn escaper(mut self, escaper: impl SqlEscaper + 'static) -> Self {
        self.escaper = Box::new(escaper);
        self
    }

    /// Register the concrete behavior used for `type_id` on this engine.
    pub fn override_type(mut self, type_id: TypeId, behavior: impl TypeBehavior + 'static) -> Self {
        self.overrides.insert(type_id, Arc::new(behavior));
        self
    }

    pub fn options(mut self, options: TypeSystemOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Arc<Dialect> {
        Arc::new(Dialect {
            name: self.name,
            capabilities: self.capabilities,
            escaper: self.escaper,
            overrides: self.overrides,
            options: self.options,
            printed_warnings: Mutex::new(HashSet::new()),
        })
    }
}
