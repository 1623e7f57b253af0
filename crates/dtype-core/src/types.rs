//! Logical data types and their options.
//!
//! `TypeId` is the stable, engine-independent identity of a type kind. Two
//! descriptors with the same `TypeId` are the same logical type even when the
//! behavior implementing them differs per dialect.
//!
//! `DataType` carries the identity plus the options a column declares.
//!
//! # YAML Format
//!
//! Simple types can be specified as strings:
//! ```yaml
//! type: text
//! type: integer
//! type: uuid
//! ```
//!
//! Types with options use object format:
//! ```yaml
//! type:
//!   type: string
//!   length: 80
//! type:
//!   type: decimal
//!   precision: 10
//!   scale: 2
//! type:
//!   type: array
//!   element: integer
//! ```

use crate::config::NullJsonStringification;
use crate::descriptor::Descriptor;
use crate::error::{Result, TypeError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a logical type kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeId {
    String,
    Char,
    Text,
    Citext,
    TinyInt,
    SmallInt,
    MediumInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Decimal,
    Boolean,
    Time,
    Date,
    DateOnly,
    Uuid,
    Json,
    Jsonb,
    Hstore,
    Blob,
    Enum,
    Array,
    Range,
    Geometry,
    Geography,
    Cidr,
    Inet,
    MacAddr,
    MacAddr8,
    TsVector,
    Virtual,
}

impl TypeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeId::String => "STRING",
            TypeId::Char => "CHAR",
            TypeId::Text => "TEXT",
            TypeId::Citext => "CITEXT",
            TypeId::TinyInt => "TINYINT",
            TypeId::SmallInt => "SMALLINT",
            TypeId::MediumInt => "MEDIUMINT",
            TypeId::Integer => "INTEGER",
            TypeId::BigInt => "BIGINT",
            TypeId::Float => "FLOAT",
            TypeId::Real => "REAL",
            TypeId::Double => "DOUBLE",
            TypeId::Decimal => "DECIMAL",
            TypeId::Boolean => "BOOLEAN",
            TypeId::Time => "TIME",
            TypeId::Date => "DATE",
            TypeId::DateOnly => "DATEONLY",
            TypeId::Uuid => "UUID",
            TypeId::Json => "JSON",
            TypeId::Jsonb => "JSONB",
            TypeId::Hstore => "HSTORE",
            TypeId::Blob => "BLOB",
            TypeId::Enum => "ENUM",
            TypeId::Array => "ARRAY",
            TypeId::Range => "RANGE",
            TypeId::Geometry => "GEOMETRY",
            TypeId::Geography => "GEOGRAPHY",
            TypeId::Cidr => "CIDR",
            TypeId::Inet => "INET",
            TypeId::MacAddr => "MACADDR",
            TypeId::MacAddr8 => "MACADDR8",
            TypeId::TsVector => "TSVECTOR",
            TypeId::Virtual => "VIRTUAL",
        }
    }

    /// Integer kinds ordered from smallest to largest.
    pub const INTEGERS: [TypeId; 5] = [
        TypeId::TinyInt,
        TypeId::SmallInt,
        TypeId::MediumInt,
        TypeId::Integer,
        TypeId::BigInt,
    ];

    pub fn is_integer(&self) -> bool {
        Self::INTEGERS.contains(self)
    }

    /// Inclusive value bounds of an integer kind.
    pub fn integer_bounds(&self, unsigned: bool) -> Option<(i128, i128)> {
        let bits: u32 = match self {
            TypeId::TinyInt => 8,
            TypeId::SmallInt => 16,
            TypeId::MediumInt => 24,
            TypeId::Integer => 32,
            TypeId::BigInt => 64,
            _ => return None,
        };
        if unsigned {
            Some((0, (1i128 << bits) - 1))
        } else {
            Some((-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1))
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size class of TEXT and BLOB columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthClass {
    Tiny,
    Medium,
    Long,
}

impl LengthClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            LengthClass::Tiny => "tiny",
            LengthClass::Medium => "medium",
            LengthClass::Long => "long",
        }
    }

    /// Prefix used by engines that name sized types, e.g. `MEDIUM` in `MEDIUMTEXT`.
    pub fn sql_prefix(&self) -> &'static str {
        match self {
            LengthClass::Tiny => "TINY",
            LengthClass::Medium => "MEDIUM",
            LengthClass::Long => "LONG",
        }
    }
}

impl FromStr for LengthClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tiny" => Ok(LengthClass::Tiny),
            "medium" => Ok(LengthClass::Medium),
            "long" => Ok(LengthClass::Long),
            other => Err(format!(
                "unknown length '{other}', expected one of tiny, medium, long"
            )),
        }
    }
}

/// Options of STRING and CHAR.
#[derive(Debug, Clone, PartialEq)]
pub struct StringOptions {
    pub length: u32,
    pub binary: bool,
}

impl Default for StringOptions {
    fn default() -> Self {
        Self {
            length: 255,
            binary: false,
        }
    }
}

/// Options shared by the integer kinds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegerOptions {
    /// Display width
    pub length: Option<u32>,
    pub unsigned: bool,
    pub zerofill: bool,
}

/// Options shared by FLOAT, DOUBLE and DECIMAL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericOptions {
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
    pub zerofill: bool,
}

impl NumericOptions {
    fn check(&self, type_id: TypeId) -> Result<()> {
        if self.scale.is_some() && self.precision.is_none() {
            return Err(TypeError::invalid_definition(
                type_id,
                "the scale option can only be specified together with precision",
            ));
        }
        Ok(())
    }

    pub fn is_constrained(&self) -> bool {
        self.precision.is_some()
    }
}

/// Options of TIME and DATE.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeOptions {
    /// Fractional second digits
    pub precision: Option<u8>,
}

/// UUID version accepted by a UUID column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UuidVersion {
    V1,
    V4,
    #[default]
    All,
}

impl FromStr for UuidVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(UuidVersion::V1),
            "4" | "v4" => Ok(UuidVersion::V4),
            "all" => Ok(UuidVersion::All),
            other => Err(format!("unknown uuid version '{other}'")),
        }
    }
}

/// Options of JSON and JSONB.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JsonOptions {
    /// Overrides the dialect-wide null handling for this descriptor
    pub null_json: Option<NullJsonStringification>,
}

/// Ordered members of an ENUM.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumOptions {
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayOptions {
    pub element: Box<Descriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeOptions {
    pub subtype: Box<Descriptor>,
}

/// Geometry variants accepted by GEOMETRY and GEOGRAPHY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryType {
    /// SQL spelling, e.g. `MULTIPOLYGON`.
    pub fn sql_name(&self) -> &'static str {
        match self {
            GeometryType::Point => "POINT",
            GeometryType::LineString => "LINESTRING",
            GeometryType::Polygon => "POLYGON",
            GeometryType::MultiPoint => "MULTIPOINT",
            GeometryType::MultiLineString => "MULTILINESTRING",
            GeometryType::MultiPolygon => "MULTIPOLYGON",
            GeometryType::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }
}

impl FromStr for GeometryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "").as_str() {
            "point" => Ok(GeometryType::Point),
            "linestring" => Ok(GeometryType::LineString),
            "polygon" => Ok(GeometryType::Polygon),
            "multipoint" => Ok(GeometryType::MultiPoint),
            "multilinestring" => Ok(GeometryType::MultiLineString),
            "multipolygon" => Ok(GeometryType::MultiPolygon),
            "geometrycollection" => Ok(GeometryType::GeometryCollection),
            other => Err(format!("unknown geometry type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeometryOptions {
    pub geometry_type: Option<GeometryType>,
    pub srid: Option<u32>,
}

/// A computed attribute: no storage, a declared return type and the fields it reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualOptions {
    pub return_type: Option<Box<Descriptor>>,
    pub attribute_dependencies: Vec<String>,
}

/// A logical type with its declared options.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    String(StringOptions),
    Char(StringOptions),
    Text(Option<LengthClass>),
    Citext,
    TinyInt(IntegerOptions),
    SmallInt(IntegerOptions),
    MediumInt(IntegerOptions),
    Integer(IntegerOptions),
    BigInt(IntegerOptions),
    Float(NumericOptions),
    /// Deprecated alias kept for existing layouts; prefer `Float`
    Real(NumericOptions),
    Double(NumericOptions),
    Decimal(NumericOptions),
    Boolean,
    Time(TimeOptions),
    Date(TimeOptions),
    DateOnly,
    Uuid(UuidVersion),
    Json(JsonOptions),
    Jsonb(JsonOptions),
    Hstore,
    Blob(Option<LengthClass>),
    Enum(EnumOptions),
    Array(ArrayOptions),
    Range(RangeOptions),
    Geometry(GeometryOptions),
    Geography(GeometryOptions),
    Cidr,
    Inet,
    MacAddr,
    MacAddr8,
    TsVector,
    Virtual(VirtualOptions),
}

impl DataType {
    pub fn type_id(&self) -> TypeId {
        match self {
            DataType::String(_) => TypeId::String,
            DataType::Char(_) => TypeId::Char,
            DataType::Text(_) => TypeId::Text,
            DataType::Citext => TypeId::Citext,
            DataType::TinyInt(_) => TypeId::TinyInt,
            DataType::SmallInt(_) => TypeId::SmallInt,
            DataType::MediumInt(_) => TypeId::MediumInt,
            DataType::Integer(_) => TypeId::Integer,
            DataType::BigInt(_) => TypeId::BigInt,
            DataType::Float(_) => TypeId::Float,
            DataType::Real(_) => TypeId::Real,
            DataType::Double(_) => TypeId::Double,
            DataType::Decimal(_) => TypeId::Decimal,
            DataType::Boolean => TypeId::Boolean,
            DataType::Time(_) => TypeId::Time,
            DataType::Date(_) => TypeId::Date,
            DataType::DateOnly => TypeId::DateOnly,
            DataType::Uuid(_) => TypeId::Uuid,
            DataType::Json(_) => TypeId::Json,
            DataType::Jsonb(_) => TypeId::Jsonb,
            DataType::Hstore => TypeId::Hstore,
            DataType::Blob(_) => TypeId::Blob,
            DataType::Enum(_) => TypeId::Enum,
            DataType::Array(_) => TypeId::Array,
            DataType::Range(_) => TypeId::Range,
            DataType::Geometry(_) => TypeId::Geometry,
            DataType::Geography(_) => TypeId::Geography,
            DataType::Cidr => TypeId::Cidr,
            DataType::Inet => TypeId::Inet,
            DataType::MacAddr => TypeId::MacAddr,
            DataType::MacAddr8 => TypeId::MacAddr8,
            DataType::TsVector => TypeId::TsVector,
            DataType::Virtual(_) => TypeId::Virtual,
        }
    }

    /// `VARCHAR(length)`
    pub fn string(length: u32) -> Self {
        Self::String(StringOptions {
            length,
            binary: false,
        })
    }

    pub fn char(length: u32) -> Self {
        Self::Char(StringOptions {
            length,
            binary: false,
        })
    }

    pub fn text() -> Self {
        Self::Text(None)
    }

    pub fn integer() -> Self {
        Self::Integer(IntegerOptions::default())
    }

    pub fn bigint() -> Self {
        Self::BigInt(IntegerOptions::default())
    }

    /// Build an integer kind from its identifier.
    pub fn integer_of(type_id: TypeId, options: IntegerOptions) -> Result<Self> {
        Ok(match type_id {
            TypeId::TinyInt => Self::TinyInt(options),
            TypeId::SmallInt => Self::SmallInt(options),
            TypeId::MediumInt => Self::MediumInt(options),
            TypeId::Integer => Self::Integer(options),
            TypeId::BigInt => Self::BigInt(options),
            other => {
                return Err(TypeError::invalid_definition(
                    other,
                    "not an integer data type",
                ))
            }
        })
    }

    pub fn float() -> Self {
        Self::Float(NumericOptions::default())
    }

    /// Deprecated single precision `REAL`.
    pub fn real() -> Self {
        Self::Real(NumericOptions::default())
    }

    pub fn double() -> Self {
        Self::Double(NumericOptions::default())
    }

    /// `DECIMAL(precision, scale)`
    pub fn decimal(precision: u32, scale: u32) -> Result<Self> {
        if scale > precision {
            return Err(TypeError::invalid_definition(
                TypeId::Decimal,
                format!("scale {scale} cannot exceed precision {precision}"),
            ));
        }
        Ok(Self::Decimal(NumericOptions {
            precision: Some(precision),
            scale: Some(scale),
            ..Default::default()
        }))
    }

    /// Unconstrained `DECIMAL`
    pub fn decimal_unconstrained() -> Self {
        Self::Decimal(NumericOptions::default())
    }

    pub fn boolean() -> Self {
        Self::Boolean
    }

    pub fn date() -> Self {
        Self::Date(TimeOptions::default())
    }

    pub fn dateonly() -> Self {
        Self::DateOnly
    }

    pub fn uuid() -> Self {
        Self::Uuid(UuidVersion::All)
    }

    pub fn json() -> Self {
        Self::Json(JsonOptions::default())
    }

    pub fn blob() -> Self {
        Self::Blob(None)
    }

    /// ENUM from an explicit ordered member list.
    pub fn enumeration<I, S>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(TypeError::invalid_definition(
                TypeId::Enum,
                "an enum needs at least one member",
            ));
        }
        Ok(Self::Enum(EnumOptions { values }))
    }

    /// ENUM mirroring a host enumeration: every key must equal its value.
    pub fn enum_from_mapping<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut values = Vec::new();
        for (key, value) in entries {
            if key != value {
                return Err(TypeError::invalid_definition(
                    TypeId::Enum,
                    format!(
                        "enum mapping keys must equal their values, but key '{key}' maps to '{value}'"
                    ),
                ));
            }
            values.push(value.to_string());
        }
        Self::enumeration(values)
    }

    /// ENUM from a JSON array of members or a JSON object mapping.
    pub fn enum_from_json(members: &serde_json::Value) -> Result<Self> {
        match members {
            serde_json::Value::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        serde_json::Value::String(s) => values.push(s.clone()),
                        other => {
                            return Err(TypeError::invalid_definition(
                                TypeId::Enum,
                                format!("enum members must be strings, got {other}"),
                            ))
                        }
                    }
                }
                Self::enumeration(values)
            }
            serde_json::Value::Object(map) => {
                let mut pairs = Vec::with_capacity(map.len());
                for (key, value) in map {
                    match value {
                        serde_json::Value::String(s) => pairs.push((key.as_str(), s.as_str())),
                        other => {
                            return Err(TypeError::invalid_definition(
                                TypeId::Enum,
                                format!("enum members must be strings, got {other}"),
                            ))
                        }
                    }
                }
                Self::enum_from_mapping(pairs)
            }
            other => Err(TypeError::invalid_definition(
                TypeId::Enum,
                format!("expected a list of members or a mapping, got {other}"),
            )),
        }
    }

    pub fn array(element: impl Into<Descriptor>) -> Self {
        Self::Array(ArrayOptions {
            element: Box::new(element.into()),
        })
    }

    pub fn range(subtype: impl Into<Descriptor>) -> Self {
        Self::Range(RangeOptions {
            subtype: Box::new(subtype.into()),
        })
    }

    pub fn geometry(geometry_type: Option<GeometryType>, srid: Option<u32>) -> Self {
        Self::Geometry(GeometryOptions {
            geometry_type,
            srid,
        })
    }

    pub fn virtual_field<I, S>(return_type: Option<Descriptor>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Virtual(VirtualOptions {
            return_type: return_type.map(Box::new),
            attribute_dependencies: dependencies.into_iter().map(Into::into).collect(),
        })
    }

    /// Nested descriptors of composite types.
    pub fn children(&self) -> Vec<&Descriptor> {
        match self {
            DataType::Array(opts) => vec![opts.element.as_ref()],
            DataType::Range(opts) => vec![opts.subtype.as_ref()],
            DataType::Virtual(opts) => opts.return_type.iter().map(|d| d.as_ref()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Descriptor> {
        match self {
            DataType::Array(opts) => vec![opts.element.as_mut()],
            DataType::Range(opts) => vec![opts.subtype.as_mut()],
            DataType::Virtual(opts) => opts.return_type.iter_mut().map(|d| d.as_mut()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn integer_options(&self) -> Option<&IntegerOptions> {
        match self {
            DataType::TinyInt(o)
            | DataType::SmallInt(o)
            | DataType::MediumInt(o)
            | DataType::Integer(o)
            | DataType::BigInt(o) => Some(o),
            _ => None,
        }
    }

    pub fn integer_options_mut(&mut self) -> Option<&mut IntegerOptions> {
        match self {
            DataType::TinyInt(o)
            | DataType::SmallInt(o)
            | DataType::MediumInt(o)
            | DataType::Integer(o)
            | DataType::BigInt(o) => Some(o),
            _ => None,
        }
    }

    pub fn numeric_options(&self) -> Option<&NumericOptions> {
        match self {
            DataType::Float(o)
            | DataType::Real(o)
            | DataType::Double(o)
            | DataType::Decimal(o) => Some(o),
            _ => None,
        }
    }

    pub fn numeric_options_mut(&mut self) -> Option<&mut NumericOptions> {
        match self {
            DataType::Float(o)
            | DataType::Real(o)
            | DataType::Double(o)
            | DataType::Decimal(o) => Some(o),
            _ => None,
        }
    }

    pub fn string_options(&self) -> Option<&StringOptions> {
        match self {
            DataType::String(o) | DataType::Char(o) => Some(o),
            _ => None,
        }
    }

    pub fn time_options(&self) -> Option<&TimeOptions> {
        match self {
            DataType::Time(o) | DataType::Date(o) => Some(o),
            _ => None,
        }
    }

    pub fn geometry_options(&self) -> Option<&GeometryOptions> {
        match self {
            DataType::Geometry(o) | DataType::Geography(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.integer_options().is_some() || self.numeric_options().is_some()
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            DataType::String(_) | DataType::Char(_) | DataType::Text(_) | DataType::Citext
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Time(_) | DataType::Date(_) | DataType::DateOnly
        )
    }

    fn to_yaml(&self) -> serde_yaml::Value {
        use serde_yaml::{Mapping, Value as Yaml};

        let mut map = Mapping::new();
        let name = self.type_id().as_str().to_ascii_lowercase();
        map.insert("type".into(), Yaml::String(name.clone()));

        match self {
            DataType::String(o) | DataType::Char(o) => {
                map.insert("length".into(), o.length.into());
                if o.binary {
                    map.insert("binary".into(), true.into());
                }
            }
            DataType::Text(Some(len)) | DataType::Blob(Some(len)) => {
                map.insert("length".into(), len.as_str().into());
            }
            DataType::TinyInt(o)
            | DataType::SmallInt(o)
            | DataType::MediumInt(o)
            | DataType::Integer(o)
            | DataType::BigInt(o) => {
                if let Some(length) = o.length {
                    map.insert("length".into(), length.into());
                }
                if o.unsigned {
                    map.insert("unsigned".into(), true.into());
                }
                if o.zerofill {
                    map.insert("zerofill".into(), true.into());
                }
            }
            DataType::Float(o)
            | DataType::Real(o)
            | DataType::Double(o)
            | DataType::Decimal(o) => {
                if let Some(p) = o.precision {
                    map.insert("precision".into(), p.into());
                }
                if let Some(s) = o.scale {
                    map.insert("scale".into(), s.into());
                }
                if o.unsigned {
                    map.insert("unsigned".into(), true.into());
                }
                if o.zerofill {
                    map.insert("zerofill".into(), true.into());
                }
            }
            DataType::Time(o) | DataType::Date(o) => {
                if let Some(p) = o.precision {
                    map.insert("precision".into(), u32::from(p).into());
                }
            }
            DataType::Uuid(version) => {
                let v = match version {
                    UuidVersion::V1 => Yaml::from(1),
                    UuidVersion::V4 => Yaml::from(4),
                    UuidVersion::All => return Yaml::String(name),
                };
                map.insert("version".into(), v);
            }
            DataType::Json(o) | DataType::Jsonb(o) => {
                if let Some(null_json) = o.null_json {
                    map.insert("null_json".into(), null_json.as_str().into());
                }
            }
            DataType::Enum(o) => {
                let values = o.values.iter().map(|v| Yaml::String(v.clone())).collect();
                map.insert("values".into(), Yaml::Sequence(values));
            }
            DataType::Array(o) => {
                map.insert("element".into(), o.element.data_type().to_yaml());
            }
            DataType::Range(o) => {
                map.insert("subtype".into(), o.subtype.data_type().to_yaml());
            }
            DataType::Geometry(o) | DataType::Geography(o) => {
                if let Some(t) = o.geometry_type {
                    map.insert("geometry_type".into(), t.sql_name().into());
                }
                if let Some(srid) = o.srid {
                    map.insert("srid".into(), srid.into());
                }
            }
            DataType::Virtual(o) => {
                if let Some(rt) = &o.return_type {
                    map.insert("return_type".into(), rt.data_type().to_yaml());
                }
                if !o.attribute_dependencies.is_empty() {
                    let deps = o
                        .attribute_dependencies
                        .iter()
                        .map(|d| Yaml::String(d.clone()))
                        .collect();
                    map.insert("dependencies".into(), Yaml::Sequence(deps));
                }
            }
            _ => {}
        }

        if map.len() == 1 {
            Yaml::String(name)
        } else {
            Yaml::Mapping(map)
        }
    }
}

// Supports both the simple string format ("text", "integer") and the object
// format ({"type": "string", "length": 80}).

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_yaml().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error, MapAccess, Visitor};

        struct DataTypeVisitor;

        impl<'de> Visitor<'de> for DataTypeVisitor {
            type Value = DataType;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or map representing a data type")
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
            where
                E: Error,
            {
                build_data_type(value, &HashMap::new()).map_err(E::custom)
            }

            fn visit_map<M>(self, mut map: M) -> std::result::Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut type_name: Option<String> = None;
                let mut fields: HashMap<String, serde_yaml::Value> = HashMap::new();

                while let Some(key) = map.next_key::<String>()? {
                    if key == "type" {
                        type_name = Some(map.next_value()?);
                    } else {
                        fields.insert(key, map.next_value()?);
                    }
                }

                let type_name = type_name.ok_or_else(|| M::Error::missing_field("type"))?;
                build_data_type(&type_name, &fields).map_err(M::Error::custom)
            }
        }

        deserializer.deserialize_any(DataTypeVisitor)
    }
}

type Fields = HashMap<String, serde_yaml::Value>;

fn build_data_type(name: &str, fields: &Fields) -> std::result::Result<DataType, String> {
    let data_type = match name.to_ascii_lowercase().as_str() {
        "string" | "varchar" => DataType::String(string_options(fields)?),
        "char" => DataType::Char(string_options(fields)?),
        "text" => DataType::Text(length_class(fields)?),
        "citext" => DataType::Citext,
        "tinyint" | "tiny_int" => DataType::TinyInt(integer_options(fields)?),
        "smallint" | "small_int" => DataType::SmallInt(integer_options(fields)?),
        "mediumint" | "medium_int" => DataType::MediumInt(integer_options(fields)?),
        "integer" | "int" => DataType::Integer(integer_options(fields)?),
        "bigint" | "big_int" => DataType::BigInt(integer_options(fields)?),
        "float" => DataType::Float(numeric_options(TypeId::Float, fields)?),
        "real" => DataType::Real(numeric_options(TypeId::Real, fields)?),
        "double" => DataType::Double(numeric_options(TypeId::Double, fields)?),
        "decimal" | "numeric" => DataType::Decimal(numeric_options(TypeId::Decimal, fields)?),
        "boolean" | "bool" => DataType::Boolean,
        "time" => DataType::Time(time_options(fields)?),
        "date" | "datetime" => DataType::Date(time_options(fields)?),
        "dateonly" | "date_only" => DataType::DateOnly,
        "uuid" => {
            let version = match fields.get("version") {
                None => UuidVersion::All,
                Some(serde_yaml::Value::Number(n)) => n.to_string().parse()?,
                Some(serde_yaml::Value::String(s)) => s.parse()?,
                Some(other) => return Err(format!("invalid field 'version': {other:?}")),
            };
            DataType::Uuid(version)
        }
        "json" => DataType::Json(json_options(fields)?),
        "jsonb" => DataType::Jsonb(json_options(fields)?),
        "hstore" => DataType::Hstore,
        "blob" => DataType::Blob(length_class(fields)?),
        "enum" => {
            let members: serde_json::Value = get_field_required(fields, "values")?;
            DataType::enum_from_json(&members).map_err(|e| e.to_string())?
        }
        "array" => {
            let element: DataType = get_field_required(fields, "element")?;
            DataType::array(element)
        }
        "range" => {
            let subtype: DataType =
                get_field(fields, "subtype")?.unwrap_or_else(DataType::integer);
            DataType::range(subtype)
        }
        "geometry" => DataType::Geometry(geometry_options(fields)?),
        "geography" => DataType::Geography(geometry_options(fields)?),
        "cidr" => DataType::Cidr,
        "inet" => DataType::Inet,
        "macaddr" => DataType::MacAddr,
        "macaddr8" => DataType::MacAddr8,
        "tsvector" => DataType::TsVector,
        "virtual" => {
            let return_type: Option<DataType> = get_field(fields, "return_type")?;
            let dependencies: Vec<String> = get_field(fields, "dependencies")?.unwrap_or_default();
            DataType::virtual_field(return_type.map(Descriptor::new), dependencies)
        }
        _ => return Err(format!("unknown type: {name}")),
    };
    Ok(data_type)
}

fn string_options(fields: &Fields) -> std::result::Result<StringOptions, String> {
    let defaults = StringOptions::default();
    Ok(StringOptions {
        length: get_field(fields, "length")?.unwrap_or(defaults.length),
        binary: get_field(fields, "binary")?.unwrap_or(false),
    })
}

fn length_class(fields: &Fields) -> std::result::Result<Option<LengthClass>, String> {
    get_field::<String>(fields, "length")?
        .map(|s| s.parse())
        .transpose()
}

fn integer_options(fields: &Fields) -> std::result::Result<IntegerOptions, String> {
    Ok(IntegerOptions {
        length: get_field(fields, "length")?,
        unsigned: get_field(fields, "unsigned")?.unwrap_or(false),
        zerofill: get_field(fields, "zerofill")?.unwrap_or(false),
    })
}

fn numeric_options(type_id: TypeId, fields: &Fields) -> std::result::Result<NumericOptions, String> {
    let precision = get_field(fields, "precision")?;
    let mut scale = get_field(fields, "scale")?;
    if type_id == TypeId::Decimal && precision.is_some() && scale.is_none() {
        scale = Some(0);
    }
    let options = NumericOptions {
        precision,
        scale,
        unsigned: get_field(fields, "unsigned")?.unwrap_or(false),
        zerofill: get_field(fields, "zerofill")?.unwrap_or(false),
    };
    options.check(type_id).map_err(|e| e.to_string())?;
    Ok(options)
}

fn time_options(fields: &Fields) -> std::result::Result<TimeOptions, String> {
    Ok(TimeOptions {
        precision: get_field(fields, "precision")?,
    })
}

fn json_options(fields: &Fields) -> std::result::Result<JsonOptions, String> {
    Ok(JsonOptions {
        null_json: get_field(fields, "null_json")?,
    })
}

fn geometry_options(fields: &Fields) -> std::result::Result<GeometryOptions, String> {
    let geometry_type = get_field::<String>(fields, "geometry_type")?
        .map(|s| s.parse())
        .transpose()?;
    Ok(GeometryOptions {
        geometry_type,
        srid: get_field(fields, "srid")?,
    })
}

// Helper functions for deserialization
fn get_field<T: DeserializeOwned>(fields: &Fields, key: &str) -> std::result::Result<Option<T>, String> {
    fields
        .get(key)
        .map(|v| {
            serde_yaml::from_value(v.clone()).map_err(|e| format!("invalid field '{key}': {e}"))
        })
        .transpose()
}

fn get_field_required<T: DeserializeOwned>(
    fields: &Fields,
    key: &'static str,
) -> std::result::Result<T, String> {
    get_field(fields, key)?.ok_or_else(|| format!("missing field '{key}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_bounds() {
        assert_eq!(TypeId::TinyInt.integer_bounds(false), Some((-128, 127)));
        assert_eq!(TypeId::SmallInt.integer_bounds(true), Some((0, 65535)));
        assert_eq!(
            TypeId::BigInt.integer_bounds(true),
            Some((0, 18_446_744_073_709_551_615))
        );
        assert_eq!(TypeId::Text.integer_bounds(false), None);
    }

    #[test]
    fn test_enumeration_rejects_empty() {
        let err = DataType::enumeration(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, TypeError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_enum_from_mapping_requires_equal_keys() {
        let ok = DataType::enum_from_mapping([("admin", "admin"), ("user", "user")]).unwrap();
        assert_eq!(
            ok,
            DataType::Enum(EnumOptions {
                values: vec!["admin".into(), "user".into()]
            })
        );
        assert!(DataType::enum_from_mapping([("admin", "ADMIN")]).is_err());
    }

    #[test]
    fn test_enum_from_json_rejects_non_strings() {
        let err = DataType::enum_from_json(&serde_json::json!(["a", 1])).unwrap_err();
        assert!(err.to_string().contains("must be strings"));
    }

    #[test]
    fn test_decimal_scale_cannot_exceed_precision() {
        assert!(DataType::decimal(5, 2).is_ok());
        assert!(DataType::decimal(2, 5).is_err());
    }

    #[test]
    fn test_deserialize_simple_string() {
        let parsed: DataType = serde_yaml::from_str("text").unwrap();
        assert_eq!(parsed, DataType::Text(None));

        let parsed: DataType = serde_yaml::from_str("int").unwrap();
        assert_eq!(parsed, DataType::integer());

        let parsed: DataType = serde_yaml::from_str("uuid").unwrap();
        assert_eq!(parsed, DataType::uuid());

        let parsed: DataType = serde_yaml::from_str("real").unwrap();
        assert_eq!(parsed, DataType::real());
        assert_eq!(parsed.type_id(), TypeId::Real);
    }

    #[test]
    fn test_deserialize_complex_types() {
        let yaml = r#"
type: string
length: 80
"#;
        let parsed: DataType = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed, DataType::string(80));

        let yaml = r#"
type: decimal
precision: 10
"#;
        let parsed: DataType = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed, DataType::decimal(10, 0).unwrap());

        let yaml = r#"
type: array
element:
  type: enum
  values: [admin, user]
"#;
        let parsed: DataType = serde_yaml::from_str(yaml).unwrap();
        let expected = DataType::array(DataType::enumeration(["admin", "user"]).unwrap());
        assert_eq!(parsed, expected);

        let parsed: DataType = serde_yaml::from_str("type: range").unwrap();
        assert_eq!(parsed, DataType::range(DataType::integer()));
    }

    #[test]
    fn test_deserialize_rejects_bad_options() {
        assert!(serde_yaml::from_str::<DataType>("type: text\nlength: huge").is_err());
        assert!(serde_yaml::from_str::<DataType>("type: float\nscale: 2").is_err());
        assert!(serde_yaml::from_str::<DataType>("type: enum\nvalues: []").is_err());
        assert!(serde_yaml::from_str::<DataType>("nonsense").is_err());
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let types = vec![
            DataType::boolean(),
            DataType::string(80),
            DataType::decimal(10, 2).unwrap(),
            DataType::Real(NumericOptions {
                precision: Some(11),
                scale: Some(12),
                unsigned: true,
                zerofill: false,
            }),
            DataType::Text(Some(LengthClass::Medium)),
            DataType::array(DataType::integer()),
            DataType::enumeration(["a", "b"]).unwrap(),
            DataType::geometry(Some(GeometryType::Point), Some(4326)),
            DataType::Uuid(UuidVersion::V4),
        ];

        for ty in types {
            let yaml = serde_yaml::to_string(&ty).unwrap();
            let parsed: DataType = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(ty, parsed);
        }
    }
}
