//! Type-system options shared by every descriptor bound to a dialect.
//!
//! Options are usually loaded from YAML:
//!
//! ```yaml
//! timezone: "+02:00"        # or an IANA name such as Europe/Paris
//! null_json_stringification: json   # json | sql | explicit
//! ```

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Errors raised while loading options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// What a host `Null` means when written to a JSON column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullJsonStringification {
    /// Stored as the JSON literal `null`
    #[default]
    Json,
    /// Stored as SQL NULL
    Sql,
    /// Rejected; callers must be explicit
    Explicit,
}

impl NullJsonStringification {
    pub fn as_str(&self) -> &'static str {
        match self {
            NullJsonStringification::Json => "json",
            NullJsonStringification::Sql => "sql",
            NullJsonStringification::Explicit => "explicit",
        }
    }
}

impl FromStr for NullJsonStringification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sql" => Ok(Self::Sql),
            "explicit" => Ok(Self::Explicit),
            other => Err(format!(
                "unknown null JSON handling '{other}', expected json, sql or explicit"
            )),
        }
    }
}

/// Time zone date-times are rendered in before being sent to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeZoneSetting {
    Offset(FixedOffset),
    Named(chrono_tz::Tz),
}

impl Default for TimeZoneSetting {
    fn default() -> Self {
        TimeZoneSetting::Offset(Utc.fix())
    }
}

impl TimeZoneSetting {
    /// Offset in effect at the given instant.
    pub fn offset_at(&self, instant: &DateTime<Utc>) -> FixedOffset {
        match self {
            TimeZoneSetting::Offset(offset) => *offset,
            TimeZoneSetting::Named(tz) => tz.offset_from_utc_datetime(&instant.naive_utc()).fix(),
        }
    }

    /// Re-express `instant` in this time zone.
    pub fn convert(&self, instant: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let utc = instant.with_timezone(&Utc);
        utc.with_timezone(&self.offset_at(&utc))
    }

    /// Offset to assume for a local wall-clock time.
    pub fn offset_for_local(&self, local: &chrono::NaiveDateTime) -> FixedOffset {
        match self {
            TimeZoneSetting::Offset(offset) => *offset,
            TimeZoneSetting::Named(tz) => tz
                .offset_from_local_datetime(local)
                .earliest()
                .map(|o| o.fix())
                .unwrap_or_else(|| tz.offset_from_utc_datetime(local).fix()),
        }
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl FromStr for TimeZoneSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('+') || trimmed.starts_with('-') {
            return parse_offset(trimmed)
                .map(TimeZoneSetting::Offset)
                .ok_or_else(|| format!("invalid time zone offset '{trimmed}'"));
        }
        trimmed
            .parse::<chrono_tz::Tz>()
            .map(TimeZoneSetting::Named)
            .map_err(|e| format!("invalid time zone '{trimmed}': {e}"))
    }
}

impl TryFrom<String> for TimeZoneSetting {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeZoneSetting> for String {
    fn from(value: TimeZoneSetting) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneSetting::Offset(offset) => write!(f, "{offset}"),
            TimeZoneSetting::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

/// Options consulted by descriptors once they are bound to a dialect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeSystemOptions {
    pub timezone: TimeZoneSetting,
    pub null_json_stringification: NullJsonStringification,
}

impl TypeSystemOptions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}
