//! DATE (a date-time), DATEONLY and TIME.

use crate::config::TimeZoneSetting;
use crate::descriptor::{Descriptor, Specialization, TypeBehavior};
use crate::error::{Result, TypeError};
use crate::values::Value;
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeZone, Utc,
};

const DATETIME_WITH_OFFSET: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

const LOCAL_DATETIME: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

const TRANSPORT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f %:z";

/// Parse the textual date-time forms accepted by DATE.
///
/// Strings without an offset are read as wall-clock time in `timezone`.
pub fn parse_datetime(input: &str, timezone: &TimeZoneSetting) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt);
    }
    for format in DATETIME_WITH_OFFSET {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Some(dt);
        }
    }
    let local = LOCAL_DATETIME
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    timezone
        .offset_for_local(&local)
        .from_local_datetime(&local)
        .single()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Infinity {
    Positive,
    Negative,
}

impl Infinity {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) if *n == f64::INFINITY => Some(Infinity::Positive),
            Value::Number(n) if *n == f64::NEG_INFINITY => Some(Infinity::Negative),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "infinity" | "+infinity" => Some(Infinity::Positive),
                "-infinity" => Some(Infinity::Negative),
                _ => None,
            },
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Infinity::Positive => "infinity",
            Infinity::Negative => "-infinity",
        }
    }

    fn as_number(self) -> f64 {
        match self {
            Infinity::Positive => f64::INFINITY,
            Infinity::Negative => f64::NEG_INFINITY,
        }
    }
}

fn check_infinity(d: &Descriptor, value: &Value, allowed: bool) -> Result<()> {
    if allowed {
        return Ok(());
    }
    let engine = d.dialect().map(|d| d.name()).unwrap_or("an unbound data type");
    Err(TypeError::mismatch(
        value,
        format!("{value} is not a valid date: infinite dates are not supported by {engine}"),
    ))
}

fn epoch_millis(n: f64) -> Option<DateTime<FixedOffset>> {
    if !n.is_finite() || n.fract() != 0.0 {
        return None;
    }
    Utc.timestamp_millis_opt(n as i64)
        .single()
        .map(|dt| dt.fixed_offset())
}

/// DATE: an instant with millisecond transport precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateType;

impl DateType {
    /// The instant `value` stands for, truncated to milliseconds.
    fn instant(d: &Descriptor, value: &Value) -> Option<DateTime<FixedOffset>> {
        let timezone = d.timezone();
        let instant = match value {
            Value::DateTime(dt) => Some(*dt),
            Value::Date(date) => {
                let local = date.and_hms_opt(0, 0, 0)?;
                timezone
                    .offset_for_local(&local)
                    .from_local_datetime(&local)
                    .single()
            }
            Value::String(s) => parse_datetime(s, &timezone),
            Value::Number(n) => epoch_millis(*n),
            _ => None,
        };
        instant.map(|dt| dt.trunc_subsecs(3))
    }

    fn infinity_allowed(d: &Descriptor) -> bool {
        d.capabilities().is_some_and(|c| c.datetime_infinity)
    }
}

impl TypeBehavior for DateType {
    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        Ok(match d.data_type().time_options().and_then(|o| o.precision) {
            Some(precision) => format!("DATETIME({precision})"),
            None => "DATETIME".to_string(),
        })
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        if Infinity::of(value).is_some() {
            return check_infinity(d, value, Self::infinity_allowed(d));
        }
        match Self::instant(d, value) {
            Some(_) => Ok(()),
            None => Err(TypeError::not_a_valid(value, "date")),
        }
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        if let Some(infinity) = Infinity::of(&value) {
            return Ok(Value::Number(infinity.as_number()));
        }
        Ok(match Self::instant(d, &value) {
            Some(dt) => Value::DateTime(dt),
            None => value,
        })
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        if let Some(infinity) = Infinity::of(&raw) {
            return Ok(Value::Number(infinity.as_number()));
        }
        match Self::instant(d, &raw) {
            Some(dt) => Ok(Value::DateTime(dt)),
            None => Err(TypeError::invalid_storage_value(d.type_id(), &raw)),
        }
    }

    fn to_transport(&self, d: &Descriptor, value: &Value) -> Result<Value> {
        if let Some(infinity) = Infinity::of(value) {
            check_infinity(d, value, Self::infinity_allowed(d))?;
            return Ok(Value::String(infinity.as_str().to_string()));
        }
        let Some(dt) = Self::instant(d, value) else {
            return Err(TypeError::not_a_valid(value, "date"));
        };
        let local = d.timezone().convert(&dt);
        Ok(Value::String(local.format(TRANSPORT_FORMAT).to_string()))
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        match (Infinity::of(a), Infinity::of(b)) {
            (Some(x), Some(y)) => return x == y,
            (None, None) => {}
            _ => return false,
        }
        match (Self::instant(d, a), Self::instant(d, b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        }
    }
}

/// DATEONLY: a calendar date canonicalized to `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateOnlyType;

impl DateOnlyType {
    fn date(d: &Descriptor, value: &Value) -> Option<NaiveDate> {
        match value {
            Value::Date(date) => Some(*date),
            Value::DateTime(dt) => Some(dt.date_naive()),
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .ok()
                .or_else(|| parse_datetime(s, &d.timezone()).map(|dt| dt.date_naive())),
            _ => None,
        }
    }

    fn infinity_allowed(d: &Descriptor) -> bool {
        d.capabilities().is_some_and(|c| c.dateonly_infinity)
    }
}

impl TypeBehavior for DateOnlyType {
    fn storage_type(&self, _d: &Descriptor) -> Result<String> {
        Ok("DATE".to_string())
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        if Infinity::of(value).is_some() {
            return check_infinity(d, value, Self::infinity_allowed(d));
        }
        match Self::date(d, value) {
            Some(_) => Ok(()),
            None => Err(TypeError::not_a_valid(value, "date")),
        }
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        if let Some(infinity) = Infinity::of(&value) {
            return Ok(Value::String(infinity.as_str().to_string()));
        }
        Ok(match Self::date(d, &value) {
            Some(date) => Value::String(date.format("%Y-%m-%d").to_string()),
            None => value,
        })
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        if Infinity::of(&raw).is_none() && Self::date(d, &raw).is_none() {
            return Err(TypeError::invalid_storage_value(d.type_id(), &raw));
        }
        self.sanitize(d, raw)
    }

    fn to_transport(&self, d: &Descriptor, value: &Value) -> Result<Value> {
        if Infinity::of(value).is_some() {
            check_infinity(d, value, Self::infinity_allowed(d))?;
        }
        match self.sanitize(d, value.clone())? {
            Value::String(s) => Ok(Value::String(s)),
            other => Err(TypeError::not_a_valid(&other, "date")),
        }
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        match (self.sanitize(d, a.clone()), self.sanitize(d, b.clone())) {
            (Ok(x), Ok(y)) => x == y,
            _ => a == b,
        }
    }
}

/// TIME of day, with optional fractional second precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeType;

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

impl TypeBehavior for TimeType {
    fn check_supported(&self, spec: &mut Specialization<'_>) -> Result<()> {
        let precision = spec.data_type.time_options().and_then(|o| o.precision);
        match precision {
            Some(p) if !spec.capabilities().time_precision => {
                Err(spec.unsupported(format!("TIME({p})")))
            }
            _ => Ok(()),
        }
    }

    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        Ok(match d.data_type().time_options().and_then(|o| o.precision) {
            Some(precision) => format!("TIME({precision})"),
            None => "TIME".to_string(),
        })
    }

    fn validate(&self, _d: &Descriptor, value: &Value) -> Result<()> {
        match value {
            Value::String(s) if parse_time(s).is_some() => Ok(()),
            Value::DateTime(_) => Ok(()),
            other => Err(TypeError::not_a_valid(other, "time")),
        }
    }

    fn sanitize(&self, d: &Descriptor, value: Value) -> Result<Value> {
        Ok(match value {
            Value::DateTime(dt) => {
                let local = d.timezone().convert(&dt);
                Value::String(local.time().format("%H:%M:%S%.f").to_string())
            }
            other => other,
        })
    }

    fn are_equivalent(&self, d: &Descriptor, a: &Value, b: &Value) -> bool {
        let time_of = |value: &Value| match self.sanitize(d, value.clone()) {
            Ok(Value::String(s)) => parse_time(&s),
            _ => None,
        };
        match (time_of(a), time_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        }
    }
}
