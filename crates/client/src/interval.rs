//! Lenient decoding of the timestamps and durations the backend emits.
//!
//! The backend is inconsistent across endpoints: timestamps arrive as
//! RFC 3339 strings, naive `YYYY-MM-DD HH:MM:SS` strings, or epoch
//! milliseconds; durations arrive as PostgreSQL interval objects, interval
//! text, or plain seconds. Everything is normalised to [`Timestamp`] and
//! integer milliseconds here.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use linewatch_core::types::Timestamp;

const MS_PER_SECOND: f64 = 1_000.0;
const SECS_PER_MINUTE: f64 = 60.0;
const SECS_PER_HOUR: f64 = 3_600.0;
const SECS_PER_DAY: f64 = 86_400.0;

/// PostgreSQL interval text: `"3 days 02:03:04.5"`, `"1 day"`,
/// `"-00:00:05"`, `"00:15:00"`.
static INTERVAL_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<days>-?\d+)\s+days?)?\s*(?:(?P<sign>-)?(?P<h>\d+):(?P<m>\d{1,2}):(?P<s>\d{1,2}(?:\.\d+)?))?$",
    )
    .expect("valid regex")
});

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parse a timestamp string. Naive strings are taken as UTC.
pub fn parse_timestamp_str(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn timestamp_from_value(value: &Value) -> Result<Option<Timestamp>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_timestamp_str(s)
            .map(Some)
            .ok_or_else(|| format!("unrecognised timestamp '{s}'")),
        Value::Number(n) => {
            let ms = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| format!("invalid epoch milliseconds {n}"))?;
            if ms == 0 {
                return Ok(None);
            }
            DateTime::from_timestamp_millis(ms)
                .map(Some)
                .ok_or_else(|| format!("epoch milliseconds {ms} out of range"))
        }
        other => Err(format!("expected timestamp, found {other}")),
    }
}

/// `deserialize_with` helper for a required timestamp.
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    timestamp_from_value(&value)
        .map_err(serde::de::Error::custom)?
        .ok_or_else(|| serde::de::Error::custom("missing timestamp"))
}

/// `deserialize_with` helper for an optional timestamp. `null`, empty
/// strings and `0` all mean "not set".
pub fn deserialize_opt_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    timestamp_from_value(&value).map_err(serde::de::Error::custom)
}

// ---------------------------------------------------------------------------
// Intervals
// ---------------------------------------------------------------------------

/// Parse PostgreSQL interval text (or a bare number of seconds) into
/// milliseconds.
pub fn parse_interval_str(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(secs) = raw.parse::<f64>() {
        return secs
            .is_finite()
            .then(|| (secs * MS_PER_SECOND).round() as i64);
    }

    let caps = INTERVAL_TEXT_RE.captures(raw)?;
    if caps.name("days").is_none() && caps.name("h").is_none() {
        return None;
    }

    let days: f64 = caps
        .name("days")
        .map_or(Ok(0.0), |m| m.as_str().parse::<f64>())
        .ok()?;
    let mut clock = 0.0;
    if let (Some(h), Some(m), Some(s)) = (caps.name("h"), caps.name("m"), caps.name("s")) {
        clock = h.as_str().parse::<f64>().ok()? * SECS_PER_HOUR
            + m.as_str().parse::<f64>().ok()? * SECS_PER_MINUTE
            + s.as_str().parse::<f64>().ok()?;
        if caps.name("sign").is_some() {
            clock = -clock;
        }
    }

    Some(((days * SECS_PER_DAY + clock) * MS_PER_SECOND).round() as i64)
}

/// Convert a `{days, hours, minutes, seconds, milliseconds}` object into
/// milliseconds. Missing parts count as zero.
fn interval_object_ms(map: &serde_json::Map<String, Value>) -> i64 {
    let part = |key: &str| map.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    let secs = part("days") * SECS_PER_DAY
        + part("hours") * SECS_PER_HOUR
        + part("minutes") * SECS_PER_MINUTE
        + part("seconds");
    (secs * MS_PER_SECOND + part("milliseconds")).round() as i64
}

fn interval_from_value(value: &Value) -> Result<Option<i64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(|secs| Some((secs * MS_PER_SECOND).round() as i64))
            .ok_or_else(|| format!("invalid interval {n}")),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_interval_str(s)
            .map(Some)
            .ok_or_else(|| format!("unrecognised interval '{s}'")),
        Value::Object(map) => Ok(Some(interval_object_ms(map))),
        other => Err(format!("expected interval, found {other}")),
    }
}

/// `deserialize_with` helper for an optional interval, yielding
/// milliseconds.
pub fn deserialize_opt_interval_ms<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    interval_from_value(&value).map_err(serde::de::Error::custom)
}
