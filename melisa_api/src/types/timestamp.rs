use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MelisaError;

/// Seconds between the unix epoch and the Discord epoch.
pub const DISCORD_EPOCH: i64 = 1_420_070_400;

/// A point in time as Discord reports it. Ordered by milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Seconds since the unix epoch. Values that land before 2015 are read
    /// as seconds since the Discord epoch instead.
    pub fn from_secs(secs: i64) -> Result<Self, MelisaError> {
        let at = from_unix(secs)?;
        if at.year() < 2015 {
            return from_unix(secs + DISCORD_EPOCH).map(Self);
        }
        Ok(Self(at))
    }

    pub fn from_secs_f64(secs: f64) -> Result<Self, MelisaError> {
        Self::from_secs(secs.trunc() as i64)
    }

    /// ISO-8601 with or without an offset. A missing offset is read as UTC.
    pub fn parse(text: &str) -> Result<Self, MelisaError> {
        if let Ok(at) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self(at.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| Self(naive.and_utc()))
            .map_err(|e| MelisaError::InvalidArgument(format!("Invalid timestamp `{text}`: {e}")))
    }

    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.as_millis() as f64 / 1000.0
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, MelisaError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| MelisaError::InvalidArgument(format!("{secs} is out of range")))
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.as_millis() == other.as_millis()
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_millis().cmp(&other.as_millis())
    }
}

impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_millis().hash(state);
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl FromStr for Timestamp {
    type Err = MelisaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
