use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MelisaError;

/// Milliseconds between the unix epoch and the first second of 2015.
pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

const SNOWFLAKE_MAX: u64 = i64::MAX as u64;

/// A Discord unique id.
///
/// Snowflakes are 64-bit integers laid out as
/// `timestamp(42) | worker(5) | process(5) | increment(12)`.
/// They are sent as strings on the wire and accepted as either form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(pub(crate) u64);

impl Snowflake {
    pub fn new(id: u64) -> Result<Self, MelisaError> {
        if id > SNOWFLAKE_MAX {
            return Err(MelisaError::InvalidSnowflake(format!(
                "{id} is not in the range 0..={SNOWFLAKE_MAX}"
            )));
        }
        Ok(Self(id))
    }

    /// Smallest snowflake generated at `unix_ms`. Handy as a pagination cursor.
    pub fn from_unix_millis(unix_ms: u64) -> Self {
        Self(unix_ms.saturating_sub(DISCORD_EPOCH_MS) << 22)
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self::from_unix_millis(at.timestamp_millis().max(0) as u64)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Milliseconds since the Discord epoch.
    pub fn timestamp(self) -> u64 {
        self.0 >> 22
    }

    pub fn worker_id(self) -> u64 {
        (self.0 >> 17) % 16
    }

    pub fn process_id(self) -> u64 {
        (self.0 >> 12) % 16
    }

    pub fn increment(self) -> u64 {
        self.0 % 2048
    }

    /// Milliseconds since the unix epoch.
    pub fn unix(self) -> u64 {
        self.timestamp() + DISCORD_EPOCH_MS
    }

    pub fn created_at(self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.unix() as i64)
            .single()
            .unwrap_or_default()
    }
}

impl From<u64> for Snowflake {
    /// Unchecked; values above `i64::MAX` are clamped.
    fn from(id: u64) -> Self {
        Self(id.min(SNOWFLAKE_MAX))
    }
}

impl From<Snowflake> for u64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl PartialEq<u64> for Snowflake {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

impl FromStr for Snowflake {
    type Err = MelisaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .trim()
            .parse::<u64>()
            .map_err(|_| MelisaError::InvalidSnowflake(format!("`{s}` is not an integer")))?;
        Self::new(id)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

struct SnowflakeVisitor;

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = Snowflake;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a snowflake as a string or integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Snowflake::new(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map_err(|_| E::custom("negative snowflake"))
            .and_then(|v| self.visit_u64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SnowflakeVisitor)
    }
}
