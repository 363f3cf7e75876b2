// Strong Types - newtypes for ids and timestamps shared by every layer
// Ids are 64-bit snowflakes and timestamps are Unix milliseconds in storage

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Current time in milliseconds since Unix epoch
pub fn current_time_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Strongly-typed entity ID - prevents confusion with counts and timestamps.
///
/// Serialized as a decimal string: snowflake ids do not fit in the
/// 53-bit safe integer range of JSON consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Create a new entity ID
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn value(self) -> i64 {
        self.0
    }

    /// Check if this is a valid ID (positive)
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<EntityId> for i64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Strongly-typed timestamp in Unix milliseconds - prevents confusion with IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Create a new timestamp
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    /// Get current time in milliseconds
    pub fn now() -> Self {
        Self(current_time_millis())
    }

    /// Get the raw timestamp value
    pub fn value(self) -> i64 {
        self.0
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_datetime() {
            Some(_) => serializer.collect_str(self),
            None => serializer.serialize_i64(self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_operations() {
        let id = EntityId::new(123);
        assert_eq!(id.value(), 123);
        assert!(id.is_valid());

        let invalid_id = EntityId::new(-1);
        assert!(!invalid_id.is_valid());
    }

    #[test]
    fn test_entity_id_serializes_as_string() {
        let id = EntityId::new(7_300_000_000_000_000_001);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"7300000000000000001\"");

        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        let from_number: EntityId = serde_json::from_str("42").unwrap();
        assert_eq!(from_number, EntityId::new(42));
    }

    #[test]
    fn test_entity_id_parse() {
        assert_eq!("  99 ".parse::<EntityId>().unwrap(), EntityId::new(99));
        assert!("abc".parse::<EntityId>().is_err());
    }

    #[test]
    fn test_timestamp_rfc3339() {
        let ts = Timestamp::new(1_700_000_000_123);
        assert_eq!(ts.to_string(), "2023-11-14T22:13:20.123Z");
        assert_eq!(
            serde_json::to_string(&ts).unwrap(),
            "\"2023-11-14T22:13:20.123Z\""
        );
    }
}
