//! Timestamp normalization at the store boundary.
//!
//! Records written by different clients carry timestamps in two shapes:
//! native datetimes exported as `{ "seconds", "nanos" }` and ISO-8601
//! strings (with or without an offset). [`StoredTimestamp`] accepts both and
//! [`StoredTimestamp::normalize`] turns them into a [`Timestamp`], so models
//! and everything above them only ever see `DateTime<Utc>`.
//!
//! Model structs use the adapter modules:
//!
//! ```ignore
//! #[serde(with = "crate::timestamp::required")]
//! pub created_at: Timestamp,
//! #[serde(default, with = "crate::timestamp::optional")]
//! pub updated_at: Option<Timestamp>,
//! ```

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use eggbank_core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Native datetime as exported by document databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeTimestamp {
    pub seconds: i64,
    #[serde(default)]
    pub nanos: u32,
}

/// Either shape of a stored timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredTimestamp {
    Native(NativeTimestamp),
    Iso(String),
}

impl StoredTimestamp {
    /// Convert to UTC. Offset-less ISO strings are taken to be UTC.
    pub fn normalize(&self) -> Result<Timestamp, String> {
        match self {
            Self::Native(n) => Utc
                .timestamp_opt(n.seconds, n.nanos)
                .single()
                .ok_or_else(|| format!("timestamp out of range: {}s", n.seconds)),
            Self::Iso(s) => parse_iso(s),
        }
    }
}

fn parse_iso(s: &str) -> Result<Timestamp, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid ISO timestamp {s:?}: {e}"))
}

/// Serde adapter for required timestamp fields.
pub mod required {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        ts.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        StoredTimestamp::deserialize(deserializer)?
            .normalize()
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional timestamp fields (`null` and missing map to
/// `None`).
pub mod optional {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        ts: &Option<Timestamp>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        ts.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        Option::<StoredTimestamp>::deserialize(deserializer)?
            .map(|raw| raw.normalize())
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
