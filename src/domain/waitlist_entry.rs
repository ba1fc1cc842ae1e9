use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::waitlist_email::WaitlistEmail;

/// One signup as it is persisted in the store.
///
/// Only `email` has to be a string for an entry to be usable. Entries read
/// back from disk are not validated again, and whatever else they carry is
/// written back as found.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WaitlistEntry {
    pub email: String,
    #[serde(default, skip_serializing_if = "EntryTimestamp::is_missing")]
    pub timestamp: EntryTimestamp,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum EntryTimestamp {
    Recorded(#[serde(with = "iso_timestamp")] DateTime<Utc>),
    /// Not an RFC 3339 string, kept verbatim.
    Unrecognized(Value),
    #[default]
    Missing,
}

impl EntryTimestamp {
    pub fn is_missing(&self) -> bool {
        matches!(self, EntryTimestamp::Missing)
    }

    pub fn recorded(&self) -> Option<DateTime<Utc>> {
        match self {
            EntryTimestamp::Recorded(timestamp) => Some(*timestamp),
            _ => None,
        }
    }
}

impl WaitlistEntry {
    pub fn new(email: WaitlistEmail) -> WaitlistEntry {
        WaitlistEntry {
            email: email.as_ref().to_owned(),
            timestamp: EntryTimestamp::Recorded(Utc::now()),
            extra: Map::new(),
        }
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-05-01T12:00:00.123Z`.
mod iso_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;

        DateTime::parse_from_rfc3339(&raw)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
