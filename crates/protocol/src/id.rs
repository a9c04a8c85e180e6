//! Platform IDs are 64-bit integers that travel as JSON strings.
//!
//! Use with `#[serde(with = "crate::id::string")]` or
//! `#[serde(with = "crate::id::option_string")]`.

use serde::{Deserialize, Deserializer, Serializer};

// Only the canonical decimal form is accepted, so a decoded id re-encodes to
// the same string. `i64::from_str` alone would take "+154" and "0154".
fn parse<E: serde::de::Error>(raw: &str) -> Result<i64, E> {
    let id = raw
        .parse::<i64>()
        .map_err(|e| E::custom(format!("invalid platform id {raw:?}: {e}")))?;
    if id.to_string() != raw {
        return Err(E::custom(format!(
            "invalid platform id {raw:?}: not in canonical form"
        )));
    }
    Ok(id)
}

pub mod string {
    use super::*;

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw)
    }
}

pub mod option_string {
    use {super::*, serde::de::Error as _};

    pub fn serialize<S: Serializer>(id: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.collect_str(id),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if raw.is_empty() => Err(D::Error::custom("empty platform id")),
            Some(raw) => parse(&raw).map(Some),
            None => Ok(None),
        }
    }
}
