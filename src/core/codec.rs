//! Encoding helpers shared by the transaction types
//!
//! - canonical amino JSON (sorted keys, HTML-safe escaping)
//! - serde adapters for base64 bytes and integers carried as strings

use serde::Serialize;
use serde_json::{Map, Value};

/// Serialize to the canonical JSON used for amino sign bytes
///
/// Object keys are sorted at every depth and output has no whitespace.
/// `<`, `>`, `&`, U+2028 and U+2029 are escaped the way Go's
/// `encoding/json` does.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let sorted = sort_keys(serde_json::to_value(value)?);
    let json = serde_json::to_string(&sorted)?;
    Ok(escape_like_go(&json).into_bytes())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

// These characters only ever appear inside JSON strings.
fn escape_like_go(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Serde adapter: `Vec<u8>` as standard base64
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: integers carried as decimal strings, accepting bare numbers too
pub mod string_number {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => s.trim().parse().map_err(de::Error::custom),
            StringOrNumber::Number(n) => n.to_string().parse().map_err(de::Error::custom),
        }
    }
}
