//! JSON encoding and decoding with a configurable key casing.
//!
//! Key rewriting works on the `serde_json::Value` tree, so it applies to any
//! `Serialize`/`Deserialize` type without per-type attributes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// How object keys are rewritten on their way through the codec.
///
/// Encoding rewrites every outgoing key into the casing. Decoding rewrites
/// every incoming key into the casing before deserializing, so
/// `SnakeCase` maps a camelCase wire format onto ordinary Rust field names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyCasing {
    #[default]
    Verbatim,
    SnakeCase,
    CamelCase,
}

impl KeyCasing {
    pub fn apply(&self, key: &str) -> String {
        match self {
            KeyCasing::Verbatim => key.to_string(),
            KeyCasing::SnakeCase => to_snake_case(key),
            KeyCasing::CamelCase => to_camel_case(key),
        }
    }

    fn rewrite(&self, value: Value) -> Value {
        if *self == KeyCasing::Verbatim {
            return value;
        }
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (self.apply(&k), self.rewrite(v)))
                    .collect::<Map<_, _>>(),
            ),
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.rewrite(v)).collect()),
            other => other,
        }
    }
}

/// Serialize `value` to JSON bytes, rewriting keys per `casing`.
pub fn encode<T: Serialize + ?Sized>(value: &T, casing: KeyCasing) -> Result<Vec<u8>> {
    let tree = serde_json::to_value(value).map_err(|e| Error::Encoding(e.to_string()))?;
    serde_json::to_vec(&casing.rewrite(tree)).map_err(|e| Error::Encoding(e.to_string()))
}

/// Deserialize JSON `bytes` into `T`, rewriting keys per `casing` first.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], casing: KeyCasing) -> Result<T> {
    let tree: Value = serde_json::from_slice(bytes).map_err(|e| Error::Decoding(e.to_string()))?;
    serde_json::from_value(casing.rewrite(tree)).map_err(|e| Error::Decoding(e.to_string()))
}

/// Split an identifier into lowercase words on `_`, `-` and case changes.
fn words(key: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = key.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev_upper = chars[i - 1].is_uppercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // "userID" splits before I; "HTTPServer" splits before S only.
            if !prev_upper || next_lower {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn to_snake_case(key: &str) -> String {
    words(key).join("_")
}

fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, word) in words(key).into_iter().enumerate() {
        if i == 0 {
            out.push_str(&word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
