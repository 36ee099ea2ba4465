//! Parameter mappings and their query-string encoding.
//!
//! `Parameters` is an ordered map, so every encoding of the same mapping
//! yields the same item order. Callers should still not rely on a specific
//! order beyond "each key appears exactly once".

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Characters left bare in query names and values: ASCII alphanumerics and
/// `-._~`. Everything else, including space, `&`, `=`, `?`, `#`, `/` and all
/// non-ASCII bytes, is escaped.
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Key-value mapping used for URL, body and form parameters.
pub type Parameters = BTreeMap<String, ParamValue>;

/// A JSON-shaped parameter value.
///
/// `Float` accepts any `f64`; non-finite values are not representable in JSON
/// and make every encoding of them fail, in bodies and query strings alike.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ParamValue>),
    Map(Parameters),
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ParamValue::Null => serializer.serialize_unit(),
            ParamValue::Bool(b) => serializer.serialize_bool(*b),
            ParamValue::Int(i) => serializer.serialize_i64(*i),
            ParamValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            ParamValue::Float(f) => Err(S::Error::custom(format!("{f} is not a valid JSON number"))),
            ParamValue::String(s) => serializer.serialize_str(s),
            ParamValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ParamValue::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl ParamValue {
    /// Text form used in query strings and form bodies. Scalars render bare,
    /// nested values render as compact JSON.
    pub fn to_query_value(&self) -> Result<String> {
        match self {
            ParamValue::Null => Ok("null".to_string()),
            ParamValue::Bool(b) => Ok(b.to_string()),
            ParamValue::Int(i) => Ok(i.to_string()),
            ParamValue::Float(x) if x.is_finite() => Ok(x.to_string()),
            ParamValue::Float(x) => Err(Error::Encoding(format!("{x} is not a valid JSON number"))),
            ParamValue::String(s) => Ok(s.clone()),
            ParamValue::List(_) | ParamValue::Map(_) => {
                serde_json::to_string(self).map_err(|e| Error::Encoding(e.to_string()))
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(value: Vec<T>) -> Self {
        ParamValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<Parameters> for ParamValue {
    fn from(value: Parameters) -> Self {
        ParamValue::Map(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Int(i),
                None => ParamValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => ParamValue::String(s),
            Value::Array(items) => ParamValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => ParamValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

/// Build a [`Parameters`] map from `(key, value)` pairs.
pub fn params<I, K, V>(pairs: I) -> Parameters
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<ParamValue>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_SAFE).to_string()
}

/// One `(name, value)` query item per key, both percent-encoded.
///
/// Fails with [`Error::Encoding`] when a value, or anything nested in it, is
/// a non-finite float.
pub fn to_query_items(parameters: &Parameters) -> Result<Vec<(String, String)>> {
    parameters
        .iter()
        .map(|(name, value)| Ok((encode_component(name), encode_component(&value.to_query_value()?))))
        .collect()
}

/// `name=value` items joined with `&`, already percent-encoded.
pub fn to_query_string(parameters: &Parameters) -> Result<String> {
    Ok(to_query_items(parameters)?
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&"))
}
