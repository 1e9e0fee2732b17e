//! Serializable converter - turns byte-string leaves into text
//!
//! Trees come in with raw byte strings mixed among text, numbers and
//! containers. Text serializers cannot take raw bytes, so every byte leaf is
//! decoded as UTF-8 before the tree goes out:
//!
//! - [`to_serializable`]: decodes byte values, leaves keys alone
//! - [`convert_all`]: decodes keys too, no fast path
//! - [`BytesAsText`]: decodes while serializing, without building a new tree
//!
//! Bytes that are not UTF-8 are a [`ProbeError::Decode`]; nothing is replaced
//! lossily.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::ProbeError;

/// Mapping key: text or raw bytes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Text(String),
    Bytes(Vec<u8>),
}

impl Key {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Key::Bytes(bytes.into())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Text(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Text(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Text(s) => write!(f, "{}", s),
            Key::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
        }
    }
}

/// In-memory tree whose leaves may be raw byte strings
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    /// Fixed-arity ordered group, kept distinct from `Seq`
    Tuple(Vec<Value>),
    Map(BTreeMap<Key, Value>),
}

impl Value {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(bytes.into())
    }

    pub fn seq<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }

    pub fn tuple<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::Tuple(items.into_iter().map(Into::into).collect())
    }

    pub fn map<K: Into<Key>, V: Into<Value>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// True for an empty `Seq`, `Tuple` or `Map`
    pub fn is_empty_container(&self) -> bool {
        match self {
            Value::Seq(items) | Value::Tuple(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Whether any value or key in the tree is still raw bytes
    pub fn contains_bytes(&self) -> bool {
        match self {
            Value::Bytes(_) => true,
            Value::Seq(items) | Value::Tuple(items) => items.iter().any(Value::contains_bytes),
            Value::Map(entries) => entries
                .iter()
                .any(|(k, v)| matches!(k, Key::Bytes(_)) || v.contains_bytes()),
            _ => false,
        }
    }

    /// Export an all-text tree as JSON. Tuples become arrays.
    ///
    /// JSON has no NaN or infinity: non-finite floats are written as `null`,
    /// the same as `serde_json` does when serializing an `f64`.
    pub fn into_json(self) -> Result<serde_json::Value, ProbeError> {
        into_json_at(self, "$")
    }
}

fn into_json_at(value: Value, path: &str) -> Result<serde_json::Value, ProbeError> {
    use serde_json::Value as Json;

    Ok(match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(b),
        Value::Int(i) => Json::from(i),
        Value::Float(f) => serde_json::Number::from_f64(f).map_or(Json::Null, Json::Number),
        Value::Text(s) => Json::String(s),
        Value::Bytes(_) => {
            return Err(ProbeError::BytesRemain {
                path: path.to_string(),
            })
        }
        Value::Seq(items) | Value::Tuple(items) => Json::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| into_json_at(item, &format!("{}[{}]", path, i)))
                .collect::<Result<_, _>>()?,
        ),
        Value::Map(entries) => {
            let mut object = serde_json::Map::with_capacity(entries.len());
            for (key, item) in entries {
                let child = format!("{}.{}", path, key);
                match key {
                    Key::Text(name) => {
                        object.insert(name, into_json_at(item, &child)?);
                    }
                    Key::Bytes(_) => return Err(ProbeError::BytesRemain { path: child }),
                }
            }
            Json::Object(object)
        }
    })
}

impl From<serde_json::Value> for Value {
    /// Numbers outside `i64` are carried as floats.
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Text(s),
            Json::Array(items) => Value::seq(items),
            Json::Object(entries) => Value::map(entries),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Bytes(bytes.to_vec())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

fn decode(bytes: Vec<u8>) -> Result<String, ProbeError> {
    Ok(String::from_utf8(bytes)?)
}

/// Return the text-only equivalent of `value`.
///
/// Byte leaves are decoded, containers are rebuilt with converted elements,
/// everything else passes through. Mapping keys are left as they are.
pub fn to_serializable(value: Value) -> Result<Value, ProbeError> {
    match value {
        Value::Bytes(bytes) => decode(bytes).map(Value::Text),
        v if v.is_empty_container() => Ok(v),
        Value::Seq(items) => convert_items(items).map(Value::Seq),
        Value::Tuple(items) => convert_items(items).map(Value::Tuple),
        Value::Map(entries) => entries
            .into_iter()
            .map(|(key, item)| Ok::<_, ProbeError>((key, to_serializable(item)?)))
            .collect::<Result<_, ProbeError>>()
            .map(Value::Map),
        scalar => Ok(scalar),
    }
}

fn convert_items(items: Vec<Value>) -> Result<Vec<Value>, ProbeError> {
    items.into_iter().map(to_serializable).collect()
}

/// Apply [`to_serializable`] to each value independently
pub fn serialize_all(values: impl IntoIterator<Item = Value>) -> Result<Vec<Value>, ProbeError> {
    values.into_iter().map(to_serializable).collect()
}

/// Variadic [`to_serializable`], returning a tuple of converted values
///
/// ```
/// use ciprobe::serializable::Value;
///
/// let (a, b) = ciprobe::serialize_all!("text", Value::bytes(b"raw")).unwrap();
/// assert_eq!(a, Value::from("text"));
/// assert_eq!(b, Value::from("raw"));
/// ```
#[macro_export]
macro_rules! serialize_all {
    ($($value:expr),* $(,)?) => {
        (|| -> ::std::result::Result<_, $crate::ProbeError> {
            Ok(($($crate::serializable::to_serializable(
                $crate::serializable::Value::from($value),
            )?,)*))
        })()
    };
}

/// Decode every byte string in the tree, keys included.
///
/// When decoding makes a byte key equal to a text key in the same mapping,
/// the entry that had the byte key is kept.
pub fn convert_all(value: Value) -> Result<Value, ProbeError> {
    match value {
        Value::Bytes(bytes) => decode(bytes).map(Value::Text),
        Value::Map(entries) => entries
            .into_iter()
            .map(|(key, item)| Ok::<_, ProbeError>((convert_key(key)?, convert_all(item)?)))
            .collect::<Result<_, ProbeError>>()
            .map(Value::Map),
        Value::Tuple(items) => items
            .into_iter()
            .map(convert_all)
            .collect::<Result<_, _>>()
            .map(Value::Tuple),
        Value::Seq(items) => items
            .into_iter()
            .map(convert_all)
            .collect::<Result<_, _>>()
            .map(Value::Seq),
        scalar => Ok(scalar),
    }
}

fn convert_key(key: Key) -> Result<Key, ProbeError> {
    match key {
        Key::Bytes(bytes) => decode(bytes).map(Key::Text),
        text => Ok(text),
    }
}

/// Serialize a tree with byte strings written as text.
///
/// Non-UTF-8 bytes fail with the serializer's own error type.
pub struct BytesAsText<'a>(pub &'a Value);

struct KeyAsText<'a>(&'a Key);

impl Serialize for BytesAsText<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bytes(bytes) => {
                serializer.serialize_str(std::str::from_utf8(bytes).map_err(S::Error::custom)?)
            }
            Value::Seq(items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&BytesAsText(item))?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, item) in entries {
                    map.serialize_entry(&KeyAsText(key), &BytesAsText(item))?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for KeyAsText<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Key::Text(s) => serializer.serialize_str(s),
            Key::Bytes(bytes) => {
                serializer.serialize_str(std::str::from_utf8(bytes).map_err(S::Error::custom)?)
            }
        }
    }
}

/// JSON text for `value`, decoding byte strings on the way out
pub fn to_json_string(value: &Value) -> Result<String, ProbeError> {
    Ok(serde_json::to_string(&BytesAsText(value))?)
}
