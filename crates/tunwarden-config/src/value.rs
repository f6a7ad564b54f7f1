// ============================================
// File: crates/tunwarden-config/src/value.rs
// ============================================
//! # Document Value Tree
//!
//! ## Creation Reason
//! Configuration documents are nested key/value trees whose leaves are
//! strings, numbers or booleans. Descending a dotted key has to know, at each
//! segment, whether the value is a nested document. A closed tagged type
//! makes that check a `match` instead of a runtime type check.
//!
//! ## Main Functionality
//! - `Scalar`: String, integer, float or boolean leaf
//! - `Value`: `Scalar`, `Sequence` or `Document`
//! - `Document`: Ordered map of keys to values with dotted-key access
//!
//! ## Dotted Keys
//! ```text
//! "dns.nameserver"  ──►  root["dns"]  ──►  (doc)["nameserver"]
//!                          │
//!                          └─ missing on set: created as empty document
//!                          └─ present but not a document: InvalidPath
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `null` has no representation; decoders reject it
//! - TOML datetimes decode to their string form
//! - Key order is sorted and carries no meaning
//!
//! ## Last Modified
//! v0.1.0 - Initial value tree

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConfigError, Result};

// ============================================
// Constants
// ============================================

/// Separator between dotted key segments.
pub const KEY_SEPARATOR: char = '.';

/// Marker key the `toml` deserializer uses to smuggle datetimes.
const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

// ============================================
// Scalar
// ============================================

/// Leaf value of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// UTF-8 string.
    String(String),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Boolean(bool),
}

// ============================================
// Value
// ============================================

/// Any value that can appear in a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Leaf value.
    Scalar(Scalar),
    /// Ordered sequence of values.
    Sequence(Vec<Value>),
    /// Nested document.
    Document(Document),
}

impl Value {
    /// Returns a short name for the variant, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(Scalar::String(_)) => "string",
            Self::Scalar(Scalar::Integer(_)) => "integer",
            Self::Scalar(Scalar::Float(_)) => "float",
            Self::Scalar(Scalar::Boolean(_)) => "boolean",
            Self::Sequence(_) => "sequence",
            Self::Document(_) => "document",
        }
    }

    /// Returns the string if this is a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is an integer scalar.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Scalar(Scalar::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Returns the number as a float (integers are widened).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Scalar(Scalar::Float(f)) => Some(*f),
            Self::Scalar(Scalar::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean scalar.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(Scalar::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// Returns the items if this is a sequence.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the nested document if this is one.
    #[must_use]
    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::String(s))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Integer(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Scalar(Scalar::Float(f))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Boolean(b))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Sequence(items)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Self::Document(doc)
    }
}

// ============================================
// Document
// ============================================

/// Nested key/value document.
///
/// # Example
/// ```
/// use tunwarden_config::value::{Document, Value};
///
/// let mut doc = Document::new();
/// doc.set_path("tun.mtu", Value::from(1400_i64)).unwrap();
///
/// assert_eq!(doc.get_path("tun.mtu").and_then(Value::as_i64), Some(1400));
/// assert!(doc.get_path("tun.missing").is_none());
///
/// // Cannot descend into a leaf
/// assert!(doc.set_path("tun.mtu.bytes", Value::from(1_i64)).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert of a direct child.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the document has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a direct child.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts a direct child, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Removes a direct child.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Iterates over direct child keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over direct children.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Resolves a dotted key.
    ///
    /// Returns `None` if any segment is missing, if an intermediate value is
    /// not a document, or if the key is malformed.
    #[must_use]
    pub fn get_path(&self, key: &str) -> Option<&Value> {
        let segments = split_key(key).ok()?;
        let (last, parents) = segments.split_last()?;

        let mut current = self;
        for segment in parents {
            current = current.0.get(*segment)?.as_document()?;
        }
        current.0.get(*last)
    }

    /// Assigns a value at a dotted key, creating missing intermediate
    /// documents. Returns the value previously stored at the key.
    ///
    /// # Errors
    /// Returns `InvalidPath` if the key is malformed or an intermediate
    /// segment holds a non-document value. Nothing is modified on error.
    pub fn set_path(&mut self, key: &str, value: Value) -> Result<Option<Value>> {
        let segments = split_key(key)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(ConfigError::invalid_path(key, "key is empty"));
        };

        // Fail before creating anything so the write is all-or-nothing.
        let mut cursor = Some(&*self);
        for (depth, segment) in parents.iter().enumerate() {
            cursor = match cursor.and_then(|doc| doc.0.get(*segment)) {
                Some(Value::Document(doc)) => Some(doc),
                Some(other) => {
                    return Err(ConfigError::invalid_path(
                        segments[..=depth].join("."),
                        format!("cannot descend into {} value", other.kind_name()),
                    ));
                }
                None => None,
            };
        }

        let mut current = self;
        for segment in parents {
            let entry = current
                .0
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Document(Document::new()));
            current = match entry {
                Value::Document(doc) => doc,
                // Checked by the read-only pass above.
                _ => return Err(ConfigError::invalid_path(key, "intermediate value changed")),
            };
        }

        Ok(current.0.insert((*last).to_string(), value))
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Splits a dotted key into segments.
///
/// # Errors
/// Returns `InvalidPath` for an empty key or an empty segment (`"a..b"`).
pub fn split_key(key: &str) -> Result<Vec<&str>> {
    if key.is_empty() {
        return Err(ConfigError::invalid_path(key, "key is empty"));
    }
    let segments: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::invalid_path(key, "key contains an empty segment"));
    }
    Ok(segments)
}

// ============================================
// Serde
// ============================================

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(Scalar::String(s)) => serializer.serialize_str(s),
            Self::Scalar(Scalar::Integer(i)) => serializer.serialize_i64(*i),
            Self::Scalar(Scalar::Float(f)) => serializer.serialize_f64(*f),
            Self::Scalar(Scalar::Boolean(b)) => serializer.serialize_bool(*b),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Document(doc) => doc.serialize(serializer),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean, sequence or document")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        Ok(i64::try_from(v).map_or(Value::from(v as f64), Value::from))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Err(E::custom("null values are not supported"))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Err(E::custom("null values are not supported"))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Value, A::Error> {
        let mut doc = BTreeMap::new();
        while let Some(key) = map.next_key::<String>()? {
            if key == TOML_DATETIME_KEY {
                let raw: String = map.next_value()?;
                return Ok(Value::from(raw));
            }
            let value: Value = map.next_value()?;
            doc.insert(key, value);
        }
        Ok(Value::Document(Document(doc)))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Document(doc) => Ok(doc),
            other => Err(de::Error::custom(format!(
                "expected a document at the root, found {}",
                other.kind_name()
            ))),
        }
    }
}

// ============================================
// Tests
// ============================================
