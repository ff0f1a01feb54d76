use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A single property value as carried on the wire.
///
/// `List` holds multi-valued properties; every other variant is single-valued.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyValue {
    String(String),
    Id(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Html(String),
    Uri(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Name of the variant, used in error reporting.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Id(_) => "id",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::Boolean(_) => "boolean",
            Self::DateTime(_) => "datetime",
            Self::Html(_) => "html",
            Self::Uri(_) => "uri",
            Self::List(_) => "list",
        }
    }

    /// The string payload, if this value is string-shaped (string, id, html, uri).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Id(s) | Self::Html(s) | Self::Uri(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// First scalar value: the value itself, or the head of a `List`.
    pub fn first(&self) -> Option<&PropertyValue> {
        match self {
            Self::List(values) => values.first(),
            other => Some(other),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// An ordered property bag keyed by property id.
///
/// The map is ordered (BTreeMap) so serialized forms and iteration are
/// deterministic. A `put` replaces any previous value for the same id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties(BTreeMap<String, PropertyValue>);

impl Properties {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&PropertyValue> {
        self.0.get(id)
    }

    /// Insert a value, replacing any existing value for the id.
    pub fn put(&mut self, id: impl Into<String>, value: PropertyValue) {
        self.0.insert(id.into(), value);
    }

    pub fn remove(&mut self, id: &str) -> Option<PropertyValue> {
        self.0.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// String payload of a property, if present and string-shaped.
    pub fn get_string(&self, id: &str) -> Option<&str> {
        self.0.get(id).and_then(|v| v.first()).and_then(|v| v.as_str())
    }

    /// String payload of a property, or a `MissingValue` error.
    pub fn require_string(&self, id: &str) -> Result<&str, TypeError> {
        self.get_string(id).ok_or_else(|| TypeError::MissingValue {
            id: id.to_string(),
        })
    }

    pub fn get_integer(&self, id: &str) -> Option<i64> {
        self.0.get(id).and_then(|v| v.first()).and_then(|v| v.as_integer())
    }

    pub fn get_boolean(&self, id: &str) -> Option<bool> {
        self.0.get(id).and_then(|v| v.first()).and_then(|v| v.as_boolean())
    }

    pub fn get_datetime(&self, id: &str) -> Option<DateTime<Utc>> {
        self.0.get(id).and_then(|v| v.first()).and_then(|v| v.as_datetime())
    }
}

impl FromIterator<(String, PropertyValue)> for Properties {
    fn from_iter<T: IntoIterator<Item = (String, PropertyValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Properties {
    type Item = (String, PropertyValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Declared data type of a property definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    String,
    Id,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Html,
    Uri,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Id => "id",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Html => "html",
            Self::Uri => "uri",
        };
        write!(f, "{s}")
    }
}

/// Single- or multi-valued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    Single,
    Multi,
}

/// When a property may be written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Updatability {
    ReadOnly,
    ReadWrite,
    WhenCheckedOut,
    OnCreate,
}

/// Definition of one property within a type definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    pub id: String,
    pub display_name: String,
    pub query_name: String,
    pub property_type: PropertyType,
    pub cardinality: Cardinality,
    pub updatability: Updatability,
    pub required: bool,
    pub queryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<PropertyValue>,
}

impl PropertyDefinition {
    /// A minimal definition with sensible flags for the given type.
    pub fn new(id: impl Into<String>, property_type: PropertyType) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            query_name: id.clone(),
            id,
            property_type,
            cardinality: Cardinality::Single,
            updatability: Updatability::ReadWrite,
            required: false,
            queryable: true,
            default_value: None,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.updatability = Updatability::ReadOnly;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}
