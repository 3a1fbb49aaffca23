//! The node type of the configuration tree.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::temporal::{Date, DateTime, Time};

/// Tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigType {
    Boolean,
    Integer,
    FloatingPoint,
    String,
    Date,
    Time,
    DateTime,
    List,
    Group,
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::FloatingPoint => "floating point",
            Self::String => "string",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "date_time",
            Self::List => "list",
            Self::Group => "group",
        };
        f.write_str(name)
    }
}

/// A node of the configuration tree.
///
/// Integers and floating point numbers are always stored at 64 bit; narrower
/// reads and writes go through [`checked_cast`](crate::cast::checked_cast).
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    FloatingPoint(f64),
    String(String),
    Date(Date),
    Time(Time),
    DateTime(DateTime),
    List(Vec<Value>),
    Group(Group),
}

impl Value {
    pub fn config_type(&self) -> ConfigType {
        match self {
            Self::Boolean(_) => ConfigType::Boolean,
            Self::Integer(_) => ConfigType::Integer,
            Self::FloatingPoint(_) => ConfigType::FloatingPoint,
            Self::String(_) => ConfigType::String,
            Self::Date(_) => ConfigType::Date,
            Self::Time(_) => ConfigType::Time,
            Self::DateTime(_) => ConfigType::DateTime,
            Self::List(_) => ConfigType::List,
            Self::Group(_) => ConfigType::Group,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Textual form of a scalar, `None` for lists and groups.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Boolean(b) => Some(b.to_string()),
            Self::Integer(i) => Some(i.to_string()),
            Self::FloatingPoint(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Date(d) => Some(d.to_string()),
            Self::Time(t) => Some(t.to_string()),
            Self::DateTime(dt) => Some(dt.to_string()),
            Self::List(_) | Self::Group(_) => None,
        }
    }

    /// Visits every string in this subtree together with its name.
    pub(crate) fn visit_strings_mut<F>(&mut self, fqn: &str, visit: &mut F)
    where
        F: FnMut(&str, &mut String),
    {
        match self {
            Self::String(s) => visit(fqn, s),
            Self::List(items) => {
                for (index, item) in items.iter_mut().enumerate() {
                    let name = super::path::key_for_list_element(fqn, index);
                    item.visit_strings_mut(&name, visit);
                }
            }
            Self::Group(group) => group.visit_strings_mut(fqn, visit),
            _ => {}
        }
    }
}

// Structural equality. NaN equals NaN so that a tree always equals its own reparse.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::FloatingPoint(a), Self::FloatingPoint(b)) => {
                a == b || (a.is_nan() && b.is_nan())
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Group(a), Self::Group(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::FloatingPoint(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(d) => d.serialize(serializer),
            Self::Time(t) => t.serialize(serializer),
            Self::DateTime(dt) => dt.serialize(serializer),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Group(group) => group.serialize(serializer),
        }
    }
}

/// Ordered mapping of unique keys to values.
///
/// Enumeration follows insertion order; replacing a key keeps its position.
#[derive(Debug, Clone, Default)]
pub struct Group {
    entries: Vec<(String, Value)>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Inserts or replaces `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn visit_strings_mut<F>(&mut self, fqn: &str, visit: &mut F)
    where
        F: FnMut(&str, &mut String),
    {
        for (key, value) in self.entries.iter_mut() {
            let name = super::path::join_key(fqn, key);
            value.visit_strings_mut(&name, visit);
        }
    }
}

// Key order is a presentation detail and does not take part in equality.
impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl FromIterator<(String, Value)> for Group {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut group = Self::new();
        for (key, value) in iter {
            group.insert(key, value);
        }
        group
    }
}

impl IntoIterator for Group {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
