use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::core::types::CollectionKind;
use crate::core::{LiveError, Result};

/// Reference to another entity's remote representation: target type name
/// plus id value. Stored in place of embedded nested state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub type_name: String,
    pub id: Box<Value>,
}

impl EntityRef {
    pub fn new(type_name: impl Into<String>, id: Value) -> Self {
        Self {
            type_name: type_name.into(),
            id: Box::new(id),
        }
    }
}

/// Reference to an independently named remote collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectionRef {
    pub kind: CollectionKind,
    pub name: String,
}

impl CollectionRef {
    pub fn new(kind: CollectionKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// A field value as seen by the store codec.
///
/// `Reference` and `Collection` are the two indirections the engine writes
/// instead of embedded state: a pointer to another entity's key and a pointer
/// to a remote-backed collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Set(BTreeSet<Value>),
    Reference(EntityRef),
    Collection(CollectionRef),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean(_) => "BOOLEAN",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Bytes(_) => "BYTES",
            Self::List(_) => "LIST",
            Self::Map(_) => "MAP",
            Self::Set(_) => "SET",
            Self::Reference(_) => "REFERENCE",
            Self::Collection(_) => "COLLECTION",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Canonical textual rendering of an identifier value, as embedded in
    /// remote key names. Identical values always render identically.
    pub fn render_id(&self) -> Result<String> {
        match self {
            Self::Boolean(b) => Ok(b.to_string()),
            Self::Integer(i) => Ok(i.to_string()),
            Self::Float(f) => Ok(f.to_string()),
            Self::Text(s) => Ok(s.clone()),
            Self::Bytes(_) | Self::List(_) => {
                Err(LiveError::Validation("id value cannot be an array".into()))
            }
            Self::Null => Err(LiveError::Validation("id value cannot be null".into())),
            other => Err(LiveError::Validation(format!(
                "id value must be a scalar, got {}",
                other.type_name()
            ))),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::Bytes(_) => 5,
            Self::List(_) => 6,
            Self::Map(_) => 7,
            Self::Set(_) => 8,
            Self::Reference(_) => 9,
            Self::Collection(_) => 10,
        }
    }
}

// Total order so values can live in remote sets and sorted sets. Floats use
// total_cmp; distinct variants order by rank and never compare equal, which
// keeps Eq, Ord and Hash mutually consistent.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => a.cmp(b),
            (Self::Map(a), Self::Map(b)) => a.cmp(b),
            (Self::Set(a), Self::Set(b)) => a.cmp(b),
            (Self::Reference(a), Self::Reference(b)) => a.cmp(b),
            (Self::Collection(a), Self::Collection(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_rank().hash(state);
        match self {
            Self::Null => {}
            Self::Boolean(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::Bytes(b) => b.hash(state),
            Self::List(items) => items.hash(state),
            Self::Map(entries) => entries.hash(state),
            Self::Set(members) => {
                for member in members {
                    member.hash(state);
                }
            }
            Self::Reference(r) => r.hash(state),
            Self::Collection(c) => c.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::List(items) => write!(f, "<list[{}]>", items.len()),
            Self::Map(entries) => write!(f, "<map[{}]>", entries.len()),
            Self::Set(members) => write!(f, "<set[{}]>", members.len()),
            Self::Reference(r) => write!(f, "<ref {}:{}>", r.type_name, r.id),
            Self::Collection(c) => write!(f, "<{} {}>", c.kind, c.name),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self::Map(entries)
    }
}

impl From<BTreeSet<Value>> for Value {
    fn from(members: BTreeSet<Value>) -> Self {
        Self::Set(members)
    }
}

impl From<EntityRef> for Value {
    fn from(r: EntityRef) -> Self {
        Self::Reference(r)
    }
}

impl From<CollectionRef> for Value {
    fn from(c: CollectionRef) -> Self {
        Self::Collection(c)
    }
}

/// Declared scalar type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Bytes,
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Integer(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Bytes, Value::Bytes(_)) => true,
            _ => false,
        }
    }

    /// Array-like types lack the stable identity key derivation depends on.
    pub fn is_array_like(&self) -> bool {
        matches!(self, Self::Bytes)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Bytes => write!(f, "BYTES"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Integer(42), Value::Integer(42));
        assert_eq!(Value::Text("a".into()), Value::Text("a".into()));
        assert_ne!(Value::Integer(1), Value::Integer(2));
        assert_ne!(Value::Integer(1), Value::Float(1.0));
    }

    #[test]
    fn test_value_ordering_is_total() {
        assert!(Value::Integer(1) < Value::Integer(2));
        assert!(Value::Text("a".into()) < Value::Text("b".into()));
        assert!(Value::Null < Value::Integer(0));
        // NaN participates in the total order instead of poisoning it
        assert_eq!(
            Value::Float(f64::NAN).cmp(&Value::Float(f64::NAN)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_values_usable_in_sets() {
        let mut members = BTreeSet::new();
        members.insert(Value::Integer(2));
        members.insert(Value::Integer(1));
        members.insert(Value::Integer(2));
        assert_eq!(members.len(), 2);
        assert_eq!(members.iter().next(), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_render_id() {
        assert_eq!(Value::Text("55555".into()).render_id().unwrap(), "55555");
        assert_eq!(Value::Integer(90909).render_id().unwrap(), "90909");
        assert_eq!(Value::Boolean(true).render_id().unwrap(), "true");
    }

    #[test]
    fn test_render_id_rejects_arrays() {
        let err = Value::Bytes(vec![1, 2, 3]).render_id().unwrap_err();
        assert!(err.to_string().contains("cannot be an array"));
        let err = Value::List(vec![Value::Integer(1)]).render_id().unwrap_err();
        assert!(err.to_string().contains("cannot be an array"));
    }

    #[test]
    fn test_type_compatibility() {
        assert!(DataType::Integer.is_compatible(&Value::Integer(42)));
        assert!(DataType::Integer.is_compatible(&Value::Null));
        assert!(DataType::Float.is_compatible(&Value::Integer(1)));
        assert!(!DataType::Integer.is_compatible(&Value::Text("hello".into())));
    }
}
