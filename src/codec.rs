use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::{LiveError, Result, Value};

/// Conversion between a local Rust field type and the codec [`Value`].
///
/// Implemented for the scalar and collection types entities are built from;
/// the derive macro dispatches every generated field through this trait.
pub trait FieldCodec: Sized {
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &str, got: &Value) -> LiveError {
    LiveError::Codec(format!("expected {}, got {}", expected, got.type_name()))
}

macro_rules! integer_codec {
    ($($ty:ty),*) => {$(
        impl FieldCodec for $ty {
            fn to_value(&self) -> Value {
                Value::Integer(*self as i64)
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Integer(i) => <$ty>::try_from(i).map_err(|_| {
                        LiveError::Codec(format!(
                            "integer {} out of range for {}",
                            i,
                            stringify!($ty)
                        ))
                    }),
                    other => Err(mismatch("INTEGER", &other)),
                }
            }
        }
    )*};
}

integer_codec!(i32, i64, u32, u64);

impl FieldCodec for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("FLOAT", &value))
    }
}

impl FieldCodec for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        value
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| mismatch("FLOAT", &value))
    }
}

impl FieldCodec for bool {
    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("BOOLEAN", &value))
    }
}

impl FieldCodec for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("TEXT", &other)),
        }
    }
}

impl FieldCodec for Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => {
                Uuid::parse_str(&s).map_err(|e| LiveError::Codec(format!("bad uuid: {}", e)))
            }
            other => Err(mismatch("TEXT", &other)),
        }
    }
}

impl FieldCodec for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Text(self.to_rfc3339())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| LiveError::Codec(format!("bad timestamp: {}", e))),
            other => Err(mismatch("TEXT", &other)),
        }
    }
}

impl<T: FieldCodec> FieldCodec for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            None => Value::Null,
            Some(inner) => inner.to_value(),
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => Ok(Some(T::from_value(other)?)),
        }
    }
}

// Missing collections decode from Null as empty, so unset collection fields
// detach into their local default instead of failing.

impl<T: FieldCodec> FieldCodec for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldCodec::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("LIST", &other)),
        }
    }
}

impl<T: FieldCodec> FieldCodec for VecDeque<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldCodec::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("LIST", &other)),
        }
    }
}

impl<V: FieldCodec> FieldCodec for HashMap<String, V> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((k, V::from_value(v)?)))
                .collect(),
            other => Err(mismatch("MAP", &other)),
        }
    }
}

impl<V: FieldCodec> FieldCodec for BTreeMap<String, V> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((k, V::from_value(v)?)))
                .collect(),
            other => Err(mismatch("MAP", &other)),
        }
    }
}

impl<T: FieldCodec + Eq + std::hash::Hash> FieldCodec for HashSet<T> {
    fn to_value(&self) -> Value {
        Value::Set(self.iter().map(FieldCodec::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Set(members) => members.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("SET", &other)),
        }
    }
}

impl<T: FieldCodec + Ord> FieldCodec for BTreeSet<T> {
    fn to_value(&self) -> Value {
        Value::Set(self.iter().map(FieldCodec::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Set(members) => members.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("SET", &other)),
        }
    }
}

impl FieldCodec for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

/// Serializes a value through the generic opaque codec (MessagePack).
/// IMPLEMENTATION_BASED collection fields are stored this way, byte for
/// byte, instead of being transformed into remote-backed collections.
pub fn encode_opaque(value: &Value) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value).map_err(|e| LiveError::Codec(e.to_string()))
}

pub fn decode_opaque(bytes: &[u8]) -> Result<Value> {
    rmp_serde::from_slice(bytes).map_err(|e| LiveError::Codec(e.to_string()))
}
