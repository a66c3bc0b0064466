use crate::codec;
use crate::core::{CollectionKind, CollectionRef, LiveError, Result, TransformationMode, Value};
use crate::store::RemoteStore;

/// Converts a collection-typed field value into the entry actually stored in
/// the object map, and back.
///
/// AUTO mode replaces assigned local collections with pointers to
/// independently named remote collections; IMPLEMENTATION_BASED mode stores
/// the assigned value verbatim through the opaque codec.
pub(crate) struct FieldTransformer;

impl FieldTransformer {
    /// Transforms an assigned value. Returns what to store in the object map
    /// entry; `Value::Null` means the entry is cleared.
    pub(crate) fn on_write(
        store: &dyn RemoteStore,
        mode: TransformationMode,
        kind: CollectionKind,
        collection_key: &str,
        value: Value,
    ) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match mode {
            TransformationMode::Auto => Self::migrate(store, kind, collection_key, value),
            TransformationMode::ImplementationBased => {
                Ok(Value::Bytes(codec::encode_opaque(&value)?))
            }
        }
    }

    /// Decodes a stored entry back into the value a field read returns.
    pub(crate) fn on_read(mode: TransformationMode, stored: Option<Value>) -> Result<Value> {
        let Some(stored) = stored else {
            return Ok(Value::Null);
        };
        match mode {
            TransformationMode::Auto => match stored {
                value @ (Value::Collection(_) | Value::Null) => Ok(value),
                other => Err(LiveError::Store(format!(
                    "collection field holds {} instead of a collection reference",
                    other.type_name()
                ))),
            },
            TransformationMode::ImplementationBased => match stored {
                Value::Bytes(bytes) => codec::decode_opaque(&bytes),
                Value::Null => Ok(Value::Null),
                other => Err(LiveError::Store(format!(
                    "opaque collection field holds {} instead of encoded bytes",
                    other.type_name()
                ))),
            },
        }
    }

    /// Replaces the remote collection's contents with the assigned local
    /// value. Re-assignment clears first so stale members never linger.
    fn migrate(
        store: &dyn RemoteStore,
        kind: CollectionKind,
        collection_key: &str,
        value: Value,
    ) -> Result<Value> {
        // adopting an existing remote collection stores its pointer verbatim
        if let Value::Collection(reference) = value {
            if reference.kind != kind {
                return Err(LiveError::Validation(format!(
                    "cannot assign a {} collection to a {} field",
                    reference.kind, kind
                )));
            }
            return Ok(Value::Collection(reference));
        }

        store.delete(collection_key)?;
        match (kind, value) {
            (CollectionKind::Map, Value::Map(entries)) => {
                store.map_put_all(collection_key, entries.into_iter().collect())?;
            }
            (CollectionKind::Set, Value::Set(members)) => {
                for member in members {
                    store.set_add(collection_key, member)?;
                }
            }
            (CollectionKind::SortedSet, Value::Set(members)) => {
                for member in members {
                    store.sorted_add(collection_key, member)?;
                }
            }
            (k, Value::List(items)) if k.is_sequence() => {
                for item in items {
                    store.seq_push_back(collection_key, item)?;
                }
            }
            (kind, other) => {
                return Err(LiveError::Validation(format!(
                    "cannot assign {} to a {} field",
                    other.type_name(),
                    kind
                )));
            }
        }
        Ok(Value::Collection(CollectionRef::new(kind, collection_key)))
    }

    /// Reads a remote collection back into its local equivalent, for detach
    /// snapshots.
    pub(crate) fn materialize(
        store: &dyn RemoteStore,
        mode: TransformationMode,
        stored: Option<Value>,
    ) -> Result<Value> {
        match Self::on_read(mode, stored)? {
            Value::Collection(reference) => {
                let name = &reference.name;
                match reference.kind {
                    CollectionKind::Map => Ok(Value::Map(
                        store.map_entries(name)?.into_iter().collect(),
                    )),
                    CollectionKind::Set => {
                        Ok(Value::Set(store.set_members(name)?.into_iter().collect()))
                    }
                    CollectionKind::SortedSet => Ok(Value::Set(
                        store.sorted_members(name)?.into_iter().collect(),
                    )),
                    _ => Ok(Value::List(store.seq_range(name)?)),
                }
            }
            value => Ok(value),
        }
    }
}
