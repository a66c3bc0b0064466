pub mod collections;
pub(crate) mod resolver;
pub(crate) mod transformer;

pub use collections::{
    LiveBlockingDeque, LiveBlockingQueue, LiveCollection, LiveDeque, LiveList, LiveMap, LiveQueue,
    LiveSet, LiveSortedSet,
};

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Duration;

use log::debug;

use crate::codec::FieldCodec;
use crate::core::{CollectionRef, EntityRef, LiveError, ObjectState, Result, Value};
use crate::entity::Entity;
use crate::naming::NamingScheme;
use crate::object::resolver::ReferenceResolver;
use crate::object::transformer::FieldTransformer;
use crate::registry::{ClassRegistry, EntityMetadata, FieldDescriptor, FieldKind};
use crate::store::RemoteStore;

/// Entry written into every backing map so freshly persisted objects with no
/// other fields still exist at the store.
pub(crate) const MARKER_FIELD: &str = "__live_object";

struct Identity {
    id: Value,
    key: String,
}

/// A binding of an entity type to one remote key.
///
/// Every non-id field access is one remote round trip: getters read the
/// current remote entry (never a cached value) and setters write immediately,
/// observable by any other handle on the same key as soon as the call
/// returns. The id is held locally and is the one piece of identity a handle
/// owns; assigning it triggers the rename protocol.
///
/// A handle stays bound after its backing map disappears (delete or expiry);
/// it is then phantom: reads return [`Value::Null`], writes write through and
/// re-create entries, and [`LiveObject::is_exists`] reports false.
pub struct LiveObject<T: Entity> {
    meta: Arc<EntityMetadata>,
    registry: Arc<ClassRegistry>,
    store: Arc<dyn RemoteStore>,
    naming: Arc<dyn NamingScheme>,
    identity: RwLock<Identity>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> std::fmt::Debug for LiveObject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let identity = self.identity();
        f.debug_struct("LiveObject")
            .field("type_name", &self.meta.type_name())
            .field("id", &identity.id)
            .field("key", &identity.key)
            .finish()
    }
}

impl<T: Entity> LiveObject<T> {
    pub(crate) fn bind(
        meta: Arc<EntityMetadata>,
        registry: Arc<ClassRegistry>,
        store: Arc<dyn RemoteStore>,
        naming: Arc<dyn NamingScheme>,
        id: Value,
    ) -> Result<Self> {
        let key = naming.object_key(meta.type_name(), meta.id_field(), &id)?;
        Ok(Self {
            meta,
            registry,
            store,
            naming,
            identity: RwLock::new(Identity { id, key }),
            _entity: PhantomData,
        })
    }

    fn identity(&self) -> RwLockReadGuard<'_, Identity> {
        self.identity.read().unwrap_or_else(|e| e.into_inner())
    }

    /// The locally held identifier. Immutable identity: never fetched from
    /// the store.
    pub fn object_id(&self) -> Value {
        self.identity().id.clone()
    }

    /// The remote key this handle is bound to.
    pub fn key(&self) -> String {
        self.identity().key.clone()
    }

    pub fn type_name(&self) -> &'static str {
        self.meta.type_name()
    }

    pub fn is_exists(&self) -> Result<bool> {
        self.store.exists(&self.key())
    }

    pub fn state(&self) -> Result<ObjectState> {
        Ok(if self.is_exists()? {
            ObjectState::Live
        } else {
            ObjectState::Phantom
        })
    }

    fn descriptor(&self, field: &str) -> Result<&FieldDescriptor> {
        self.meta.field(field).ok_or_else(|| {
            LiveError::FieldNotFound(field.to_string(), self.meta.type_name().to_string())
        })
    }

    /// Reads one field from the store.
    pub fn get(&self, field: &str) -> Result<Value> {
        let descriptor = self.descriptor(field)?;
        if self.meta.is_id(field) {
            return Ok(self.object_id());
        }
        let stored = self.store.map_get(&self.key(), field)?;
        match &descriptor.kind {
            FieldKind::Scalar(_) | FieldKind::Reference(_) => Ok(stored.unwrap_or(Value::Null)),
            FieldKind::Collection(_) => FieldTransformer::on_read(self.meta.transformation(), stored),
        }
    }

    /// Writes one field to the store. Setting the id field renames the
    /// object instead.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let descriptor = self.descriptor(field)?;
        if self.meta.is_id(field) {
            return self.rename(value);
        }

        let key = self.key();
        let entry = match &descriptor.kind {
            FieldKind::Scalar(data_type) => {
                if !data_type.is_compatible(&value) {
                    return Err(LiveError::Validation(format!(
                        "field '{}' expects {}, got {}",
                        field,
                        data_type,
                        value.type_name()
                    )));
                }
                value
            }
            FieldKind::Collection(kind) => {
                let collection_key = self.naming.collection_field_key(&key, field);
                FieldTransformer::on_write(
                    self.store.as_ref(),
                    self.meta.transformation(),
                    *kind,
                    &collection_key,
                    value,
                )?
            }
            FieldKind::Reference(target) => {
                ReferenceResolver::check_assignment(&value, target)?;
                value
            }
        };

        if entry.is_null() {
            self.store.map_remove(&key, field)?;
        } else {
            self.store.map_put(&key, field, entry)?;
        }
        Ok(())
    }

    /// Reads a field through the local-type codec.
    pub fn get_typed<V: FieldCodec>(&self, field: &str) -> Result<V> {
        V::from_value(self.get(field)?)
    }

    /// Writes a field through the local-type codec.
    pub fn set_typed<V: FieldCodec>(&self, field: &str, value: V) -> Result<()> {
        self.set(field, value.to_value())
    }

    // ------------------------------------------------------------------
    // Generic named accessor, enabled per type at registration
    // ------------------------------------------------------------------

    fn accessor_enabled(&self) -> Result<()> {
        if self.meta.field_accessor_enabled() {
            Ok(())
        } else {
            Err(LiveError::TypeMisuse(format!(
                "generic field accessor is not enabled for entity '{}'",
                self.meta.type_name()
            )))
        }
    }

    /// Name-driven field read, available when the type opted into the
    /// generic accessor. Unknown names fail with
    /// [`LiveError::FieldNotFound`].
    pub fn field(&self, name: &str) -> Result<Value> {
        self.accessor_enabled()?;
        self.get(name)
    }

    /// Name-driven field write, counterpart of [`LiveObject::field`].
    pub fn set_field(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.accessor_enabled()?;
        self.set(name, value)
    }

    // ------------------------------------------------------------------
    // Collection fields
    // ------------------------------------------------------------------

    /// The live proxy backing an AUTO collection field. First access on a
    /// never-assigned field creates the backing pointer, so fresh objects
    /// can be filled through their collections right away.
    pub fn collection(&self, field: &str) -> Result<LiveCollection> {
        let descriptor = self.descriptor(field)?;
        let FieldKind::Collection(kind) = &descriptor.kind else {
            return Err(LiveError::TypeMisuse(format!(
                "field '{}' of entity '{}' is not a collection field",
                field,
                self.meta.type_name()
            )));
        };
        let kind = *kind;
        if self.meta.transformation() != crate::core::TransformationMode::Auto {
            return Err(LiveError::TypeMisuse(format!(
                "implementation-based collection field '{}' has no live proxy",
                field
            )));
        }

        match self.get(field)? {
            Value::Collection(reference) => {
                Ok(LiveCollection::attach(Arc::clone(&self.store), &reference))
            }
            Value::Null => {
                let key = self.key();
                let name = self.naming.collection_field_key(&key, field);
                let reference = CollectionRef::new(kind, name);
                self.store
                    .map_put(&key, field, Value::Collection(reference.clone()))?;
                Ok(LiveCollection::attach(Arc::clone(&self.store), &reference))
            }
            other => Err(LiveError::Store(format!(
                "collection field '{}' holds {}",
                field,
                other.type_name()
            ))),
        }
    }

    pub fn map_of(&self, field: &str) -> Result<LiveMap> {
        match self.collection(field)? {
            LiveCollection::Map(proxy) => Ok(proxy),
            other => Err(self.kind_mismatch(field, "map", &other)),
        }
    }

    pub fn set_of(&self, field: &str) -> Result<LiveSet> {
        match self.collection(field)? {
            LiveCollection::Set(proxy) => Ok(proxy),
            other => Err(self.kind_mismatch(field, "set", &other)),
        }
    }

    pub fn sorted_set_of(&self, field: &str) -> Result<LiveSortedSet> {
        match self.collection(field)? {
            LiveCollection::SortedSet(proxy) => Ok(proxy),
            other => Err(self.kind_mismatch(field, "sorted set", &other)),
        }
    }

    pub fn list_of(&self, field: &str) -> Result<LiveList> {
        match self.collection(field)? {
            LiveCollection::List(proxy) => Ok(proxy),
            other => Err(self.kind_mismatch(field, "list", &other)),
        }
    }

    pub fn queue_of(&self, field: &str) -> Result<LiveQueue> {
        match self.collection(field)? {
            LiveCollection::Queue(proxy) => Ok(proxy),
            other => Err(self.kind_mismatch(field, "queue", &other)),
        }
    }

    pub fn deque_of(&self, field: &str) -> Result<LiveDeque> {
        match self.collection(field)? {
            LiveCollection::Deque(proxy) => Ok(proxy),
            other => Err(self.kind_mismatch(field, "deque", &other)),
        }
    }

    pub fn blocking_queue_of(&self, field: &str) -> Result<LiveBlockingQueue> {
        match self.collection(field)? {
            LiveCollection::BlockingQueue(proxy) => Ok(proxy),
            other => Err(self.kind_mismatch(field, "blocking queue", &other)),
        }
    }

    pub fn blocking_deque_of(&self, field: &str) -> Result<LiveBlockingDeque> {
        match self.collection(field)? {
            LiveCollection::BlockingDeque(proxy) => Ok(proxy),
            other => Err(self.kind_mismatch(field, "blocking deque", &other)),
        }
    }

    fn kind_mismatch(&self, field: &str, wanted: &str, got: &LiveCollection) -> LiveError {
        LiveError::TypeMisuse(format!(
            "field '{}' is a {} field, not a {}",
            field,
            got.kind(),
            wanted
        ))
    }

    // ------------------------------------------------------------------
    // Reference fields
    // ------------------------------------------------------------------

    /// A fresh live handle to the referenced entity. Constructed on every
    /// access, so writes through any other handle are visible immediately.
    pub fn reference<U: Entity>(&self, field: &str) -> Result<Option<LiveObject<U>>> {
        let descriptor = self.descriptor(field)?;
        if !matches!(&descriptor.kind, FieldKind::Reference(_)) {
            return Err(LiveError::TypeMisuse(format!(
                "field '{}' of entity '{}' is not a reference field",
                field,
                self.meta.type_name()
            )));
        }

        match self.get(field)? {
            Value::Null => Ok(None),
            Value::Reference(reference) => {
                let metadata = self.registry.ensure::<U>()?;
                if metadata.type_name() != reference.type_name {
                    return Err(LiveError::TypeMisuse(format!(
                        "field '{}' references entity '{}', not '{}'",
                        field,
                        reference.type_name,
                        metadata.type_name()
                    )));
                }
                Ok(Some(LiveObject::bind(
                    metadata,
                    Arc::clone(&self.registry),
                    Arc::clone(&self.store),
                    Arc::clone(&self.naming),
                    *reference.id,
                )?))
            }
            other => Err(LiveError::Store(format!(
                "reference field '{}' holds {}",
                field,
                other.type_name()
            ))),
        }
    }

    /// Points a reference field at another live object.
    pub fn set_reference<U: Entity>(&self, field: &str, target: &LiveObject<U>) -> Result<()> {
        let metadata = self.registry.ensure::<U>()?;
        self.set(
            field,
            Value::Reference(EntityRef::new(metadata.type_name(), target.object_id())),
        )
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Snapshots the current remote state into a plain local value,
    /// recursively resolving collections and references.
    pub fn detach(&self) -> Result<T> {
        let key = self.key();
        let mut fields = BTreeMap::new();
        for descriptor in self.meta.fields() {
            let name = descriptor.name;
            if self.meta.is_id(name) {
                fields.insert(name.to_string(), self.object_id());
                continue;
            }
            let stored = self.store.map_get(&key, name)?;
            let local = match &descriptor.kind {
                FieldKind::Scalar(_) => stored.unwrap_or(Value::Null),
                FieldKind::Collection(_) => FieldTransformer::materialize(
                    self.store.as_ref(),
                    self.meta.transformation(),
                    stored,
                )?,
                FieldKind::Reference(_) => ReferenceResolver::detach_value(
                    self.store.as_ref(),
                    self.naming.as_ref(),
                    &self.registry,
                    stored.unwrap_or(Value::Null),
                )?,
            };
            fields.insert(name.to_string(), local);
        }
        T::from_fields(fields)
    }

    /// Moves the backing map to the key derived from `new_id`. A collision
    /// with an existing object is rejected rather than overwritten.
    fn rename(&self, new_id: Value) -> Result<()> {
        if new_id.is_null() {
            return Err(LiveError::RequiredValue(self.meta.id_field().to_string()));
        }
        if !self.meta.id_type().is_compatible(&new_id) {
            return Err(LiveError::Validation(format!(
                "id field '{}' expects {}, got {}",
                self.meta.id_field(),
                self.meta.id_type(),
                new_id.type_name()
            )));
        }

        let mut identity = self.identity.write()?;
        let new_key =
            self.naming
                .object_key(self.meta.type_name(), self.meta.id_field(), &new_id)?;
        if new_key == identity.key {
            identity.id = new_id;
            return Ok(());
        }
        if self.store.exists(&new_key)? {
            return Err(LiveError::AlreadyExists(new_key));
        }
        if self.store.exists(&identity.key)? {
            let entries = self.store.map_entries(&identity.key)?;
            self.store.map_put_all(&new_key, entries)?;
            self.store.delete(&identity.key)?;
        }
        debug!("renamed live object '{}' -> '{}'", identity.key, new_key);
        identity.id = new_id;
        identity.key = new_key;
        Ok(())
    }
}

/// Key-level operations on a remote object.
///
/// Live proxies refuse these on purpose: field semantics and raw key
/// operations never mix on one handle. Obtain a raw view from
/// `LiveObjectService::as_map` or `as_expirable` instead.
pub trait RawObject {
    fn raw_exists(&self) -> Result<bool>;
    fn raw_delete(&self) -> Result<bool>;
    fn raw_expire(&self, ttl: Duration) -> Result<bool>;
}

impl<T: Entity> LiveObject<T> {
    fn raw_misuse() -> LiveError {
        LiveError::TypeMisuse(
            "use a LiveObjectService raw view for key-level operations".into(),
        )
    }
}

impl<T: Entity> RawObject for LiveObject<T> {
    fn raw_exists(&self) -> Result<bool> {
        Err(Self::raw_misuse())
    }

    fn raw_delete(&self) -> Result<bool> {
        Err(Self::raw_misuse())
    }

    fn raw_expire(&self, _ttl: Duration) -> Result<bool> {
        Err(Self::raw_misuse())
    }
}

/// Raw expiration view over a live object's backing key.
pub struct Expirable {
    store: Arc<dyn RemoteStore>,
    key: String,
}

impl Expirable {
    pub(crate) fn attach(store: Arc<dyn RemoteStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Marks the backing key to disappear after `ttl`; the bound handle
    /// becomes phantom once the deadline passes.
    pub fn expire(&self, ttl: Duration) -> Result<bool> {
        self.store.expire(&self.key, ttl)
    }

    pub fn is_exists(&self) -> Result<bool> {
        self.store.exists(&self.key)
    }
}

impl RawObject for Expirable {
    fn raw_exists(&self) -> Result<bool> {
        self.store.exists(&self.key)
    }

    fn raw_delete(&self) -> Result<bool> {
        self.store.delete(&self.key)
    }

    fn raw_expire(&self, ttl: Duration) -> Result<bool> {
        self.store.expire(&self.key, ttl)
    }
}
