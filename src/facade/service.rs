use std::any::Any;
use std::sync::Arc;

use log::debug;

use crate::core::{LiveError, Result, Value};
use crate::entity::Entity;
use crate::naming::NamingScheme;
use crate::object::{Expirable, LiveMap, LiveObject, MARKER_FIELD};
use crate::registry::{ClassRegistry, EntityMetadata};
use crate::store::RemoteStore;

/// The live-object façade: lifecycle operations, raw views and registry
/// management.
///
/// Obtained from [`Client::live_object_service`](crate::Client); every
/// façade derived from the same client shares that client's registry.
///
/// No operation here is transactional: persist and merge issue one write per
/// field, and a failure partway leaves whatever the individual writes
/// reached.
pub struct LiveObjectService {
    store: Arc<dyn RemoteStore>,
    registry: Arc<ClassRegistry>,
    naming: Arc<dyn NamingScheme>,
}

impl LiveObjectService {
    pub(crate) fn new(
        store: Arc<dyn RemoteStore>,
        registry: Arc<ClassRegistry>,
        naming: Arc<dyn NamingScheme>,
    ) -> Self {
        Self {
            store,
            registry,
            naming,
        }
    }

    fn bind<T: Entity>(&self, meta: Arc<EntityMetadata>, id: Value) -> Result<LiveObject<T>> {
        LiveObject::bind(
            meta,
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.naming),
            id,
        )
    }

    /// Creates the remote representation of a transient instance and returns
    /// the live handle.
    ///
    /// Allocates an id through the type's generator when the id field is
    /// null; fails with [`LiveError::AlreadyExists`] when the computed key is
    /// already present.
    pub fn persist<T: Entity>(&self, instance: &T) -> Result<LiveObject<T>> {
        let meta = self.registry.ensure::<T>()?;
        let mut id = instance.get_field(meta.id_field())?;
        if id.is_null() {
            id = meta.generator().generate(self.store.as_ref())?;
        }
        let key = self
            .naming
            .object_key(meta.type_name(), meta.id_field(), &id)?;
        if self.store.exists(&key)? {
            return Err(LiveError::AlreadyExists(key));
        }

        let live = self.bind::<T>(meta.clone(), id)?;
        self.write_local_fields(&meta, instance, &live)?;
        debug!("persisted '{}'", live.key());
        Ok(live)
    }

    /// Creates or updates the remote representation of a transient instance.
    ///
    /// Only the fields set (non-null, non-empty) on the passed instance are
    /// written; every other remote field is left untouched. The passed
    /// instance itself stays transient.
    pub fn merge<T: Entity>(&self, instance: &T) -> Result<LiveObject<T>> {
        let meta = self.registry.ensure::<T>()?;
        let mut id = instance.get_field(meta.id_field())?;
        if id.is_null() {
            id = meta.generator().generate(self.store.as_ref())?;
        }

        let live = self.bind::<T>(meta.clone(), id)?;
        self.write_local_fields(&meta, instance, &live)?;
        Ok(live)
    }

    fn write_local_fields<T: Entity>(
        &self,
        meta: &EntityMetadata,
        instance: &T,
        live: &LiveObject<T>,
    ) -> Result<()> {
        // the marker makes objects with no other fields exist
        self.store
            .map_put(&live.key(), MARKER_FIELD, Value::Integer(1))?;
        for descriptor in meta.fields() {
            if meta.is_id(descriptor.name) {
                continue;
            }
            let value = instance.get_field(descriptor.name)?;
            if value.is_null() {
                continue;
            }
            live.set(descriptor.name, value)?;
        }
        Ok(())
    }

    /// Returns a live handle when the remote representation currently
    /// exists, `None` otherwise.
    pub fn get<T: Entity>(&self, id: impl Into<Value>) -> Result<Option<LiveObject<T>>> {
        let meta = self.registry.ensure::<T>()?;
        let id = id.into();
        let key = self
            .naming
            .object_key(meta.type_name(), meta.id_field(), &id)?;
        if !self.store.exists(&key)? {
            return Ok(None);
        }
        Ok(Some(self.bind::<T>(meta, id)?))
    }

    /// Binds an instance to its computed key without creating or checking
    /// remote state. The id field must be non-null.
    pub fn attach<T: Entity>(&self, instance: &T) -> Result<LiveObject<T>> {
        let meta = self.registry.ensure::<T>()?;
        let id = instance.get_field(meta.id_field())?;
        if id.is_null() {
            return Err(LiveError::RequiredValue(meta.id_field().to_string()));
        }
        self.bind::<T>(meta, id)
    }

    /// Snapshots a live handle into a disconnected local value.
    pub fn detach<T: Entity>(&self, live: &LiveObject<T>) -> Result<T> {
        live.detach()
    }

    /// Removes the remote representation. Existing handles on the key become
    /// phantom. No-op when already absent.
    pub fn delete<T: Entity>(&self, live: &LiveObject<T>) -> Result<bool> {
        let removed = self.store.delete(&live.key())?;
        if removed {
            debug!("deleted '{}'", live.key());
        }
        Ok(removed)
    }

    /// Removes the remote representation addressed by type and id.
    pub fn delete_by_id<T: Entity>(&self, id: impl Into<Value>) -> Result<bool> {
        let meta = self.registry.ensure::<T>()?;
        let key = self
            .naming
            .object_key(meta.type_name(), meta.id_field(), &id.into())?;
        self.store.delete(&key)
    }

    /// True iff the handle's backing map currently exists.
    pub fn is_exists<T: Entity>(&self, live: &LiveObject<T>) -> Result<bool> {
        live.is_exists()
    }

    /// True iff the value is a live handle of `T` (live or phantom),
    /// irrespective of remote existence.
    pub fn is_live_object<T: Entity>(&self, candidate: &dyn Any) -> bool {
        candidate.downcast_ref::<LiveObject<T>>().is_some()
    }

    /// Exposes a handle's identity and low-level operations. Fails with
    /// [`LiveError::TypeMisuse`] when the value is not proxy-bound.
    pub fn as_live_object<'a, T: Entity>(&self, candidate: &'a dyn Any) -> Result<&'a LiveObject<T>> {
        candidate.downcast_ref::<LiveObject<T>>().ok_or_else(|| {
            LiveError::TypeMisuse("value is not bound to a live object handle".into())
        })
    }

    /// Raw map view over the handle's backing key. Field entries are plain
    /// map entries through this view.
    pub fn as_map<T: Entity>(&self, live: &LiveObject<T>) -> LiveMap {
        LiveMap::attach(Arc::clone(&self.store), live.key())
    }

    /// Raw expiration view over the handle's backing key.
    pub fn as_expirable<T: Entity>(&self, live: &LiveObject<T>) -> Expirable {
        Expirable::attach(Arc::clone(&self.store), live.key())
    }

    // ------------------------------------------------------------------
    // Registry operations, shared with every façade of the owning client
    // ------------------------------------------------------------------

    pub fn register_class<T: Entity>(&self) -> Result<()> {
        self.registry.register::<T>().map(|_| ())
    }

    pub fn unregister_class<T: Entity>(&self) -> Result<()> {
        self.registry.unregister::<T>()
    }

    pub fn is_class_registered<T: Entity>(&self) -> bool {
        self.registry.is_registered::<T>()
    }
}
