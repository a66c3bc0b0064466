// ============================================================================
// RustLiveObj Library
// ============================================================================

pub mod codec;
pub mod core;
pub mod entity;
pub mod facade;
pub mod generator;
pub mod naming;
pub mod object;
pub mod prelude;
pub mod registry;
pub mod store;

// Re-export main types for convenience
pub use crate::codec::FieldCodec;
pub use crate::core::{
    CollectionKind, CollectionRef, DataType, EntityRef, IdStrategy, LiveError, ObjectState,
    Result, TransformationMode, Value,
};
pub use crate::entity::Entity;
pub use crate::facade::LiveObjectService;
pub use crate::object::{
    Expirable, LiveBlockingDeque, LiveBlockingQueue, LiveCollection, LiveDeque, LiveList, LiveMap,
    LiveObject, LiveQueue, LiveSet, LiveSortedSet, RawObject,
};
pub use crate::registry::{
    ClassRegistry, EntityDescriptor, EntityMetadata, FieldDescriptor, FieldKind,
};
pub use crate::store::{MemoryStore, RemoteStore};

// Re-export the derive macro
pub use rustliveobj_derive::Entity;

use std::sync::Arc;

use crate::naming::{DefaultNamingScheme, NamingScheme};
use crate::object::collections as proxies;

// ============================================================================
// High-level Client API
// ============================================================================

/// Configuration for a [`Client`] handle: the store backend and the naming
/// scheme every key is derived with.
///
/// # Examples
///
/// ```
/// use rustliveobj::{Client, ClientConfig, MemoryStore};
/// use std::sync::Arc;
///
/// let config = ClientConfig::new(Arc::new(MemoryStore::new()));
/// let client = Client::with_config(config);
/// ```
pub struct ClientConfig {
    store: Arc<dyn RemoteStore>,
    naming: Arc<dyn NamingScheme>,
}

impl ClientConfig {
    /// Configuration over the given store backend with the default naming
    /// scheme.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            naming: Arc::new(DefaultNamingScheme),
        }
    }

    /// Configuration over a fresh in-process store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Replaces the naming scheme. Keys derived by a custom scheme must stay
    /// stable across calls; everything already stored under another scheme
    /// becomes unreachable.
    pub fn naming(mut self, naming: Arc<dyn NamingScheme>) -> Self {
        self.naming = naming;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Client handle over a remote store.
///
/// The handle owns the class registry: every service façade obtained from
/// one client shares registration state, and two independently constructed
/// clients never do, even over the same backing store.
///
/// # Examples
///
/// ```
/// use rustliveobj::prelude::*;
///
/// #[derive(Entity, Default)]
/// struct Account {
///     #[entity(id)]
///     id: Option<String>,
///     balance: Option<i64>,
/// }
///
/// # fn main() -> rustliveobj::Result<()> {
/// let client = Client::in_memory();
/// let service = client.live_object_service();
///
/// let account = Account {
///     id: Some("acc-1".into()),
///     balance: Some(100),
/// };
/// let live = service.persist(&account)?;
/// live.set("balance", 250i64)?;
///
/// let fresh = service.get::<Account>("acc-1")?.unwrap();
/// assert_eq!(fresh.get_typed::<Option<i64>>("balance")?, Some(250));
/// # Ok(())
/// # }
/// ```
pub struct Client {
    store: Arc<dyn RemoteStore>,
    naming: Arc<dyn NamingScheme>,
    registry: Arc<registry::ClassRegistry>,
}

impl Client {
    /// Connects to a fresh in-process store. The common entry point for
    /// tests and demos.
    pub fn in_memory() -> Self {
        Self::with_config(ClientConfig::in_memory())
    }

    /// Connects to the given store backend.
    pub fn with_store(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_config(ClientConfig::new(store))
    }

    /// Connects with custom configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        let ClientConfig { store, naming } = config;
        let registry = Arc::new(registry::ClassRegistry::new(Arc::clone(&naming)));
        Self {
            store,
            naming,
            registry,
        }
    }

    /// A live-object service façade sharing this handle's registry.
    pub fn live_object_service(&self) -> LiveObjectService {
        LiveObjectService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            Arc::clone(&self.naming),
        )
    }

    // ------------------------------------------------------------------
    // Top-level named collections
    // ------------------------------------------------------------------

    pub fn get_map(&self, name: &str) -> LiveMap {
        proxies::LiveMap::attach(Arc::clone(&self.store), name)
    }

    pub fn get_set(&self, name: &str) -> LiveSet {
        proxies::LiveSet::attach(Arc::clone(&self.store), name)
    }

    pub fn get_sorted_set(&self, name: &str) -> LiveSortedSet {
        proxies::LiveSortedSet::attach(Arc::clone(&self.store), name)
    }

    pub fn get_list(&self, name: &str) -> LiveList {
        proxies::LiveList::attach(Arc::clone(&self.store), name)
    }

    pub fn get_queue(&self, name: &str) -> LiveQueue {
        proxies::LiveQueue::attach(Arc::clone(&self.store), name)
    }

    pub fn get_deque(&self, name: &str) -> LiveDeque {
        proxies::LiveDeque::attach(Arc::clone(&self.store), name)
    }

    pub fn get_blocking_queue(&self, name: &str) -> LiveBlockingQueue {
        proxies::LiveBlockingQueue::attach(Arc::clone(&self.store), name)
    }

    pub fn get_blocking_deque(&self, name: &str) -> LiveBlockingDeque {
        proxies::LiveBlockingDeque::attach(Arc::clone(&self.store), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[derive(Default)]
    struct Note {
        id: Option<String>,
        body: Option<String>,
    }

    impl entity::Entity for Note {
        fn descriptor() -> registry::EntityDescriptor {
            registry::EntityDescriptor::builder("Note")
                .id_field("id", DataType::Text)
                .field("body", DataType::Text)
                .build()
        }

        fn get_field(&self, field: &str) -> Result<Value> {
            match field {
                "id" => Ok(self.id.clone().map(Value::Text).unwrap_or(Value::Null)),
                "body" => Ok(self.body.clone().map(Value::Text).unwrap_or(Value::Null)),
                _ => Err(LiveError::FieldNotFound(field.into(), "Note".into())),
            }
        }

        fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
            match field {
                "id" => self.id = value.as_str().map(str::to_string),
                "body" => self.body = value.as_str().map(str::to_string),
                _ => return Err(LiveError::FieldNotFound(field.into(), "Note".into())),
            }
            Ok(())
        }
    }

    #[test]
    fn test_services_of_one_client_share_registry() {
        let client = Client::in_memory();
        let first = client.live_object_service();
        let second = client.live_object_service();

        first.register_class::<Note>().unwrap();
        assert!(second.is_class_registered::<Note>());
    }

    #[test]
    fn test_independent_clients_do_not_share_registry() {
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
        let first = Client::with_store(Arc::clone(&store));
        let second = Client::with_store(store);

        first.live_object_service().register_class::<Note>().unwrap();
        assert!(!second.live_object_service().is_class_registered::<Note>());
    }

    #[test]
    fn test_client_roundtrip() {
        let client = Client::in_memory();
        let service = client.live_object_service();

        let note = Note {
            id: Some("n1".into()),
            body: Some("hello".into()),
        };
        let live = service.persist(&note).unwrap();
        assert_eq!(live.object_id(), Value::Text("n1".into()));

        let fetched = service.get::<Note>("n1").unwrap().unwrap();
        assert_eq!(fetched.get("body").unwrap(), Value::Text("hello".into()));
    }

    #[test]
    fn test_top_level_map() {
        let client = Client::in_memory();
        let map = client.get_map("shared");
        map.put("field", "123").unwrap();

        assert_eq!(
            client.get_map("shared").get("field").unwrap(),
            Some(Value::Text("123".into()))
        );
    }
}
