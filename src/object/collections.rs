use std::sync::Arc;
use std::time::Duration;

use crate::core::{CollectionKind, CollectionRef, LiveError, Result, Value};
use crate::store::RemoteStore;

macro_rules! proxy_common {
    ($kind:expr) => {
        pub(crate) fn attach(store: Arc<dyn RemoteStore>, name: impl Into<String>) -> Self {
            Self {
                store,
                name: name.into(),
            }
        }

        pub fn name(&self) -> &str {
            &self.name
        }

        /// The stored pointer to this collection, as written into an
        /// object's field entry.
        pub fn reference(&self) -> CollectionRef {
            CollectionRef::new($kind, self.name.clone())
        }

        pub fn is_exists(&self) -> Result<bool> {
            self.store.exists(&self.name)
        }

        pub fn delete(&self) -> Result<bool> {
            self.store.delete(&self.name)
        }
    };
}

/// Remote-backed map. Every operation is one store round trip.
pub struct LiveMap {
    store: Arc<dyn RemoteStore>,
    name: String,
}

impl LiveMap {
    proxy_common!(CollectionKind::Map);

    pub fn get(&self, field: &str) -> Result<Option<Value>> {
        self.store.map_get(&self.name, field)
    }

    pub fn put(&self, field: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.store.map_put(&self.name, &field.into(), value.into())
    }

    pub fn put_all(&self, entries: Vec<(String, Value)>) -> Result<()> {
        self.store.map_put_all(&self.name, entries)
    }

    pub fn remove(&self, field: &str) -> Result<Option<Value>> {
        self.store.map_remove(&self.name, field)
    }

    pub fn contains_key(&self, field: &str) -> Result<bool> {
        self.store.map_contains(&self.name, field)
    }

    pub fn len(&self) -> Result<usize> {
        self.store.map_len(&self.name)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn entries(&self) -> Result<Vec<(String, Value)>> {
        self.store.map_entries(&self.name)
    }
}

/// Remote-backed set.
pub struct LiveSet {
    store: Arc<dyn RemoteStore>,
    name: String,
}

impl LiveSet {
    proxy_common!(CollectionKind::Set);

    pub fn add(&self, member: impl Into<Value>) -> Result<bool> {
        self.store.set_add(&self.name, member.into())
    }

    pub fn remove(&self, member: &Value) -> Result<bool> {
        self.store.set_remove(&self.name, member)
    }

    pub fn contains(&self, member: &Value) -> Result<bool> {
        self.store.set_contains(&self.name, member)
    }

    pub fn len(&self) -> Result<usize> {
        self.store.set_len(&self.name)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn members(&self) -> Result<Vec<Value>> {
        self.store.set_members(&self.name)
    }
}

/// Remote-backed set ordered by the members' natural order.
pub struct LiveSortedSet {
    store: Arc<dyn RemoteStore>,
    name: String,
}

impl LiveSortedSet {
    proxy_common!(CollectionKind::SortedSet);

    pub fn add(&self, member: impl Into<Value>) -> Result<bool> {
        self.store.sorted_add(&self.name, member.into())
    }

    pub fn remove(&self, member: &Value) -> Result<bool> {
        self.store.sorted_remove(&self.name, member)
    }

    pub fn contains(&self, member: &Value) -> Result<bool> {
        self.store.sorted_contains(&self.name, member)
    }

    pub fn len(&self) -> Result<usize> {
        self.store.sorted_len(&self.name)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Members in ascending order.
    pub fn members(&self) -> Result<Vec<Value>> {
        self.store.sorted_members(&self.name)
    }

    pub fn first(&self) -> Result<Option<Value>> {
        Ok(self.members()?.into_iter().next())
    }

    pub fn last(&self) -> Result<Option<Value>> {
        Ok(self.members()?.into_iter().next_back())
    }
}

/// Remote-backed list with index access.
pub struct LiveList {
    store: Arc<dyn RemoteStore>,
    name: String,
}

impl LiveList {
    proxy_common!(CollectionKind::List);

    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        self.store.seq_push_back(&self.name, value.into())
    }

    pub fn get(&self, index: usize) -> Result<Option<Value>> {
        self.store.seq_get(&self.name, index)
    }

    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.store.seq_set(&self.name, index, value.into())
    }

    pub fn len(&self) -> Result<usize> {
        self.store.seq_len(&self.name)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn items(&self) -> Result<Vec<Value>> {
        self.store.seq_range(&self.name)
    }
}

/// Remote-backed FIFO queue.
pub struct LiveQueue {
    store: Arc<dyn RemoteStore>,
    name: String,
}

impl LiveQueue {
    proxy_common!(CollectionKind::Queue);

    pub fn offer(&self, value: impl Into<Value>) -> Result<()> {
        self.store.seq_push_back(&self.name, value.into())
    }

    pub fn poll(&self) -> Result<Option<Value>> {
        self.store.seq_pop_front(&self.name)
    }

    pub fn peek(&self) -> Result<Option<Value>> {
        self.store.seq_peek_front(&self.name)
    }

    pub fn len(&self) -> Result<usize> {
        self.store.seq_len(&self.name)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Remote-backed double-ended queue.
pub struct LiveDeque {
    store: Arc<dyn RemoteStore>,
    name: String,
}

impl LiveDeque {
    proxy_common!(CollectionKind::Deque);

    pub fn push_front(&self, value: impl Into<Value>) -> Result<()> {
        self.store.seq_push_front(&self.name, value.into())
    }

    pub fn push_back(&self, value: impl Into<Value>) -> Result<()> {
        self.store.seq_push_back(&self.name, value.into())
    }

    pub fn pop_front(&self) -> Result<Option<Value>> {
        self.store.seq_pop_front(&self.name)
    }

    pub fn pop_back(&self) -> Result<Option<Value>> {
        self.store.seq_pop_back(&self.name)
    }

    pub fn peek_front(&self) -> Result<Option<Value>> {
        self.store.seq_peek_front(&self.name)
    }

    pub fn peek_back(&self) -> Result<Option<Value>> {
        self.store.seq_peek_back(&self.name)
    }

    pub fn len(&self) -> Result<usize> {
        self.store.seq_len(&self.name)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Remote-backed queue whose consumers can wait for arrivals.
pub struct LiveBlockingQueue {
    store: Arc<dyn RemoteStore>,
    name: String,
}

impl LiveBlockingQueue {
    proxy_common!(CollectionKind::BlockingQueue);

    pub fn offer(&self, value: impl Into<Value>) -> Result<()> {
        self.store.seq_push_back(&self.name, value.into())
    }

    pub fn poll(&self) -> Result<Option<Value>> {
        self.store.seq_pop_front(&self.name)
    }

    /// Waits up to `timeout` for a value.
    pub fn poll_timeout(&self, timeout: Duration) -> Result<Option<Value>> {
        self.store.seq_pop_front_blocking(&self.name, Some(timeout))
    }

    /// Waits indefinitely for a value.
    pub fn take(&self) -> Result<Value> {
        match self.store.seq_pop_front_blocking(&self.name, None)? {
            Some(value) => Ok(value),
            None => Err(LiveError::Store("blocking take returned empty".into())),
        }
    }

    pub fn peek(&self) -> Result<Option<Value>> {
        self.store.seq_peek_front(&self.name)
    }

    pub fn len(&self) -> Result<usize> {
        self.store.seq_len(&self.name)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Remote-backed deque with blocking pops at both ends.
pub struct LiveBlockingDeque {
    store: Arc<dyn RemoteStore>,
    name: String,
}

impl LiveBlockingDeque {
    proxy_common!(CollectionKind::BlockingDeque);

    pub fn push_front(&self, value: impl Into<Value>) -> Result<()> {
        self.store.seq_push_front(&self.name, value.into())
    }

    pub fn push_back(&self, value: impl Into<Value>) -> Result<()> {
        self.store.seq_push_back(&self.name, value.into())
    }

    pub fn pop_front(&self) -> Result<Option<Value>> {
        self.store.seq_pop_front(&self.name)
    }

    pub fn pop_back(&self) -> Result<Option<Value>> {
        self.store.seq_pop_back(&self.name)
    }

    pub fn pop_front_timeout(&self, timeout: Duration) -> Result<Option<Value>> {
        self.store.seq_pop_front_blocking(&self.name, Some(timeout))
    }

    pub fn pop_back_timeout(&self, timeout: Duration) -> Result<Option<Value>> {
        self.store.seq_pop_back_blocking(&self.name, Some(timeout))
    }

    pub fn len(&self) -> Result<usize> {
        self.store.seq_len(&self.name)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// A proxy of any capability, dispatched from a stored [`CollectionRef`].
pub enum LiveCollection {
    Map(LiveMap),
    Set(LiveSet),
    SortedSet(LiveSortedSet),
    List(LiveList),
    Queue(LiveQueue),
    Deque(LiveDeque),
    BlockingQueue(LiveBlockingQueue),
    BlockingDeque(LiveBlockingDeque),
}

impl LiveCollection {
    pub(crate) fn attach(store: Arc<dyn RemoteStore>, reference: &CollectionRef) -> Self {
        let name = reference.name.clone();
        match reference.kind {
            CollectionKind::Map => Self::Map(LiveMap::attach(store, name)),
            CollectionKind::Set => Self::Set(LiveSet::attach(store, name)),
            CollectionKind::SortedSet => Self::SortedSet(LiveSortedSet::attach(store, name)),
            CollectionKind::List => Self::List(LiveList::attach(store, name)),
            CollectionKind::Queue => Self::Queue(LiveQueue::attach(store, name)),
            CollectionKind::Deque => Self::Deque(LiveDeque::attach(store, name)),
            CollectionKind::BlockingQueue => {
                Self::BlockingQueue(LiveBlockingQueue::attach(store, name))
            }
            CollectionKind::BlockingDeque => {
                Self::BlockingDeque(LiveBlockingDeque::attach(store, name))
            }
        }
    }

    pub fn kind(&self) -> CollectionKind {
        match self {
            Self::Map(_) => CollectionKind::Map,
            Self::Set(_) => CollectionKind::Set,
            Self::SortedSet(_) => CollectionKind::SortedSet,
            Self::List(_) => CollectionKind::List,
            Self::Queue(_) => CollectionKind::Queue,
            Self::Deque(_) => CollectionKind::Deque,
            Self::BlockingQueue(_) => CollectionKind::BlockingQueue,
            Self::BlockingDeque(_) => CollectionKind::BlockingDeque,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Map(c) => c.name(),
            Self::Set(c) => c.name(),
            Self::SortedSet(c) => c.name(),
            Self::List(c) => c.name(),
            Self::Queue(c) => c.name(),
            Self::Deque(c) => c.name(),
            Self::BlockingQueue(c) => c.name(),
            Self::BlockingDeque(c) => c.name(),
        }
    }
}
