use std::fmt;

use serde::{Deserialize, Serialize};

/// Capability of a remote-backed collection field.
///
/// Each kind maps to an independently named structure at the store and to a
/// matching proxy type (`LiveMap`, `LiveSet`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    Map,
    Set,
    SortedSet,
    List,
    Queue,
    Deque,
    BlockingQueue,
    BlockingDeque,
}

impl CollectionKind {
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::BlockingQueue | Self::BlockingDeque)
    }

    /// True for the kinds stored as an ordered sequence at the store
    /// (everything that is not a map or a set flavour).
    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            Self::List | Self::Queue | Self::Deque | Self::BlockingQueue | Self::BlockingDeque
        )
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Map => "map",
            Self::Set => "set",
            Self::SortedSet => "sorted_set",
            Self::List => "list",
            Self::Queue => "queue",
            Self::Deque => "deque",
            Self::BlockingQueue => "blocking_queue",
            Self::BlockingDeque => "blocking_deque",
        };
        write!(f, "{}", name)
    }
}

/// Policy for collection-typed fields of an entity.
///
/// `Auto` swaps assigned local collections for remote-backed proxies;
/// `ImplementationBased` stores the assigned value verbatim through the
/// opaque codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformationMode {
    #[default]
    Auto,
    ImplementationBased,
}

impl fmt::Display for TransformationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "AUTO"),
            Self::ImplementationBased => write!(f, "IMPLEMENTATION_BASED"),
        }
    }
}

/// Identifier allocation strategy, fixed per entity type at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdStrategy {
    /// The caller supplies the id; a null id fails persist/attach.
    Explicit,
    /// Strictly increasing integers from the per-type atomic counter.
    Sequence,
    /// Random unique 128-bit token in canonical textual form.
    Random,
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::Sequence => write!(f, "sequence"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// Lifecycle state of an object with respect to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    /// Plain local value, no remote binding.
    Transient,
    /// Bound to a remote key that currently exists.
    Live,
    /// Local snapshot produced by detach; no remote binding.
    Detached,
    /// Bound to a remote key that no longer exists.
    Phantom,
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Live => write!(f, "live"),
            Self::Detached => write!(f, "detached"),
            Self::Phantom => write!(f, "phantom"),
        }
    }
}
