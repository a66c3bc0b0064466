//! Convenience re-exports for the common surface.

pub use crate::codec::FieldCodec;
pub use crate::core::{
    CollectionKind, DataType, IdStrategy, LiveError, ObjectState, Result, TransformationMode,
    Value,
};
pub use crate::entity::Entity;
pub use crate::facade::LiveObjectService;
pub use crate::naming::{DefaultNamingScheme, NamingScheme};
pub use crate::object::{
    Expirable, LiveBlockingDeque, LiveBlockingQueue, LiveCollection, LiveDeque, LiveList, LiveMap,
    LiveObject, LiveQueue, LiveSet, LiveSortedSet, RawObject,
};
pub use crate::store::{MemoryStore, RemoteStore};
pub use crate::{Client, ClientConfig};

pub use rustliveobj_derive::Entity;
